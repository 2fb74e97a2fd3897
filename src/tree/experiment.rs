//! Experiment root: the whole analysis.

use std::collections::BTreeSet;
use std::fmt;

use tracing::info;

use crate::errors::ConfigError;

use super::{Condition, PipelineError};

/// Root of the aggregation tree.
pub struct Experiment {
    name: String,
    conditions: Vec<Condition>,
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

impl Experiment {
    /// Create an experiment over its child conditions.
    pub fn new(name: &str, conditions: Vec<Condition>) -> Result<Self, ConfigError> {
        if conditions.is_empty() {
            return Err(ConfigError::NoLibraries {
                name: name.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for condition in &conditions {
            if !seen.insert(condition.name().to_string()) {
                return Err(ConfigError::DuplicateChildName {
                    name: name.to_string(),
                    child: condition.name().to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            conditions,
        })
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child conditions.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Run every condition's pipeline.
    pub fn calculate(&mut self) -> Result<(), PipelineError> {
        info!(experiment = %self.name, "calculating experiment");
        for condition in &mut self.conditions {
            condition.calculate()?;
        }
        Ok(())
    }
}
