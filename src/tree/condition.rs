//! Condition nodes: replicate selections under one experimental condition.

use std::collections::BTreeSet;
use std::fmt;

use tracing::info;

use crate::errors::ConfigError;

use super::{PipelineError, Selection};

/// Groups replicate [`Selection`]s measured under the same condition.
pub struct Condition {
    name: String,
    selections: Vec<Selection>,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .field("selections", &self.selections.len())
            .finish()
    }
}

impl Condition {
    /// Create a condition over its child selections.
    pub fn new(name: &str, selections: Vec<Selection>) -> Result<Self, ConfigError> {
        if selections.is_empty() {
            return Err(ConfigError::NoLibraries {
                name: name.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for selection in &selections {
            if !seen.insert(selection.name().to_string()) {
                return Err(ConfigError::DuplicateChildName {
                    name: name.to_string(),
                    child: selection.name().to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            selections,
        })
    }

    /// Node name, unique among siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child selections.
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Run every child selection's pipeline.
    pub fn calculate(&mut self) -> Result<(), PipelineError> {
        info!(condition = %self.name, "calculating condition");
        for selection in &mut self.selections {
            selection.calculate()?;
        }
        Ok(())
    }
}
