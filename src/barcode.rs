//! Barcode-to-value index loaded from a map file.
//!
//! Map files hold one `barcode<whitespace>value` pair per line, plain text
//! or gzip-compressed. Blank lines and `#` comments are skipped. The
//! completed index is immutable and shared by reference across every
//! library that declares the same source path, so a file is parsed once.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::info;

use crate::errors::ConfigError;

/// How map values are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueMode {
    /// Values are variant DNA sequences over `ACGTN` (case-normalized).
    VariantDna,
    /// Values are opaque, non-empty identifiers.
    Identifier,
}

/// Immutable mapping from barcode tags to variant DNA or identifiers.
#[derive(Debug, Clone)]
pub struct BarcodeIndex {
    name: String,
    path: PathBuf,
    mode: ValueMode,
    map: BTreeMap<String, String>,
}

impl BarcodeIndex {
    /// Load and validate a barcode map file.
    ///
    /// A barcode listed twice with the same value is deduplicated; listed
    /// twice with different values it is a fatal configuration error.
    pub fn load(path: &Path, mode: ValueMode) -> Result<Self, ConfigError> {
        let name = format!(
            "barcodemap_{}",
            path.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        );
        let reader = open_with_gz(path).map_err(|source| ConfigError::BarcodeMapIo {
            path: path.to_path_buf(),
            source,
        })?;

        let mut map = BTreeMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ConfigError::BarcodeMapIo {
                path: path.to_path_buf(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let (barcode, value) = match (fields.next(), fields.next(), fields.next()) {
                (Some(barcode), Some(value), None) => (barcode, value),
                _ => {
                    return Err(ConfigError::BarcodeMapFormat {
                        name,
                        line: idx + 1,
                    })
                }
            };

            let barcode = barcode.to_ascii_uppercase();
            if !barcode
                .bytes()
                .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
            {
                return Err(ConfigError::InvalidBarcode {
                    name,
                    line: idx + 1,
                });
            }

            let value = match mode {
                ValueMode::VariantDna => {
                    let value = value.to_ascii_uppercase();
                    if !value
                        .bytes()
                        .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N'))
                    {
                        return Err(ConfigError::InvalidBarcodeValue {
                            name,
                            line: idx + 1,
                        });
                    }
                    value
                }
                ValueMode::Identifier => value.to_string(),
            };

            match map.get(&barcode) {
                Some(existing) if *existing != value => {
                    return Err(ConfigError::AmbiguousBarcode { name, barcode });
                }
                Some(_) => {} // same pair repeated, keep one entry
                None => {
                    map.insert(barcode, value);
                }
            }
        }

        info!(name = %name, barcodes = map.len(), "loaded barcode map");
        Ok(Self {
            name,
            path: path.to_path_buf(),
            mode,
            map,
        })
    }

    /// Map name derived from the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source path the index was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validation mode used for values.
    pub fn mode(&self) -> ValueMode {
        self.mode
    }

    /// Value for a barcode, if present.
    pub fn get(&self, barcode: &str) -> Option<&str> {
        self.map.get(barcode).map(String::as_str)
    }

    /// Number of barcodes in the index.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the index holds no barcodes.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over (barcode, value) pairs in barcode order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Open a (possibly gzipped) file into a buffered reader.
pub(crate) fn open_with_gz(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Box::new(MultiGzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Box::new(BufReader::new(reader)))
}
