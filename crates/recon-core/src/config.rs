//! Ingestion configuration
//!
//! Config is loaded with a layered resolution:
//! 1. An explicit path (`--config`), which must exist when given
//! 2. Override in data dir (~/.local/share/recon/config/ingest.toml)
//! 3. Embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Direction;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/ingest.toml");

/// 0-based cell positions of the statement columns
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub date: usize,
    pub description: usize,
    pub reference: usize,
    pub amount: usize,
    pub direction: usize,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            date: 0,
            description: 1,
            reference: 2,
            amount: 3,
            direction: 4,
        }
    }
}

impl ColumnSchema {
    /// Cells a row needs before it can be translated.
    ///
    /// Description and reference are optional, so a row may stop short of
    /// them when they are the trailing columns.
    pub fn required_width(&self) -> usize {
        self.date.max(self.amount).max(self.direction) + 1
    }
}

/// Accepted direction marker tokens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectionTokens {
    pub credit: Vec<String>,
    pub debit: Vec<String>,
}

impl Default for DirectionTokens {
    fn default() -> Self {
        Self {
            credit: vec!["CR".to_string()],
            debit: vec!["DR".to_string()],
        }
    }
}

impl DirectionTokens {
    /// Resolve a raw marker cell; case and surrounding whitespace are ignored
    pub fn resolve(&self, raw: &str) -> Option<Direction> {
        let token = raw.trim().to_uppercase();
        if token.is_empty() {
            return None;
        }
        if self.credit.iter().any(|t| t.trim().to_uppercase() == token) {
            Some(Direction::Credit)
        } else if self.debit.iter().any(|t| t.trim().to_uppercase() == token) {
            Some(Direction::Debit)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    pub serial_min_year: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            serial_min_year: 1990,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub columns: ColumnSchema,
    pub directions: DirectionTokens,
    pub dates: DateConfig,
}

impl IngestConfig {
    /// Load configuration (explicit path, then data dir override, then defaults)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // An explicit path must exist; only the data dir override is optional
        let override_path = match path {
            Some(p) if !p.exists() => {
                return Err(Error::NotFound(format!("config file {}", p.display())));
            }
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let content = match override_path {
            Some(ref p) => {
                debug!("Loading ingest config from {}", p.display());
                fs::read_to_string(p)
                    .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?
            }
            None => DEFAULT_CONFIG.to_string(),
        };

        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: IngestConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let tokens = &self.directions;
        if tokens.credit.is_empty() || tokens.debit.is_empty() {
            return Err(Error::InvalidData(
                "Both credit and debit direction tokens are required".into(),
            ));
        }
        if let Some(shared) = tokens.credit.iter().find(|c| {
            tokens
                .debit
                .iter()
                .any(|d| d.trim().eq_ignore_ascii_case(c.trim()))
        }) {
            return Err(Error::InvalidData(format!(
                "Direction token '{}' is ambiguous",
                shared
            )));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("recon").join("config").join("ingest.toml"))
}
