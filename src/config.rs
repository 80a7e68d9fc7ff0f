//! Page configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! block_size = 256
//! block_count = 41960
//! medium = "file"
//! path = "page.bin"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default block size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Default number of blocks
pub const DEFAULT_BLOCK_COUNT: usize = 41960;

/// Storage medium backing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediumKind {
    #[default]
    Memory,
    File,
}

/// Page geometry and medium selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub block_size: usize,
    pub block_count: usize,
    pub medium: MediumKind,
    /// Required when `medium = "file"`
    pub path: Option<PathBuf>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            block_count: DEFAULT_BLOCK_COUNT,
            medium: MediumKind::Memory,
            path: None,
        }
    }
}

impl PageConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        debug!(path = ?path, ?config, "Loaded page config");
        Ok(config)
    }

    /// Page size in bytes
    pub fn size(&self) -> Option<usize> {
        self.block_size.checked_mul(self.block_count)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::Config("block_size must be non-zero".to_string()));
        }
        if self.block_count == 0 {
            return Err(Error::Config("block_count must be non-zero".to_string()));
        }
        if self.size().is_none() {
            return Err(Error::Config(format!(
                "block_size {} x block_count {} overflows",
                self.block_size, self.block_count
            )));
        }
        if self.medium == MediumKind::File && self.path.is_none() {
            return Err(Error::Config("File medium requires a path".to_string()));
        }
        Ok(())
    }
}
