use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Manifest batching parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ManifestConfig {
    /// Maximum number of input files per manifest.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Filename prefix for generated manifests.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl ManifestConfig {
    /// Default maximum number of files per manifest.
    pub const DEFAULT_CAPACITY: usize = 128;

    /// Default manifest filename prefix.
    pub const DEFAULT_PREFIX: &'static str = "manifest";

    /// Validates manifest configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity == 0 {
            return Err(ValidationError::invalid(
                "manifest.capacity",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            prefix: default_prefix(),
        }
    }
}

fn default_capacity() -> usize {
    ManifestConfig::DEFAULT_CAPACITY
}

fn default_prefix() -> String {
    ManifestConfig::DEFAULT_PREFIX.to_string()
}
