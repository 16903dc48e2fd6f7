use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// External merge-engine invocation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Path to the merge-engine binary.
    pub binary: PathBuf,
    /// Path to the sample-name extractor binary.
    #[serde(default = "default_extractor")]
    pub extractor: PathBuf,
    /// Engine stderr lines containing any of these fragments are suppressed.
    #[serde(default = "default_suppressed_diagnostics")]
    pub suppressed_diagnostics: Vec<String>,
    /// Record buffer size handed to the merge stage.
    #[serde(default = "default_input_buffer_size")]
    pub input_buffer_size: u32,
}

impl EngineConfig {
    /// Default sample-name extractor binary.
    pub const DEFAULT_EXTRACTOR: &'static str = "bcftools";

    /// Default merge-stage record buffer size.
    pub const DEFAULT_INPUT_BUFFER_SIZE: u32 = 2000;

    /// Validates engine configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.binary.as_os_str().is_empty() {
            return Err(ValidationError::invalid(
                "engine.binary",
                "must not be empty",
            ));
        }

        if self.input_buffer_size == 0 {
            return Err(ValidationError::invalid(
                "engine.input_buffer_size",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn default_extractor() -> PathBuf {
    PathBuf::from(EngineConfig::DEFAULT_EXTRACTOR)
}

fn default_suppressed_diagnostics() -> Vec<String> {
    vec!["GAFeatureReader loop level greater than 1".to_string()]
}

fn default_input_buffer_size() -> u32 {
    EngineConfig::DEFAULT_INPUT_BUFFER_SIZE
}
