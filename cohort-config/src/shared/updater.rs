use serde::{Deserialize, Serialize};

use crate::shared::{
    EngineConfig, ManifestConfig, ResourceBudget, TrackConfig, ValidationError, WorkspaceConfig,
};

/// Top-level configuration for one updater run.
///
/// Assembled by the CLI layer from the configuration file and environment
/// overrides, then handed to the core as an explicit value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpdaterConfig {
    /// Workspace layout.
    pub workspace: WorkspaceConfig,
    /// Compute budget.
    #[serde(default)]
    pub resources: ResourceBudget,
    /// Merge-engine settings.
    pub engine: EngineConfig,
    /// Cohort track parameters.
    pub track: TrackConfig,
    /// Manifest batching parameters.
    #[serde(default)]
    pub manifest: ManifestConfig,
}

impl UpdaterConfig {
    /// Validates the complete configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.workspace.validate()?;
        self.resources.validate()?;
        self.engine.validate()?;
        self.track.validate()?;
        self.manifest.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::shared::GenomeAssembly;

    fn sample_config() -> UpdaterConfig {
        UpdaterConfig {
            workspace: WorkspaceConfig {
                root: PathBuf::from("/data/workspace"),
                assembly: GenomeAssembly::Grch38,
            },
            resources: ResourceBudget::default(),
            engine: EngineConfig {
                binary: PathBuf::from("/opt/cohort/engine"),
                extractor: PathBuf::from("bcftools"),
                suppressed_diagnostics: Vec::new(),
                input_buffer_size: EngineConfig::DEFAULT_INPUT_BUFFER_SIZE,
            },
            track: TrackConfig {
                cohort_name: "Study".to_string(),
                series_name: "Frequencies".to_string(),
                output_base: "counts".to_string(),
                record_filter: None,
                sample_filter: None,
                sample_name_threshold: TrackConfig::DEFAULT_SAMPLE_NAME_THRESHOLD,
            },
            manifest: ManifestConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        sample_config().validate().unwrap();
    }

    #[test]
    fn test_zero_cpu_budget_is_rejected() {
        let mut config = sample_config();
        config.resources.cpu_cores = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_manifest_capacity_is_rejected() {
        let mut config = sample_config();
        config.manifest.capacity = 0;
        assert!(config.validate().is_err());
    }
}
