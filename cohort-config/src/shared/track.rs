use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Parameters of the cohort track being maintained.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrackConfig {
    /// Cohort display name. The written source name is
    /// `<cohort_name> Variant Frequencies`.
    pub cohort_name: String,
    /// Series the written track belongs to.
    pub series_name: String,
    /// Base name of the output artifact, without version token or extension.
    /// May contain a directory component relative to the workspace root.
    pub output_base: String,
    /// Record-level filter expression, passed to the engine verbatim.
    #[serde(default)]
    pub record_filter: Option<String>,
    /// Per-sample filter expression, passed to the engine verbatim.
    #[serde(default)]
    pub sample_filter: Option<String>,
    /// Rare-variant sample names are enumerated up to this many; beyond it
    /// only counts are kept.
    #[serde(default = "default_sample_name_threshold")]
    pub sample_name_threshold: u32,
}

impl TrackConfig {
    /// Default cap on enumerated sample names per rare variant.
    pub const DEFAULT_SAMPLE_NAME_THRESHOLD: u32 = 20;

    /// Source name stamped on the written track.
    pub fn source_name(&self) -> String {
        format!("{} Variant Frequencies", self.cohort_name)
    }

    /// Validates track configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cohort_name.is_empty() {
            return Err(ValidationError::invalid(
                "track.cohort_name",
                "must not be empty",
            ));
        }

        if self.series_name.is_empty() {
            return Err(ValidationError::invalid(
                "track.series_name",
                "must not be empty",
            ));
        }

        if self.output_base.is_empty() {
            return Err(ValidationError::invalid(
                "track.output_base",
                "must not be empty",
            ));
        }

        Ok(())
    }
}

fn default_sample_name_threshold() -> u32 {
    TrackConfig::DEFAULT_SAMPLE_NAME_THRESHOLD
}
