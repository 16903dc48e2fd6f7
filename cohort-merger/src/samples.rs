//! Sample-name extraction and the known-sample set.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{UpdateError, UpdateResult};

/// A set of sample identifiers.
pub type SampleSet = HashSet<String>;

/// Extracts the sample names carried by one variant file.
///
/// Injected so selection logic can be exercised without shelling out to the
/// real extractor.
pub trait SampleExtractor {
    /// Returns the sample names in `path`.
    fn extract(&self, path: &Path) -> UpdateResult<SampleSet>;
}

/// Extractor shelling out to an external tool, one sample name per stdout
/// line (`<binary> query --list-samples <file>`).
#[derive(Debug, Clone)]
pub struct CommandSampleExtractor {
    binary: PathBuf,
}

impl CommandSampleExtractor {
    /// Creates an extractor using the given binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl SampleExtractor for CommandSampleExtractor {
    fn extract(&self, path: &Path) -> UpdateResult<SampleSet> {
        let output = Command::new(&self.binary)
            .arg("query")
            .arg("--list-samples")
            .arg(path)
            .output()
            .map_err(|err| UpdateError::Extraction {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpdateError::Extraction {
                path: path.to_path_buf(),
                reason: format!(
                    "extractor exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let samples: SampleSet = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();

        debug!(path = %path.display(), samples = samples.len(), "extracted sample names");
        Ok(samples)
    }
}

/// Reads the known-sample set from a one-name-per-line file.
pub fn read_known_samples(path: &Path) -> UpdateResult<SampleSet> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}
