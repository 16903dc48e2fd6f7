//! Shared helpers for cohort-merger integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use cohort_config::shared::{
    EngineConfig, GenomeAssembly, ManifestConfig, ResourceBudget, TrackConfig, UpdaterConfig,
    WorkspaceConfig,
};
use cohort_merger::{SampleExtractor, SampleSet, UpdateError, UpdateResult};

/// Builds a configuration rooted in `root` with the given engine binary.
pub fn test_config(root: &Path, engine_binary: &Path) -> UpdaterConfig {
    UpdaterConfig {
        workspace: WorkspaceConfig {
            root: root.to_path_buf(),
            assembly: GenomeAssembly::Grch38,
        },
        resources: ResourceBudget {
            cpu_cores: 8,
            memory_gb: 16,
        },
        engine: EngineConfig {
            binary: engine_binary.to_path_buf(),
            extractor: PathBuf::from("bcftools"),
            suppressed_diagnostics: vec![
                "GAFeatureReader loop level greater than 1".to_string(),
            ],
            input_buffer_size: 2000,
        },
        track: TrackConfig {
            cohort_name: "Study".to_string(),
            series_name: "Frequencies".to_string(),
            output_base: "counts".to_string(),
            record_filter: None,
            sample_filter: None,
            sample_name_threshold: 20,
        },
        manifest: ManifestConfig {
            capacity: 128,
            prefix: "manifest".to_string(),
        },
    }
}

/// Deterministic extractor backed by a filename → samples map. Paths absent
/// from the map fail extraction, standing in for unreadable files.
pub struct FakeExtractor(HashMap<String, Vec<String>>);

impl FakeExtractor {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Self(
            entries
                .iter()
                .map(|(name, samples)| {
                    (
                        name.to_string(),
                        samples.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self(HashMap::new())
    }
}

impl SampleExtractor for FakeExtractor {
    fn extract(&self, path: &Path) -> UpdateResult<SampleSet> {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        match self.0.get(&name) {
            Some(samples) => Ok(samples.iter().cloned().collect()),
            None => Err(UpdateError::Extraction {
                path: path.to_path_buf(),
                reason: "unreadable".to_string(),
            }),
        }
    }
}

/// Writes an executable shell script and returns its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}
