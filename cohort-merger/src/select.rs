//! Selection of candidate files that carry only new samples.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{UpdateError, UpdateResult};
use crate::samples::{SampleExtractor, SampleSet};

/// Filename suffix of compressed variant files.
pub const COMPRESSED_VARIANT_SUFFIX: &str = ".vcf.gz";

/// Outcome of classifying a candidate listing.
#[derive(Debug, Default)]
pub struct FileSelection {
    /// Files whose samples are all new to the cohort, in listing order.
    pub accepted: Vec<PathBuf>,
    /// Files skipped: a known sample, no samples, or an extraction failure.
    pub rejected: Vec<PathBuf>,
}

/// Returns whether `path` names a compressed variant file.
pub fn is_compressed_variant(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(COMPRESSED_VARIANT_SUFFIX))
}

/// Lists the files of `directory` in lexical order (non-recursive).
pub fn scan_candidates(directory: &Path) -> UpdateResult<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(UpdateError::MissingArtifact(directory.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            entries.push(path);
        }
    }
    entries.sort();

    Ok(entries)
}

/// Classifies candidates against the known-sample set.
///
/// A file is accepted iff it names a compressed variant file, its extracted
/// sample set is non-empty, and none of its samples are already known. Any
/// overlap rejects the whole file. Extraction failures are isolated: the
/// file is skipped with a warning and the run continues.
pub fn select_new_files(
    candidates: &[PathBuf],
    known: &SampleSet,
    extractor: &dyn SampleExtractor,
) -> FileSelection {
    let mut selection = FileSelection::default();

    for path in candidates {
        if !is_compressed_variant(path) {
            continue;
        }

        let samples = match extractor.extract(path) {
            Ok(samples) => samples,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping file, sample extraction failed");
                selection.rejected.push(path.clone());
                continue;
            }
        };

        if samples.is_empty() {
            warn!(path = %path.display(), "skipping file, no sample names found");
            selection.rejected.push(path.clone());
            continue;
        }

        if samples.iter().any(|sample| known.contains(sample)) {
            info!(path = %path.display(), "skipping file, sample already present in cohort");
            selection.rejected.push(path.clone());
            continue;
        }

        selection.accepted.push(path.clone());
    }

    selection
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Deterministic extractor backed by a path → samples map.
    struct FakeExtractor(HashMap<PathBuf, Vec<&'static str>>);

    impl FakeExtractor {
        fn new(entries: &[(&str, &[&'static str])]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(path, samples)| (PathBuf::from(*path), samples.to_vec()))
                    .collect(),
            )
        }
    }

    impl SampleExtractor for FakeExtractor {
        fn extract(&self, path: &Path) -> UpdateResult<SampleSet> {
            match self.0.get(path) {
                Some(samples) => Ok(samples.iter().map(|s| s.to_string()).collect()),
                None => Err(UpdateError::Extraction {
                    path: path.to_path_buf(),
                    reason: "unreadable".to_string(),
                }),
            }
        }
    }

    fn known(samples: &[&str]) -> SampleSet {
        samples.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_samples_are_accepted() {
        let extractor = FakeExtractor::new(&[("a.vcf.gz", &["S2", "S3"])]);
        let selection = select_new_files(
            &[PathBuf::from("a.vcf.gz")],
            &known(&["S1"]),
            &extractor,
        );
        assert_eq!(selection.accepted, vec![PathBuf::from("a.vcf.gz")]);
        assert!(selection.rejected.is_empty());
    }

    #[test]
    fn test_any_known_sample_rejects_the_whole_file() {
        let extractor = FakeExtractor::new(&[("a.vcf.gz", &["S1", "S4"])]);
        let selection = select_new_files(
            &[PathBuf::from("a.vcf.gz")],
            &known(&["S1"]),
            &extractor,
        );
        assert!(selection.accepted.is_empty());
        assert_eq!(selection.rejected, vec![PathBuf::from("a.vcf.gz")]);
    }

    #[test]
    fn test_empty_sample_set_is_rejected() {
        let extractor = FakeExtractor::new(&[("a.vcf.gz", &[])]);
        let selection =
            select_new_files(&[PathBuf::from("a.vcf.gz")], &known(&[]), &extractor);
        assert!(selection.accepted.is_empty());
        assert_eq!(selection.rejected.len(), 1);
    }

    #[test]
    fn test_extraction_failure_is_isolated() {
        let extractor = FakeExtractor::new(&[("b.vcf.gz", &["S5"])]);
        let selection = select_new_files(
            &[PathBuf::from("a.vcf.gz"), PathBuf::from("b.vcf.gz")],
            &known(&[]),
            &extractor,
        );
        assert_eq!(selection.accepted, vec![PathBuf::from("b.vcf.gz")]);
        assert_eq!(selection.rejected, vec![PathBuf::from("a.vcf.gz")]);
    }

    #[test]
    fn test_non_variant_files_are_filtered_before_extraction() {
        // The extractor knows nothing about these paths; reaching it would
        // error, so passing proves the predicate ran first.
        let extractor = FakeExtractor::new(&[]);
        let selection = select_new_files(
            &[PathBuf::from("notes.txt"), PathBuf::from("a.vcf")],
            &known(&[]),
            &extractor,
        );
        assert!(selection.accepted.is_empty());
        assert!(selection.rejected.is_empty());
    }

    #[test]
    fn test_listing_order_is_preserved() {
        let extractor = FakeExtractor::new(&[
            ("a.vcf.gz", &["S1"]),
            ("b.vcf.gz", &["S2"]),
            ("c.vcf.gz", &["S3"]),
        ]);
        let candidates = vec![
            PathBuf::from("c.vcf.gz"),
            PathBuf::from("a.vcf.gz"),
            PathBuf::from("b.vcf.gz"),
        ];
        let selection = select_new_files(&candidates, &known(&[]), &extractor);
        assert_eq!(selection.accepted, candidates);
    }

    #[test]
    fn test_scan_candidates_sorts_lexically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.vcf.gz", "a.vcf.gz", "b.vcf.gz"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();

        let listing = scan_candidates(dir.path()).unwrap();
        let names: Vec<_> = listing
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.vcf.gz", "b.vcf.gz", "c.vcf.gz"]);
    }
}
