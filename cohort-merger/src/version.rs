//! Resolution of versioned aggregate artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::UpdateResult;

/// Extension of aggregate track artifacts.
pub const TRACK_EXTENSION: &str = ".tsf";

/// An existing aggregate artifact, identified by the version token embedded
/// in its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateVersion {
    /// Full path of the artifact.
    pub path: PathBuf,
    /// Version token embedded in the filename.
    pub token: String,
}

impl AggregateVersion {
    /// Addresses the samples-only view of this artifact (second stream).
    pub fn samples_source(&self) -> String {
        format!("{}:2", self.path.display())
    }
}

/// Picks the lexically greatest `<base>_<token>.tsf` among `entries`.
///
/// Version tokens sort lexically in chronological order, so the greatest
/// name is the current version regardless of enumeration order. Returns
/// `None` for a fresh cohort.
pub fn resolve_latest<I, S>(directory: &Path, base_name: &str, entries: I) -> Option<AggregateVersion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = format!("{base_name}_");

    entries
        .into_iter()
        .filter_map(|entry| {
            let name = entry.as_ref();
            let token = name
                .strip_prefix(&prefix)?
                .strip_suffix(TRACK_EXTENSION)?;
            if token.is_empty() {
                return None;
            }
            Some((name.to_owned(), token.to_owned()))
        })
        .max_by(|a, b| a.1.cmp(&b.1))
        .map(|(name, token)| AggregateVersion {
            path: directory.join(name),
            token,
        })
}

/// Resolves the current aggregate version by listing `directory`.
///
/// A missing directory means a fresh cohort, not an error.
pub fn resolve_latest_in_dir(
    directory: &Path,
    base_name: &str,
) -> UpdateResult<Option<AggregateVersion>> {
    if !directory.is_dir() {
        return Ok(None);
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_owned());
        }
    }

    Ok(resolve_latest(directory, base_name, names))
}

/// Formats the version token for a run starting at `now`.
///
/// Zero-padded date followed by the millisecond timestamp: lexical order
/// equals chronological order, and two runs in the same minute cannot
/// collide.
pub fn version_token(now: DateTime<Utc>) -> String {
    format!("{}_{}", now.format("%Y-%m-%d"), now.timestamp_millis())
}

/// Names the next aggregate version for `base_name`, deterministic given
/// `now`.
pub fn next_version(directory: &Path, base_name: &str, now: DateTime<Utc>) -> PathBuf {
    directory.join(format!(
        "{base_name}_{}{TRACK_EXTENSION}",
        version_token(now)
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_latest_version_wins_regardless_of_listing_order() {
        let entries = ["out_2024-03-15.tsf", "out_2024-01-01.tsf"];
        let latest = resolve_latest(Path::new("/data"), "out", entries).unwrap();
        assert_eq!(latest.token, "2024-03-15");
        assert_eq!(latest.path, PathBuf::from("/data/out_2024-03-15.tsf"));

        let reversed = ["out_2024-01-01.tsf", "out_2024-03-15.tsf"];
        let same = resolve_latest(Path::new("/data"), "out", reversed).unwrap();
        assert_eq!(same.token, "2024-03-15");
    }

    #[test]
    fn test_unrelated_names_are_ignored() {
        let entries = [
            "other_2024-05-01.tsf",
            "out_2024-01-01.txt",
            "out.tsf",
            "out_.tsf",
        ];
        assert!(resolve_latest(Path::new("/data"), "out", entries).is_none());
    }

    #[test]
    fn test_empty_listing_means_fresh_cohort() {
        let entries: [&str; 0] = [];
        assert!(resolve_latest(Path::new("/data"), "out", entries).is_none());
    }

    #[test]
    fn test_resolve_in_missing_directory_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("nowhere");
        assert!(resolve_latest_in_dir(&absent, "out").unwrap().is_none());
    }

    #[test]
    fn test_resolve_in_dir_reads_real_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["out_2024-01-01.tsf", "out_2024-03-15.tsf", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let latest = resolve_latest_in_dir(dir.path(), "out").unwrap().unwrap();
        assert_eq!(latest.token, "2024-03-15");
    }

    #[test]
    fn test_tokens_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 45).unwrap();
        assert!(version_token(earlier) < version_token(later));

        let next_day = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();
        assert!(version_token(later) < version_token(next_day));
    }

    #[test]
    fn test_next_version_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let first = next_version(Path::new("/data"), "out", now);
        let second = next_version(Path::new("/data"), "out", now);
        assert_eq!(first, second);
        assert!(
            first
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("out_2024-03-15_")
        );
    }

    #[test]
    fn test_samples_source_addresses_second_stream() {
        let version = AggregateVersion {
            path: PathBuf::from("/data/out_2024-03-15.tsf"),
            token: "2024-03-15".to_string(),
        };
        assert_eq!(version.samples_source(), "/data/out_2024-03-15.tsf:2");
    }
}
