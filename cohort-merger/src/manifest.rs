//! Manifest batching and the manifest-of-manifests index.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{UpdateError, UpdateResult};
use crate::select::is_compressed_variant;
use crate::version::TRACK_EXTENSION;

/// Header row of the manifest-of-manifests index.
const MANIFEST_INDEX_HEADER: &str = "manifest_file";

/// Filename of the manifest-of-manifests index.
pub const MANIFEST_INDEX_FILE: &str = "manifest_list.csv";

/// Suffix shared by all manifest files.
pub const MANIFEST_SUFFIX: &str = ".manifest.txt";

/// A set of written manifests plus their index.
#[derive(Debug)]
pub struct ManifestSet {
    /// Written manifest files, in creation order.
    pub manifests: Vec<PathBuf>,
    /// The manifest-of-manifests index.
    pub index: PathBuf,
    /// Total input files across all manifests.
    pub file_count: usize,
}

/// Partitions `accepted` into contiguous chunks of at most `capacity` paths.
///
/// Each chunk is sorted lexically before being written, for deterministic
/// output downstream tooling can diff.
pub fn chunk_paths(accepted: &[PathBuf], capacity: usize) -> UpdateResult<Vec<Vec<PathBuf>>> {
    if capacity == 0 {
        return Err(UpdateError::InvalidInput {
            name: "manifest capacity",
            value: 0,
        });
    }
    if accepted.is_empty() {
        return Err(UpdateError::NoInput(
            "no accepted files to batch into manifests".to_string(),
        ));
    }

    Ok(accepted
        .chunks(capacity)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.sort();
            chunk
        })
        .collect())
}

/// Writes one manifest per chunk plus the manifest-of-manifests index.
///
/// Manifests are named `<prefix>_NNN.manifest.txt` with a zero-padded
/// 1-based sequence number; the index lists them in creation order.
pub fn write_manifests(
    chunks: &[Vec<PathBuf>],
    directory: &Path,
    prefix: &str,
) -> UpdateResult<ManifestSet> {
    let mut index_rows = String::from(MANIFEST_INDEX_HEADER);
    index_rows.push('\n');

    let mut manifests = Vec::with_capacity(chunks.len());
    let mut file_count = 0;

    for (i, chunk) in chunks.iter().enumerate() {
        let name = format!("{prefix}_{:03}{MANIFEST_SUFFIX}", i + 1);
        let path = directory.join(&name);

        let mut contents = String::new();
        for entry in chunk {
            contents.push_str(&entry.to_string_lossy());
            contents.push('\n');
        }
        fs::write(&path, contents)?;

        info!(manifest = %path.display(), files = chunk.len(), "wrote manifest");
        index_rows.push_str(&name);
        index_rows.push('\n');
        file_count += chunk.len();
        manifests.push(path);
    }

    let index = directory.join(MANIFEST_INDEX_FILE);
    fs::write(&index, index_rows)?;
    info!(index = %index.display(), manifests = manifests.len(), "wrote manifest index");

    Ok(ManifestSet {
        manifests,
        index,
        file_count,
    })
}

/// Reads a manifest, skipping blank and `#`-prefixed lines.
pub fn read_manifest(path: &Path) -> UpdateResult<Vec<PathBuf>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect())
}

/// Reads the manifest-of-manifests index: one manifest filename per row
/// after the header, resolved relative to the index file's directory.
pub fn read_manifest_index(path: &Path) -> UpdateResult<Vec<PathBuf>> {
    let contents = fs::read_to_string(path)?;
    let directory = path.parent().unwrap_or_else(|| Path::new("."));

    Ok(contents
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|name| directory.join(name))
        .collect())
}

/// Maps a manifest to the counts artifact the engine produced for it.
pub fn counts_file_for(manifest: &Path) -> PathBuf {
    let name = manifest.file_name().unwrap_or_default().to_string_lossy();
    let stem = name.strip_suffix(MANIFEST_SUFFIX).unwrap_or(&name);
    manifest.with_file_name(format!("{stem}{TRACK_EXTENSION}"))
}

/// Verifies every compressed variant file in `entries` has its `.tbi` index
/// companion on disk, reporting all missing companions at once.
pub fn verify_index_companions(entries: &[PathBuf]) -> UpdateResult<()> {
    let missing: Vec<PathBuf> = entries
        .iter()
        .filter(|path| is_compressed_variant(path))
        .map(|path| PathBuf::from(format!("{}.tbi", path.display())))
        .filter(|companion| !companion.exists())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    for companion in &missing {
        error!(path = %companion.display(), "missing index companion");
    }
    Err(UpdateError::MissingIndexes(missing))
}
