//! End-to-end selection and manifest batching.
//!
//! Exercises the path from a candidate directory listing through sample
//! classification to written manifest batches and their index.

mod support;

use std::fs;
use std::path::PathBuf;

use cohort_merger::{
    chunk_paths, read_known_samples, read_manifest, scan_candidates, select_new_files,
    write_manifests,
};
use support::FakeExtractor;

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

#[test]
fn test_selection_to_manifests_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = dir.path().join("candidates");
    fs::create_dir_all(&candidates).unwrap();
    for name in [
        "a.vcf.gz",
        "b.vcf.gz",
        "c.vcf.gz",
        "d.vcf.gz",
        "e.vcf.gz",
        "notes.txt",
    ] {
        fs::write(candidates.join(name), b"x").unwrap();
    }
    let known_path = dir.path().join("known.txt");
    fs::write(&known_path, "K1\nK2\n").unwrap();

    let extractor = FakeExtractor::new(&[
        ("a.vcf.gz", &["S1"]),
        // One known sample rejects the whole file, S2 included.
        ("b.vcf.gz", &["K1", "S2"]),
        ("c.vcf.gz", &["S3", "S4"]),
        ("d.vcf.gz", &["S5"]),
        // e.vcf.gz is absent from the map: extraction fails, file skipped.
    ]);

    let known = read_known_samples(&known_path).unwrap();
    let listing = scan_candidates(&candidates).unwrap();
    let selection = select_new_files(&listing, &known, &extractor);

    assert_eq!(
        file_names(&selection.accepted),
        vec!["a.vcf.gz", "c.vcf.gz", "d.vcf.gz"]
    );
    assert_eq!(file_names(&selection.rejected), vec!["b.vcf.gz", "e.vcf.gz"]);

    let out = dir.path().join("manifests");
    fs::create_dir_all(&out).unwrap();
    let chunks = chunk_paths(&selection.accepted, 2).unwrap();
    let set = write_manifests(&chunks, &out, "manifest").unwrap();

    assert_eq!(set.manifests.len(), 2);
    assert_eq!(set.file_count, 3);
    assert_eq!(read_manifest(&set.manifests[0]).unwrap().len(), 2);
    assert_eq!(read_manifest(&set.manifests[1]).unwrap().len(), 1);

    let index = fs::read_to_string(&set.index).unwrap();
    assert!(index.starts_with("manifest_file\n"));
    assert!(index.contains("manifest_001.manifest.txt"));
    assert!(index.contains("manifest_002.manifest.txt"));
}
