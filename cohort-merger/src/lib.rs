//! Incremental maintenance of a cohort allele-frequency track.
//!
//! Newly arrived per-sample variant files are discovered, deduplicated
//! against the samples already folded into the aggregate, batched into
//! bounded manifests, and handed to an external merge engine together with a
//! declarative task graph describing the pipeline. The engine performs the
//! actual parallel work; this crate decides what it runs on and how wide.
//!
//! # Architecture
//!
//! - `workers` — pure allocator mapping (CPU budget, file count) to the
//!   engine's reader/flattener topology.
//! - `samples` / `select` — sample-name extraction and classification of
//!   candidate files into all-new versus already-known.
//! - `manifest` — bounded, sorted manifest batches plus their index.
//! - `version` — resolution of the most recent versioned aggregate and
//!   naming of the next one.
//! - `taskgraph` — the declarative pipeline document the engine consumes.
//! - `engine` — child-process invocation with concurrent output draining.
//! - `updater` — the run state machine tying the above together.

mod engine;
mod error;
mod manifest;
mod samples;
mod select;
mod taskgraph;
mod updater;
mod version;
mod workers;

pub use engine::MergeEngine;
pub use error::{UpdateError, UpdateResult};
pub use manifest::{
    MANIFEST_INDEX_FILE, MANIFEST_SUFFIX, ManifestSet, chunk_paths, counts_file_for,
    read_manifest, read_manifest_index, verify_index_companions, write_manifests,
};
pub use samples::{CommandSampleExtractor, SampleExtractor, SampleSet, read_known_samples};
pub use select::{
    COMPRESSED_VARIANT_SUFFIX, FileSelection, is_compressed_variant, scan_candidates,
    select_new_files,
};
pub use taskgraph::{
    GraphInputs, OutputSpec, SourceMeta, SourceProp, SourceTaskList, Stage, Task, TaskGraph,
    build_counts_graph, build_update_graph,
};
pub use updater::{RunInput, TrackUpdater, UpdatePhase, UpdateSummary};
pub use version::{
    AggregateVersion, TRACK_EXTENSION, next_version, resolve_latest, resolve_latest_in_dir,
    version_token,
};
pub use workers::{WorkerTopology, allocate_workers};
