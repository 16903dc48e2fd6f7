//! End-to-end orchestration of one cohort track update.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use cohort_config::shared::UpdaterConfig;
use tracing::info;

use crate::engine::MergeEngine;
use crate::error::{UpdateError, UpdateResult};
use crate::manifest;
use crate::samples::{CommandSampleExtractor, SampleExtractor, read_known_samples};
use crate::select;
use crate::taskgraph::{GraphInputs, OutputSpec, build_counts_graph, build_update_graph};
use crate::version::{
    AggregateVersion, TRACK_EXTENSION, next_version, resolve_latest_in_dir, version_token,
};
use crate::workers::allocate_workers;

/// Task-graph document written for an update run.
const UPDATE_GRAPH_FILE: &str = "merge_tasks.yaml";

/// Task-graph document written for a counts-merge run.
const COUNTS_GRAPH_FILE: &str = "merge_counts_tasks.yaml";

/// Manifest listing the count tracks of a counts-merge run.
const COUNTS_MANIFEST_FILE: &str = "counts_merge.manifest.txt";

/// Merge-stage buffer for count tracks, which carry far fewer records per
/// position than raw variant files.
const COUNTS_INPUT_BUFFER_SIZE: u32 = 100;

/// Phases of one update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Gathering manifests, the prior version, and the worker topology.
    ResolvingInputs,
    /// Assembling and writing the task graph.
    BuildingGraph,
    /// Engine invocations in flight.
    Invoking,
    /// Post-write optimization and cleanup.
    Finalizing,
    /// Run completed.
    Done,
    /// Run failed; no further phases execute.
    Aborted,
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdatePhase::ResolvingInputs => "resolving-inputs",
            UpdatePhase::BuildingGraph => "building-graph",
            UpdatePhase::Invoking => "invoking",
            UpdatePhase::Finalizing => "finalizing",
            UpdatePhase::Done => "done",
            UpdatePhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Where an update run's input files come from.
#[derive(Debug, Clone)]
pub enum RunInput {
    /// Scan a directory and select files whose samples are new.
    Directory {
        candidates: PathBuf,
        known_samples: PathBuf,
    },
    /// Use manifests that were already built out-of-band.
    Manifests(Vec<PathBuf>),
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct UpdateSummary {
    /// The produced aggregate version.
    pub output: AggregateVersion,
    /// Input files merged.
    pub files_merged: usize,
    /// Manifests processed.
    pub manifests: usize,
}

/// Drives one end-to-end update of the cohort track.
///
/// The updater's own control flow is single-threaded; the engine performs
/// the parallel work with the topology handed to it. Each run is a stateless
/// function of (candidate files, known samples, existing aggregate, CPU
/// budget): re-running with the same inputs selects the same files and
/// produces an equivalent aggregate, under a new version token.
pub struct TrackUpdater {
    config: UpdaterConfig,
    engine: MergeEngine,
    extractor: Box<dyn SampleExtractor>,
    phase: UpdatePhase,
}

impl TrackUpdater {
    /// Creates an updater using the configured engine and extractor binaries.
    pub fn new(config: UpdaterConfig) -> Self {
        let extractor = Box::new(CommandSampleExtractor::new(config.engine.extractor.clone()));
        Self::with_extractor(config, extractor)
    }

    /// Creates an updater with an injected sample extractor.
    pub fn with_extractor(config: UpdaterConfig, extractor: Box<dyn SampleExtractor>) -> Self {
        let engine = MergeEngine::new(
            config.engine.binary.clone(),
            config.workspace.annotations_folder(),
            config.engine.suppressed_diagnostics.clone(),
        );
        Self {
            config,
            engine,
            extractor,
            phase: UpdatePhase::ResolvingInputs,
        }
    }

    /// The phase the updater is currently in.
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    /// Runs one incremental update; returns a summary naming the produced
    /// aggregate version.
    pub async fn run(&mut self, input: RunInput, skip_existing: bool) -> UpdateResult<UpdateSummary> {
        self.phase = UpdatePhase::ResolvingInputs;
        match self.run_update(input, skip_existing).await {
            Ok(summary) => {
                self.enter(UpdatePhase::Done);
                Ok(summary)
            }
            Err(err) => {
                self.enter(UpdatePhase::Aborted);
                Err(err)
            }
        }
    }

    /// Folds per-manifest count tracks into the cohort. The manifests named
    /// by `manifest_index` must already have been processed into count
    /// tracks by earlier per-manifest runs.
    pub async fn run_counts_merge(&mut self, manifest_index: &Path) -> UpdateResult<UpdateSummary> {
        self.phase = UpdatePhase::ResolvingInputs;
        match self.run_counts(manifest_index).await {
            Ok(summary) => {
                self.enter(UpdatePhase::Done);
                Ok(summary)
            }
            Err(err) => {
                self.enter(UpdatePhase::Aborted);
                Err(err)
            }
        }
    }

    async fn run_update(
        &mut self,
        input: RunInput,
        skip_existing: bool,
    ) -> UpdateResult<UpdateSummary> {
        let (out_dir, base_name) = self.output_location();
        fs::create_dir_all(&out_dir)?;

        let manifests = match input {
            RunInput::Manifests(list) if list.is_empty() => {
                return Err(UpdateError::NoInput("no manifests supplied".to_string()));
            }
            RunInput::Manifests(list) => list,
            RunInput::Directory {
                candidates,
                known_samples,
            } => {
                let known = read_known_samples(&known_samples)?;
                info!(known = known.len(), "loaded known sample names");

                let listing = select::scan_candidates(&candidates)?;
                let selection =
                    select::select_new_files(&listing, &known, self.extractor.as_ref());
                info!(
                    accepted = selection.accepted.len(),
                    rejected = selection.rejected.len(),
                    "candidate selection complete"
                );

                let chunks =
                    manifest::chunk_paths(&selection.accepted, self.config.manifest.capacity)?;
                let set =
                    manifest::write_manifests(&chunks, &out_dir, &self.config.manifest.prefix)?;
                set.manifests
            }
        };

        let mut file_count = 0;
        for path in &manifests {
            let entries = manifest::read_manifest(path)?;
            manifest::verify_index_companions(&entries)?;
            file_count += entries.len();
        }
        if file_count == 0 {
            return Err(UpdateError::NoInput(
                "manifests list no input files".to_string(),
            ));
        }

        let prior = self.resolve_prior(&out_dir, &base_name, skip_existing)?;
        let topology = allocate_workers(
            i64::from(self.config.resources.cpu_cores),
            file_count as i64,
        )?;
        info!(
            cpu_cores = self.config.resources.cpu_cores,
            memory_gb = self.config.resources.memory_gb,
            files = file_count,
            reader_threads = topology.reader_threads,
            readers_per_flattener = topology.readers_per_flattener,
            flatteners = topology.flattener_count,
            projected_total = topology.projected_total_threads,
            "resolved worker topology"
        );

        self.enter(UpdatePhase::BuildingGraph);
        let now = Utc::now();
        let output = AggregateVersion {
            path: next_version(&out_dir, &base_name, now),
            token: version_token(now),
        };
        let skipped_log = out_dir.join(format!("{base_name}_skipped_duplicates.txt"));

        if let Some(prior) = &prior {
            self.snapshot_schemas(prior, &out_dir).await?;
        }

        let graph = build_update_graph(&GraphInputs {
            topology,
            prior,
            record_filter: self.config.track.record_filter.clone(),
            sample_filter: self.config.track.sample_filter.clone(),
            source_name_prefix: self.config.track.source_name(),
            sample_name_threshold: self.config.track.sample_name_threshold,
            input_buffer_size: self.config.engine.input_buffer_size,
            skipped_log: skipped_log.clone(),
            output: self.output_spec(&output),
        })?;
        let graph_path = out_dir.join(UPDATE_GRAPH_FILE);
        graph.write(&graph_path)?;
        info!(graph = %graph_path.display(), "wrote task graph");

        self.enter(UpdatePhase::Invoking);
        for path in &manifests {
            self.engine.run(path, &graph_path).await?;
        }

        self.enter(UpdatePhase::Finalizing);
        self.engine.precompute(&output.path).await?;
        remove_empty_log(&skipped_log)?;

        info!(output = %output.path.display(), "cohort track updated");
        Ok(UpdateSummary {
            output,
            files_merged: file_count,
            manifests: manifests.len(),
        })
    }

    async fn run_counts(&mut self, manifest_index: &Path) -> UpdateResult<UpdateSummary> {
        let (out_dir, base_name) = self.output_location();
        fs::create_dir_all(&out_dir)?;

        let manifests = manifest::read_manifest_index(manifest_index)?;
        if manifests.is_empty() {
            return Err(UpdateError::NoInput(format!(
                "manifest index `{}` lists no manifests",
                manifest_index.display()
            )));
        }

        let counts_files: Vec<PathBuf> =
            manifests.iter().map(|m| manifest::counts_file_for(m)).collect();
        for path in &counts_files {
            if !path.is_file() {
                return Err(UpdateError::MissingArtifact(path.clone()));
            }
            info!(counts = %path.display(), "using count track");
        }

        let merge_manifest = out_dir.join(COUNTS_MANIFEST_FILE);
        let mut contents = String::new();
        for path in &counts_files {
            contents.push_str(&path.to_string_lossy());
            contents.push('\n');
        }
        fs::write(&merge_manifest, contents)?;

        let prior = self.resolve_prior(&out_dir, &base_name, false)?;
        let topology = allocate_workers(
            i64::from(self.config.resources.cpu_cores),
            counts_files.len() as i64,
        )?;

        self.enter(UpdatePhase::BuildingGraph);
        let now = Utc::now();
        let output = AggregateVersion {
            path: next_version(&out_dir, &base_name, now),
            token: version_token(now),
        };

        let graph = build_counts_graph(&GraphInputs {
            topology,
            prior,
            record_filter: None,
            sample_filter: None,
            source_name_prefix: self.config.track.source_name(),
            sample_name_threshold: self.config.track.sample_name_threshold,
            input_buffer_size: COUNTS_INPUT_BUFFER_SIZE,
            skipped_log: out_dir.join(format!("{base_name}_skipped_duplicates.txt")),
            output: self.output_spec(&output),
        })?;
        let graph_path = out_dir.join(COUNTS_GRAPH_FILE);
        graph.write(&graph_path)?;
        info!(graph = %graph_path.display(), "wrote task graph");

        self.enter(UpdatePhase::Invoking);
        self.engine.run(&merge_manifest, &graph_path).await?;

        self.enter(UpdatePhase::Finalizing);
        self.engine.precompute(&output.path).await?;

        info!(output = %output.path.display(), "cohort counts merged");
        Ok(UpdateSummary {
            output,
            files_merged: counts_files.len(),
            manifests: manifests.len(),
        })
    }

    fn enter(&mut self, phase: UpdatePhase) {
        info!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    /// Splits the configured output base into the directory the versions
    /// live in and the bare base name, tolerating a supplied extension.
    fn output_location(&self) -> (PathBuf, String) {
        let base = self
            .config
            .track
            .output_base
            .strip_suffix(TRACK_EXTENSION)
            .unwrap_or(&self.config.track.output_base);
        let relative = Path::new(base);

        let out_dir = match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                self.config.workspace.root.join(parent)
            }
            _ => self.config.workspace.root.clone(),
        };
        let base_name = relative
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| base.to_string());

        (out_dir, base_name)
    }

    fn resolve_prior(
        &self,
        out_dir: &Path,
        base_name: &str,
        skip_existing: bool,
    ) -> UpdateResult<Option<AggregateVersion>> {
        if skip_existing {
            info!("prior counts disabled, starting a fresh cohort");
            return Ok(None);
        }

        let prior = resolve_latest_in_dir(out_dir, base_name)?;
        match &prior {
            Some(version) => {
                info!(prior = %version.path.display(), token = %version.token, "extending prior version")
            }
            None => info!("no prior version found, starting a fresh cohort"),
        }
        Ok(prior)
    }

    fn output_spec(&self, output: &AggregateVersion) -> OutputSpec {
        OutputSpec {
            path: output.path.clone(),
            coord_sys_id: self.config.workspace.assembly.coord_sys_id().to_string(),
            series_name: self.config.track.series_name.clone(),
            source_version: output.token.clone(),
        }
    }

    async fn snapshot_schemas(
        &self,
        prior: &AggregateVersion,
        out_dir: &Path,
    ) -> UpdateResult<()> {
        self.engine
            .schema(
                &prior.path.display().to_string(),
                &out_dir.join("existing_schema.json"),
            )
            .await?;
        self.engine
            .schema(
                &prior.samples_source(),
                &out_dir.join("existing_schema_samples.json"),
            )
            .await?;
        Ok(())
    }
}

/// Removes `path` iff it exists and is empty, meaning nothing was skipped.
fn remove_empty_log(path: &Path) -> UpdateResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => {
            fs::remove_file(path)?;
            info!(path = %path.display(), "removed empty skipped-duplicates log");
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
