//! Declarative task-graph documents consumed by the merge engine.
//!
//! The engine takes an ordered YAML sequence of stage records, each a tagged
//! key-value block. Stages are modeled as serde enums and serialized through
//! `singleton_map_recursive`, so each record renders as a single-key map and
//! parameterless tasks render as bare strings — the form the engine parses.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{UpdateError, UpdateResult};
use crate::version::AggregateVersion;
use crate::workers::WorkerTopology;

/// Fields retained for the merge; everything else is dropped to bound the
/// merge stage's memory footprint.
const MERGE_FIELDS: [&str; 6] = ["RefAlt", "REF", "ALT", "GT", "END", "Samples"];

/// Field kept by the samples-only output view.
const SAMPLES_FIELD: &str = "Samples";

/// A named property pinned on a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceProp {
    /// A string-typed source property.
    StringProp {
        name: String,
        value: serde_yaml::Value,
    },
}

/// Track metadata stamped by a writer task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeta {
    /// Coordinate-system identifier of the track.
    pub coord_sys_id: String,
    /// Series the track belongs to. The samples-only view omits it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    /// Version token stamped on the track.
    pub source_version: String,
}

/// One entry of a per-source task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Task {
    /// Pins source properties so multi-sample span records stay stable
    /// across inputs.
    #[serde(rename_all = "camelCase")]
    StableSourcePropTransform { source_props: Vec<SourceProp> },
    /// Splits compound alleles into primitive representation (engine
    /// spelling).
    #[serde(rename = "alleleicPrimitives")]
    AllelicPrimitives,
    /// Drops records and/or samples failing the given expressions. The
    /// expressions are opaque to this system; the engine evaluates them.
    #[serde(rename_all = "camelCase")]
    FilterByExpr {
        #[serde(skip_serializing_if = "Option::is_none")]
        expr: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample_expr: Option<String>,
    },
    /// Projects the record down to the named fields.
    #[serde(rename_all = "camelCase")]
    KeepFields { keep_symbols: Vec<String> },
    /// Splits multi-allelic records into one record per alternate allele.
    FullyFlattenedMultiAllelicSplit,
    /// Left-aligns indel representations.
    LeftAlign,
    /// Trims bases shared by reference and alternate alleles.
    TrimCommonBases,
    /// Collapses equivalent variant records.
    VariantCollapsing,
    /// Materializes the annotation structure for writing.
    CreateAnnotation,
    /// Writes the stream to a track artifact.
    #[serde(rename = "TsfWriterTask", rename_all = "camelCase")]
    TsfWriter {
        file_path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_file: Option<bool>,
        source_meta: SourceMeta,
    },
    /// Restricts the written view to a usage-space subset.
    #[serde(rename_all = "camelCase")]
    SubsetUsageSpace { usage_space: String },
}

/// A per-output task list: one logical view of the produced artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceTaskList {
    /// Task list applied to one output view.
    #[serde(rename = "SourceTaskListTask", rename_all = "camelCase")]
    SourceTaskListTask { task_list: Vec<Task> },
}

/// One stage of the engine pipeline. Stages run in sequence; each stage's
/// output is the next stage's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Drops whole input files whose samples already exist in the counts
    /// source, logging them to `log_file`.
    #[serde(rename = "FilterFilesWithSamplesTask", rename_all = "camelCase")]
    FilterFilesWithSamples {
        samples_file_path: String,
        log_file: PathBuf,
    },
    /// Applies a task list to each input independently.
    #[serde(rename_all = "camelCase")]
    ForEach { input_count: u32, task_list: Vec<Task> },
    /// Combines the per-file streams into one position-ordered stream.
    #[serde(rename_all = "camelCase")]
    MergeVariantsTransform {
        only_merge_matching_ref_alts: bool,
        merge_different_record_types: bool,
        input_buffer_size: u32,
        reader_worker_threads: u32,
        readers_per_flattener: u32,
    },
    /// Folds merged per-sample data into the prior version's counts.
    #[serde(rename_all = "camelCase")]
    AdditiveCountAlleles {
        existing_counts_source: String,
        existing_counts_sample_source: String,
        count_no_calls: bool,
        source_name_prefix: String,
        output_sample_names_threshold: u32,
    },
    /// Fans the merged stream out into per-output task lists.
    #[serde(rename_all = "camelCase")]
    RunTaskLists { task_lists: Vec<SourceTaskList> },
}

/// An ordered pipeline description, written once and consumed exactly once
/// by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph(
    #[serde(with = "serde_yaml::with::singleton_map_recursive")] pub Vec<Stage>,
);

impl TaskGraph {
    /// The ordered stage sequence.
    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    /// Serializes the graph to the engine's YAML wire form.
    pub fn to_yaml(&self) -> UpdateResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parses a graph back from its YAML wire form.
    pub fn from_yaml(document: &str) -> UpdateResult<Self> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// Writes the graph to `path` in the engine's wire form.
    pub fn write(&self, path: &Path) -> UpdateResult<()> {
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Output description for the dual-write stage.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    /// Path of the artifact to write.
    pub path: PathBuf,
    /// Coordinate-system identifier stamped on the track.
    pub coord_sys_id: String,
    /// Series the track belongs to.
    pub series_name: String,
    /// Version token stamped on the track.
    pub source_version: String,
}

/// Everything needed to assemble a pipeline document.
#[derive(Debug, Clone)]
pub struct GraphInputs {
    /// Worker topology for the merge stage.
    pub topology: WorkerTopology,
    /// Prior aggregate to extend, if any.
    pub prior: Option<AggregateVersion>,
    /// Record-level filter expression, passed through verbatim.
    pub record_filter: Option<String>,
    /// Per-sample filter expression, passed through verbatim.
    pub sample_filter: Option<String>,
    /// Display-name prefix for the counts source.
    pub source_name_prefix: String,
    /// Maximum sample names enumerated per rare variant.
    pub sample_name_threshold: u32,
    /// Merge-stage record buffer size.
    pub input_buffer_size: u32,
    /// Log file for inputs dropped because their samples already exist.
    /// Unused by the counts-merge pipeline, which has no such filter.
    pub skipped_log: PathBuf,
    /// Output description.
    pub output: OutputSpec,
}

/// Assembles the full update pipeline: duplicate-file filter (when a prior
/// version exists), per-record normalization, optional expression filters,
/// field projection, flattening and canonicalization, merge, additive
/// counting, dual write.
pub fn build_update_graph(inputs: &GraphInputs) -> UpdateResult<TaskGraph> {
    validate_prior(inputs.prior.as_ref())?;

    let mut stages = Vec::new();

    if let Some(prior) = &inputs.prior {
        stages.push(Stage::FilterFilesWithSamples {
            samples_file_path: prior.samples_source(),
            log_file: inputs.skipped_log.clone(),
        });
    }

    stages.push(Stage::ForEach {
        input_count: 1,
        task_list: normalization_tasks(inputs),
    });
    stages.push(merge_stage(inputs));
    stages.push(counting_stage(inputs));
    stages.push(Stage::RunTaskLists {
        task_lists: output_task_lists(&inputs.output),
    });

    Ok(TaskGraph(stages))
}

/// Assembles the reduced counts-merge pipeline. The inputs are count tracks
/// produced by earlier per-manifest passes and need no normalization: merge,
/// additive counting, dual write.
pub fn build_counts_graph(inputs: &GraphInputs) -> UpdateResult<TaskGraph> {
    validate_prior(inputs.prior.as_ref())?;

    Ok(TaskGraph(vec![
        merge_stage(inputs),
        counting_stage(inputs),
        Stage::RunTaskLists {
            task_lists: output_task_lists(&inputs.output),
        },
    ]))
}

fn validate_prior(prior: Option<&AggregateVersion>) -> UpdateResult<()> {
    if let Some(prior) = prior
        && !prior.path.is_file()
    {
        return Err(UpdateError::MissingArtifact(prior.path.clone()));
    }

    Ok(())
}

fn normalization_tasks(inputs: &GraphInputs) -> Vec<Task> {
    let mut tasks = vec![
        Task::StableSourcePropTransform {
            source_props: vec![SourceProp::StringProp {
                name: "CombineGVCFSpanRecord".to_string(),
                value: serde_yaml::Value::Bool(true),
            }],
        },
        Task::AllelicPrimitives,
    ];

    if inputs.record_filter.is_some() || inputs.sample_filter.is_some() {
        tasks.push(Task::FilterByExpr {
            expr: inputs.record_filter.clone(),
            sample_expr: inputs.sample_filter.clone(),
        });
    }

    tasks.push(Task::KeepFields {
        keep_symbols: MERGE_FIELDS.iter().map(|field| field.to_string()).collect(),
    });
    tasks.extend([
        Task::FullyFlattenedMultiAllelicSplit,
        Task::LeftAlign,
        Task::TrimCommonBases,
        Task::VariantCollapsing,
    ]);

    tasks
}

fn merge_stage(inputs: &GraphInputs) -> Stage {
    Stage::MergeVariantsTransform {
        only_merge_matching_ref_alts: true,
        merge_different_record_types: false,
        input_buffer_size: inputs.input_buffer_size,
        reader_worker_threads: inputs.topology.reader_threads,
        readers_per_flattener: inputs.topology.readers_per_flattener,
    }
}

fn counting_stage(inputs: &GraphInputs) -> Stage {
    let (counts_source, sample_source) = match &inputs.prior {
        Some(prior) => (prior.path.display().to_string(), prior.samples_source()),
        None => (String::new(), String::new()),
    };

    Stage::AdditiveCountAlleles {
        existing_counts_source: counts_source,
        existing_counts_sample_source: sample_source,
        count_no_calls: true,
        source_name_prefix: inputs.source_name_prefix.clone(),
        output_sample_names_threshold: inputs.sample_name_threshold,
    }
}

fn output_task_lists(output: &OutputSpec) -> Vec<SourceTaskList> {
    vec![
        // Full-annotation view.
        SourceTaskList::SourceTaskListTask {
            task_list: vec![
                Task::CreateAnnotation,
                Task::TsfWriter {
                    file_path: output.path.clone(),
                    new_file: None,
                    source_meta: SourceMeta {
                        coord_sys_id: output.coord_sys_id.clone(),
                        series_name: Some(output.series_name.clone()),
                        source_version: output.source_version.clone(),
                    },
                },
            ],
        },
        // Samples-only view: registers the sample list and version without
        // duplicating the full annotation payload.
        SourceTaskList::SourceTaskListTask {
            task_list: vec![
                Task::KeepFields {
                    keep_symbols: vec![SAMPLES_FIELD.to_string()],
                },
                Task::SubsetUsageSpace {
                    usage_space: "[]".to_string(),
                },
                Task::TsfWriter {
                    file_path: output.path.clone(),
                    new_file: Some(false),
                    source_meta: SourceMeta {
                        coord_sys_id: output.coord_sys_id.clone(),
                        series_name: None,
                        source_version: output.source_version.clone(),
                    },
                },
            ],
        },
    ]
}
