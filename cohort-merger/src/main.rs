//! CLI binary for the cohort-merger.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cohort_config::load_config_from;
use cohort_config::shared::UpdaterConfig;
use cohort_merger::{
    CommandSampleExtractor, RunInput, TrackUpdater, UpdateError, UpdateResult, chunk_paths,
    read_known_samples, scan_candidates, select_new_files, write_manifests,
};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Cohort Merger - Incrementally updates a cohort variant-frequencies track.
#[derive(Parser, Debug)]
#[command(name = "cohort-merger")]
#[command(about = "Incrementally updates a cohort variant-frequencies track")]
struct Args {
    /// Configuration file (yaml/yml/json)
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select candidate files carrying new samples and write manifest batches
    Select {
        /// File listing sample names already in the cohort, one per line
        #[arg(long)]
        known_samples: PathBuf,

        /// Directory to scan for candidate variant files
        #[arg(long)]
        candidates: PathBuf,

        /// Directory the manifests are written into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Run one end-to-end incremental update
    Update {
        /// Pre-built manifest file(s); when omitted, selection runs first
        #[arg(long)]
        manifest_file: Vec<PathBuf>,

        /// File listing known sample names (required without --manifest-file)
        #[arg(long)]
        known_samples: Option<PathBuf>,

        /// Candidate directory (required without --manifest-file)
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Start a fresh cohort, ignoring any existing counts
        #[arg(long)]
        skip_existing_counts: bool,
    },
    /// Fold per-manifest count tracks into the cohort
    MergeCounts {
        /// Manifest-of-manifests index written by `select`
        #[arg(long)]
        manifest_index: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run().await {
        error!("{err}");
        let code = match &err {
            UpdateError::EngineExecution { code, .. } if *code > 0 => *code,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run() -> UpdateResult<()> {
    let args = Args::parse();

    let config: UpdaterConfig =
        load_config_from(&args.config).map_err(|err| UpdateError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| UpdateError::Config(err.to_string()))?;

    match args.command {
        Command::Select {
            known_samples,
            candidates,
            out_dir,
        } => select_command(&config, &known_samples, &candidates, &out_dir),
        Command::Update {
            manifest_file,
            known_samples,
            candidates,
            skip_existing_counts,
        } => {
            update_command(
                config,
                manifest_file,
                known_samples,
                candidates,
                skip_existing_counts,
            )
            .await
        }
        Command::MergeCounts { manifest_index } => {
            merge_counts_command(config, &manifest_index).await
        }
    }
}

fn select_command(
    config: &UpdaterConfig,
    known_samples: &PathBuf,
    candidates: &PathBuf,
    out_dir: &PathBuf,
) -> UpdateResult<()> {
    let known = read_known_samples(known_samples)?;
    info!(known = known.len(), "loaded known sample names");

    let extractor = CommandSampleExtractor::new(config.engine.extractor.clone());
    let listing = scan_candidates(candidates)?;
    let selection = select_new_files(&listing, &known, &extractor);
    info!(
        accepted = selection.accepted.len(),
        rejected = selection.rejected.len(),
        "candidate selection complete"
    );

    if selection.accepted.is_empty() {
        info!("no files with new samples found, no manifests created");
        return Ok(());
    }

    let chunks = chunk_paths(&selection.accepted, config.manifest.capacity)?;
    let set = write_manifests(&chunks, out_dir, &config.manifest.prefix)?;
    info!(
        manifests = set.manifests.len(),
        files = set.file_count,
        index = %set.index.display(),
        "manifests written"
    );

    Ok(())
}

async fn update_command(
    config: UpdaterConfig,
    manifest_file: Vec<PathBuf>,
    known_samples: Option<PathBuf>,
    candidates: Option<PathBuf>,
    skip_existing_counts: bool,
) -> UpdateResult<()> {
    let input = if !manifest_file.is_empty() {
        RunInput::Manifests(manifest_file)
    } else {
        match (known_samples, candidates) {
            (Some(known_samples), Some(candidates)) => RunInput::Directory {
                candidates,
                known_samples,
            },
            _ => {
                return Err(UpdateError::Config(
                    "--known-samples and --candidates are required without --manifest-file"
                        .to_string(),
                ));
            }
        }
    };

    let mut updater = TrackUpdater::new(config);
    let summary = updater.run(input, skip_existing_counts).await?;

    info!(
        files = summary.files_merged,
        manifests = summary.manifests,
        "update complete"
    );
    println!("{}", summary.output.path.display());

    Ok(())
}

async fn merge_counts_command(config: UpdaterConfig, manifest_index: &PathBuf) -> UpdateResult<()> {
    let mut updater = TrackUpdater::new(config);
    let summary = updater.run_counts_merge(manifest_index).await?;

    info!(
        counts_tracks = summary.files_merged,
        "counts merge complete"
    );
    println!("{}", summary.output.path.display());

    Ok(())
}
