use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mutscan::config::{build_experiment, load_config};
use mutscan::sequence::{Aligner, ReferenceSequence};
use mutscan::variant::{CallOutcome, VariantCaller, DEFAULT_MAX_MUTATIONS, WILD_TYPE_VARIANT};

#[derive(Parser, Debug)]
#[command(name = "mutscan", about = "Deep mutational scanning count engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a configured experiment end to end.
    Run {
        /// Experiment configuration (JSON).
        config: PathBuf,
    },
    /// Call variants for reads against a reference, one read per line.
    Call {
        /// Wild-type reference sequence over ACGT.
        #[arg(long)]
        reference: String,
        /// Reads file (one sequence per line).
        reads: PathBuf,
        /// Treat the reference as protein coding.
        #[arg(long, default_value_t = false)]
        coding: bool,
        /// Offset added to reported nucleotide positions.
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Enable the alignment fallback for indel-containing reads.
        #[arg(long, default_value_t = false)]
        align: bool,
        /// Maximum mutations per read before rejection.
        #[arg(long, default_value_t = DEFAULT_MAX_MUTATIONS)]
        max_mutations: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => run_experiment(config)?,
        Commands::Call {
            reference,
            reads,
            coding,
            offset,
            align,
            max_mutations,
        } => run_call(reference, reads, coding, offset, align, max_mutations)?,
    }
    Ok(())
}

fn run_experiment(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)
        .with_context(|| format!("failed to load configuration {}", config_path.display()))?;
    let mut experiment =
        build_experiment(&config).context("failed to build the experiment tree")?;
    experiment
        .calculate()
        .with_context(|| format!("calculation failed for experiment '{}'", experiment.name()))?;

    for condition in experiment.conditions() {
        for selection in condition.selections() {
            use mutscan::store::TableStore;
            for key in selection.store().keys() {
                println!("{}/{}: {}", condition.name(), selection.name(), key);
            }
        }
    }
    Ok(())
}

fn run_call(
    reference: String,
    reads_path: PathBuf,
    coding: bool,
    offset: usize,
    align: bool,
    max_mutations: usize,
) -> Result<()> {
    let reference = Arc::new(
        ReferenceSequence::new("cli", &reference, coding, offset)
            .context("invalid reference sequence")?,
    );
    let aligner = align.then(Aligner::with_default_matrix);
    let mut caller = VariantCaller::new(reference, aligner, max_mutations);

    let contents = std::fs::read_to_string(&reads_path)
        .with_context(|| format!("failed to open reads file {}", reads_path.display()))?;
    for (idx, line) in contents.lines().enumerate() {
        let read = line.trim();
        if read.is_empty() {
            continue;
        }
        let outcome = caller
            .call(read)
            .with_context(|| format!("calling failed for read {}", idx + 1))?;
        match outcome {
            CallOutcome::WildType => println!("{read}\t{WILD_TYPE_VARIANT}"),
            CallOutcome::Variant(variant) => println!("{read}\t{variant}"),
            CallOutcome::Rejected(reason) => println!("{read}\trejected: {reason}"),
        }
    }
    Ok(())
}
