//! sweep - microbiome × clinical association sweeps
//!
//! Command-line interface for running a sweep over a cohort.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use cohort_sweep::aggregate::ResultWriter;
use cohort_sweep::assemble::SampleData;
use cohort_sweep::data::{AnalysisFrame, CountMatrix, Metadata, PhyloTree, TaxonomyMap};
use cohort_sweep::error::{Result, SweepError};
use cohort_sweep::features::{collapse, TaxonomicLevel};
use cohort_sweep::profile::{profile_abundance, PRESENCE_THRESHOLD};
use cohort_sweep::sweep::{run_sweep, SweepConfig, SweepInputs};
use log::LevelFilter;
use std::path::{Path, PathBuf};

/// Microbiome × clinical cohort association sweep
#[derive(Parser)]
#[command(name = "sweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sweep over every subset, outcome and model
    Run {
        /// Path to the feature count table TSV (features × samples)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to the taxonomy TSV (Feature ID, Taxon)
        #[arg(short = 'x', long)]
        taxonomy: PathBuf,

        /// Path to a Newick tree; UniFrac is skipped without one
        #[arg(long)]
        tree: Option<PathBuf>,

        /// Path to the sample metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Sweep configuration YAML (replaces the list-file options)
        #[arg(long, conflicts_with_all = ["models", "outcomes", "cohort", "subsets"])]
        config: Option<PathBuf>,

        /// File with one base model per line
        #[arg(long)]
        models: Option<PathBuf>,

        /// File with one outcome per line
        #[arg(long)]
        outcomes: Option<PathBuf>,

        /// File whose first line is the cohort label
        #[arg(long)]
        cohort: Option<PathBuf>,

        /// File with one subset per line
        #[arg(long)]
        subsets: Option<PathBuf>,

        /// Worker threads for distance computation
        #[arg(short, long)]
        threads: Option<usize>,

        /// Processing label (16s or a metagenomic label)
        #[arg(short, long)]
        label: Option<String>,

        /// Study-specific factors, comma separated, or NA
        #[arg(long, default_value = "NA")]
        factors: String,

        /// Run date used in output names (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Generate an example sweep configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "sweep.yaml")]
        output: PathBuf,
    },

    /// Genus-level relative abundance profile of a count table
    Profile {
        /// Path to the feature count table TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to the taxonomy TSV
        #[arg(short = 'x', long)]
        taxonomy: PathBuf,

        /// Output TSV path
        #[arg(short, long, default_value = "Prev_Abundance_per_genus.tsv")]
        output: PathBuf,

        /// Print the profile as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Run {
            counts,
            taxonomy,
            tree,
            metadata,
            config,
            models,
            outcomes,
            cohort,
            subsets,
            threads,
            label,
            factors,
            date,
        } => load_config(config, models, outcomes, cohort, subsets, &factors).and_then(|mut cfg| {
            if let Some(threads) = threads {
                cfg.threads = threads;
            }
            if let Some(label) = label {
                cfg.label = label;
            }
            cmd_run(&cfg, &counts, &taxonomy, tree.as_deref(), &metadata, date.as_deref())
        }),

        Commands::Example { output } => cmd_example(&output),

        Commands::Profile {
            counts,
            taxonomy,
            output,
            json,
        } => cmd_profile(&counts, &taxonomy, &output, json),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(
    config: Option<PathBuf>,
    models: Option<PathBuf>,
    outcomes: Option<PathBuf>,
    cohort: Option<PathBuf>,
    subsets: Option<PathBuf>,
    factors: &str,
) -> Result<SweepConfig> {
    if let Some(path) = config {
        log::info!("Loading sweep configuration from {:?}", path);
        return SweepConfig::from_yaml_file(path);
    }
    match (models, outcomes, cohort, subsets) {
        (Some(m), Some(o), Some(c), Some(s)) => SweepConfig::from_list_files(&m, &o, &c, &s, factors),
        _ => Err(SweepError::Configuration(
            "Either --config or all of --models, --outcomes, --cohort and --subsets are required"
                .to_string(),
        )),
    }
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| SweepError::Configuration(format!("Invalid date '{}': {}", d, e))),
        None => Ok(Local::now().date_naive()),
    }
}

/// Run the sweep from loaded inputs
fn cmd_run(
    config: &SweepConfig,
    counts_path: &Path,
    taxonomy_path: &Path,
    tree_path: Option<&Path>,
    metadata_path: &Path,
    date: Option<&str>,
) -> Result<()> {
    let date = parse_date(date)?;
    log::info!(
        "Cohort '{}', label '{}', {} threads, factors {:?}",
        config.cohort,
        config.label,
        config.threads,
        config.factors
    );

    log::info!("Loading data...");
    let counts = CountMatrix::from_tsv(counts_path)?;
    let taxonomy = TaxonomyMap::from_tsv(taxonomy_path)?;
    let tree = tree_path.map(PhyloTree::from_newick_file).transpose()?;
    let metadata = AnalysisFrame::from_metadata(&Metadata::from_tsv(metadata_path)?)?;
    log::info!(
        "Loaded {} features x {} samples, {} metadata samples",
        counts.n_features(),
        counts.n_samples(),
        metadata.n_rows()
    );

    let inputs = SweepInputs {
        metadata,
        samples: SampleData {
            counts,
            taxonomy,
            tree,
        },
    };
    let writer = ResultWriter::new(
        &config.checkpoint_dir,
        &config.output_dir,
        &config.label,
        &config.cohort,
        date,
    );

    let table = run_sweep(config, &inputs, Some(&writer))?;
    writer.finalize(&table)?;
    Ok(())
}

/// Generate an example configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let yaml = SweepConfig::example().to_yaml()?;
    std::fs::write(output_path, &yaml)?;
    log::info!("Wrote example configuration to {:?}", output_path);
    println!("{}", yaml);
    Ok(())
}

/// Write a genus-level abundance profile
fn cmd_profile(counts_path: &Path, taxonomy_path: &Path, output_path: &Path, json: bool) -> Result<()> {
    let counts = CountMatrix::from_tsv(counts_path)?;
    let taxonomy = TaxonomyMap::from_tsv(taxonomy_path)?;
    let genus = collapse(&counts, &taxonomy, TaxonomicLevel::Genus)?;

    let profile = profile_abundance(&genus, PRESENCE_THRESHOLD);
    profile.to_tsv(output_path)?;
    if json {
        println!("{}", profile.to_json()?);
    } else {
        eprint!("{}", profile);
    }
    log::info!("Wrote profile to {:?}", output_path);
    Ok(())
}
