// ========================================================================================
//
//                          THE COMMAND-LINE FRONT END: MCCBOOT
//
// ========================================================================================
//
// Parses arguments, resolves the estimator configuration, loads the stacked event
// table, drives the estimation and writes the output tables. All statistics live in
// the library; this file only wires inputs to outputs.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mccboot::config::{ConfigOverrides, EstimatorConfig};
use mccboot::data::load_event_table;
use mccboot::output::{TableOptions, save_estimates, save_replicates};
use mccboot::pipeline::{partition_by_resample, run_estimation};
use mccboot::progress::ResampleProgress;
use mccboot::totals::total_arm_weights;
use mccboot::types::POINT_ESTIMATE_RESAMPLE;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "mccboot",
    version,
    about = "Weighted mean cumulative count with competing risks and bootstrap confidence intervals"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate MCC curves, arm contrasts and bootstrap intervals
    #[command(about = "Run the estimator (outputs: mcc_estimates.tsv)")]
    Estimate(EstimateArgs),
    /// Load and validate an event table without estimating
    Check(CheckArgs),
}

#[derive(Args)]
struct EstimateArgs {
    /// Path to the resample-stacked event table (TSV, or CSV with a .csv extension)
    input: PathBuf,

    /// TOML file holding resample_count and end_of_followup
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of bootstrap replicates B (overrides the config file)
    #[arg(long, value_name = "B")]
    resamples: Option<u32>,

    /// Upper bound of the integer time grid (overrides the config file)
    #[arg(long, value_name = "T")]
    end_of_followup: Option<u32>,

    /// Destination of the estimate table
    #[arg(long, default_value = "mcc_estimates.tsv")]
    output: PathBuf,

    /// Append bootstrap standard error columns to the estimate table
    #[arg(long)]
    standard_errors: bool,

    /// Also write every resample's grid curves to this path
    #[arg(long)]
    replicates_output: Option<PathBuf>,

    /// Number of worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to the resample-stacked event table
    input: PathBuf,

    /// Require resamples 0..=B to be present
    #[arg(long, value_name = "B")]
    resamples: Option<u32>,
}

/// Progress bar over resample pipelines, drawn only when stderr is a terminal.
struct ResampleProgressBar {
    bar: ProgressBar,
}

impl ResampleProgressBar {
    fn new() -> Self {
        let draw_target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr_with_hz(20)
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(None, draw_target);
        bar.set_style(
            ProgressStyle::with_template(
                "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} resamples ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        Self { bar }
    }
}

impl ResampleProgress for ResampleProgressBar {
    fn on_start(&self, total_resamples: usize) {
        self.bar.set_length(total_resamples as u64);
    }

    fn on_resample_finished(&self, resample: u32) {
        self.bar.set_message(format!("resample {resample}"));
        self.bar.inc(1);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn path_str(path: &Path) -> Result<&str, Box<dyn std::error::Error>> {
    path.to_str()
        .ok_or_else(|| format!("path '{}' is not valid UTF-8", path.display()).into())
}

fn estimate(args: EstimateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    let base = match &args.config {
        Some(path) => Some(EstimatorConfig::load(path_str(path)?)?),
        None => None,
    };
    let config = ConfigOverrides {
        resample_count: args.resamples,
        end_of_followup: args.end_of_followup,
    }
    .resolve(base)?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    log::info!(
        "Using B = {} bootstrap replicates and end of follow-up {}",
        config.resample_count,
        config.end_of_followup
    );
    let records = load_event_table(path_str(&args.input)?)?;

    let progress = ResampleProgressBar::new();
    let report = run_estimation(records, &config, &progress)?;
    if report.spread.degenerate {
        log::warn!("Confidence intervals have zero width: a single replicate carries no spread");
    }

    let options = TableOptions {
        include_standard_errors: args.standard_errors,
    };
    save_estimates(&args.output, &report.estimates, options)?;
    log::info!("Estimates saved to: {}", args.output.display());

    if let Some(path) = &args.replicates_output {
        save_replicates(
            path,
            std::iter::once(&report.point_estimate).chain(report.replicates.iter()),
        )?;
        log::info!("Replicate curves saved to: {}", path.display());
    }

    log::info!("Total execution time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn check(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_event_table(path_str(&args.input)?)?;
    let highest = records.iter().map(|r| r.resample).max().unwrap_or(0);
    let resample_count = args.resamples.unwrap_or(highest);

    let partitions = partition_by_resample(records, resample_count)?;
    for (resample, partition) in partitions.iter().enumerate() {
        let mut subjects: Vec<&str> = partition.iter().map(|r| r.subject_id.as_str()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        println!(
            "resample {resample}: {} records, {} distinct subjects",
            partition.len(),
            subjects.len()
        );
    }

    let point = POINT_ESTIMATE_RESAMPLE as usize;
    let totals = total_arm_weights(POINT_ESTIMATE_RESAMPLE, &partitions[point])?;
    println!(
        "original cohort: arm 0 weight {:.4} ({} subjects), arm 1 weight {:.4} ({} subjects)",
        totals.weight.reference,
        totals.subjects.reference,
        totals.weight.treated,
        totals.subjects.treated
    );
    println!("Input table is valid for B = {resample_count}.");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Estimate(args)) => estimate(args),
        Some(Commands::Check(args)) => check(args),
        None => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
