use anyhow::{ensure, Context, Result};
use clap::Parser;
use flow_util_rust::{
    anisotropy_samples, IteratorAvg, Normalization, PairSchedule, SeriesConfig, SnapshotNaming,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Run directory with the snapshot files
    run_dir: PathBuf,

    /// Index of the first snapshot
    #[arg(short, long, default_value_t = 1000)]
    start: usize,

    /// Index distance between the two snapshots of a pair
    #[arg(long, default_value_t = 120)]
    step: usize,

    /// Pairs start below this index
    #[arg(short, long, default_value_t = 9999)]
    end: usize,

    /// Snapshot file name prefix
    #[arg(short, long, default_value = "data_")]
    prefix: String,

    /// Divisor of the covariance matrix
    #[arg(short, long, value_enum, default_value_t = Normalization::Declared)]
    normalization: Normalization,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    ensure!(cli.step > 0, "step has to be positive");

    let config = SeriesConfig {
        naming: SnapshotNaming {
            prefix: cli.prefix,
            ..SnapshotNaming::default()
        },
        schedule: PairSchedule {
            start: cli.start,
            step: cli.step,
            end: cli.end,
        },
        normalization: cli.normalization,
        ..SeriesConfig::default()
    };
    info!("{}: pairs {:?}", cli.run_dir.display(), config.schedule);

    let samples = anisotropy_samples(&cli.run_dir, &config);
    for sample in &samples {
        println!(
            "{} → {}: A = {:.6}",
            sample.first.display(),
            sample.second.display(),
            sample.anisotropy
        );
    }

    let (mean, std) = samples
        .iter()
        .map(|sample| sample.anisotropy)
        .avg_with_std()
        .with_context(|| format!("No valid pairs in {}", cli.run_dir.display()))?;
    println!("\n=== Summary over all pairs ===");
    println!("Number of pairs analyzed: {}", samples.len());
    println!("Average A = {mean:.6}");
    println!("Standard deviation = {std:.6}");
    Ok(())
}
