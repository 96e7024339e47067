use anyhow::{bail, ensure, Result};
use clap::Parser;
use flow_util_rust::{
    anisotropy_samples, get_sweep_dirs, AnalysisResult, Normalization, PairSchedule, SampleStats,
    SeriesConfig, SnapshotNaming, Sweep, SweepDir,
};
use log::{info, warn};
use plotters::prelude::*;
use rayon::{prelude::*, ThreadPoolBuilder};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory with one run directory per parameter value
    base_dir: PathBuf,

    /// Swept parameter as it appears in the run directory names
    #[arg(short, long, default_value = "delta")]
    key: String,

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

    /// Number of threads to run in parallel
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Where to save the mean anisotropy plot (png)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn do_sweep_dir(dir: &SweepDir, config: &SeriesConfig) -> (f64, AnalysisResult<SampleStats>) {
    info!("Processing {}", dir.path.display());
    let values = anisotropy_samples(&dir.path, config)
        .into_iter()
        .map(|sample| sample.anisotropy)
        .collect::<Vec<_>>();
    (dir.param, SampleStats::from_samples(dir.param, &values))
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad, hi + pad)
}

fn plot_sweep(path: &Path, key: &str, series: &[(f64, f64)], dt: usize) -> Result<()> {
    let (x_lo, x_hi) = padded_range(series.iter().map(|p| p.0));
    let drawing_area = BitMapBackend::new(path, (600, 400)).into_drawing_area();
    drawing_area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&drawing_area)
        .caption(format!("Anisotropy vs {key}, Δt = {dt}"), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x_lo..x_hi, 0.0..1.0)?;
    chart
        .configure_mesh()
        .x_desc(key)
        .y_desc("mean A")
        .axis_style(BLACK)
        .label_style(("sans-serif", 14).into_font().color(&BLACK))
        .draw()?;
    chart.draw_series(
        series
            .iter()
            .map(|&(x, y)| Cross::new((x, y), 5, BLUE.stroke_width(2))),
    )?;
    drawing_area.present()?;
    info!("Saved {}", path.display());
    Ok(())
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

    let dirs = get_sweep_dirs(&cli.base_dir, &cli.key)?;
    if dirs.is_empty() {
        bail!(
            "No {} run directories in {}",
            cli.key,
            cli.base_dir.display()
        );
    }

    let tp = ThreadPoolBuilder::new().num_threads(cli.threads).build()?;
    let results = tp.install(|| {
        dirs.par_iter()
            .map(|dir| do_sweep_dir(dir, &config))
            .collect::<Vec<_>>()
    });
    let sweep = results.into_iter().collect::<Sweep<_>>();

    for (param, stats) in sweep.points() {
        println!(
            "{}={param} → ⟨A⟩ = {:.6} (pairs: {}, std: {:.6})",
            cli.key, stats.mean, stats.count, stats.std
        );
    }
    for param in sweep.undefined() {
        println!("No valid pairs for {} = {param}", cli.key);
    }

    if let Some(output) = cli.output {
        let series = sweep.series(|stats| stats.mean);
        if series.is_empty() {
            warn!("Nothing to plot");
        } else {
            plot_sweep(&output, &cli.key, &series, cli.step)?;
        }
    }
    Ok(())
}
