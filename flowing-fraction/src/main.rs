use anyhow::{bail, Result};
use clap::Parser;
use flow_util_rust::{
    flow_counts, get_sweep_dirs, AnalysisError, FlowCounts, Sweep, SweepDir, Tolerance,
};
use log::{error, info, warn};
use plotters::prelude::*;
use rayon::{prelude::*, ThreadPoolBuilder};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory with one sub-directory of run logs per force
    base_dir: PathBuf,

    /// Force as it appears in the sub-directory names
    #[arg(short, long, default_value = "fx_ext")]
    key: String,

    /// Relative tolerance of the final energy comparison
    #[arg(long, default_value_t = 1e-12)]
    rtol: f64,

    /// Absolute tolerance of the final energy comparison
    #[arg(long, default_value_t = 1e-15)]
    atol: f64,

    /// Number of threads to run in parallel
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Where to save the flowing fraction plot (png)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

struct FlowSummary {
    counts: FlowCounts,
    percent: f64,
}

fn do_force_dir(dir: &SweepDir, tolerance: &Tolerance) -> (f64, Result<FlowCounts>) {
    info!("Processing {}", dir.path.display());
    (dir.param, flow_counts(&dir.path, tolerance))
}

fn plot_flowing(path: &Path, key: &str, series: &[(f64, f64)]) -> Result<()> {
    let positive = series
        .iter()
        .copied()
        .filter(|&(force, _)| force > 0.0)
        .collect::<Vec<_>>();
    if positive.len() < series.len() {
        warn!("Non-positive forces left out of the log-scale plot");
    }
    let Some(lo) = positive.iter().map(|p| p.0).reduce(f64::min) else {
        warn!("Nothing to plot");
        return Ok(());
    };
    let hi = positive.iter().map(|p| p.0).fold(lo, f64::max);

    let drawing_area = BitMapBackend::new(path, (700, 500)).into_drawing_area();
    drawing_area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&drawing_area)
        .caption("Fraction of flowing simulations vs applied force", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((lo * 0.8..hi * 1.2).log_scale(), -2.0..102.0)?;
    chart
        .configure_mesh()
        .x_desc(format!("External force {key}"))
        .y_desc("Flowing simulations (%)")
        .axis_style(BLACK)
        .label_style(("sans-serif", 14).into_font().color(&BLACK))
        .draw()?;
    chart
        .draw_series(LineSeries::new(positive.iter().copied(), BLUE.stroke_width(2)))?
        .label("Flowing fraction")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    chart.draw_series(
        positive
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 5, BLUE.filled())),
    )?;
    chart
        .configure_series_labels()
        .background_style(WHITE)
        .border_style(WHITE)
        .draw()?;
    drawing_area.present()?;
    info!("Saved {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let tolerance = Tolerance {
        rtol: cli.rtol,
        atol: cli.atol,
    };

    let dirs = get_sweep_dirs(&cli.base_dir, &cli.key)?;
    if dirs.is_empty() {
        bail!(
            "No {} sub-directories in {}",
            cli.key,
            cli.base_dir.display()
        );
    }

    let tp = ThreadPoolBuilder::new().num_threads(cli.threads).build()?;
    let results = tp.install(|| {
        dirs.par_iter()
            .map(|dir| do_force_dir(dir, &tolerance))
            .collect::<Vec<_>>()
    });

    let mut sweep = Sweep::new();
    for (force, counts) in results {
        let summary = match counts {
            Ok(counts) => counts
                .percent_flowing(force)
                .map(|percent| FlowSummary { counts, percent }),
            Err(err) => {
                error!("{} = {force}: {err:#}", cli.key);
                Err(AnalysisError::UndefinedAggregate { param: force })
            }
        };
        sweep.record(force, summary);
    }

    println!("\n=== Simulation Results ===");
    for (force, summary) in sweep.points() {
        let FlowSummary { counts, percent } = summary;
        println!(
            "Force {} = {force:.6}: Flowing = {percent:.1}% ({}/{} runs, {} skipped)",
            cli.key,
            counts.flowing,
            counts.classified(),
            counts.skipped
        );
    }
    for force in sweep.undefined() {
        println!(
            "Force {} = {force:.6}: undefined, no classified runs",
            cli.key
        );
    }

    if let Some(output) = cli.output {
        plot_flowing(&output, &cli.key, &sweep.series(|summary| summary.percent))?;
    }
    Ok(())
}
