use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use colorgrad::preset::viridis;
use flow_util_rust::{DisplacementField, Snapshot};
use itertools::{izip, Itertools};
use log::info;
use nalgebra::{Point2, Rotation2, Vector2};
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

mod colorbar;
use colorbar::Colorbar;

const HEAD_LENGTH: f64 = 0.3;
const HEAD_ANGLE: f64 = PI / 7.0;
const SCATTER_COLOR: RGBColor = RGBColor(65, 105, 225);

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Displacement vectors drawn at the initial particle positions
    Quiver(QuiverCMD),

    /// Drift-free displacements as a (dx, dy) point cloud
    Scatter(ScatterCMD),
}

#[derive(Args)]
struct Frames {
    /// Earlier snapshot
    #[arg(value_name = "SNAPSHOT_INITIAL")]
    initial: PathBuf,

    /// Later snapshot
    #[arg(value_name = "SNAPSHOT_FINAL")]
    later: PathBuf,

    /// Output plot (png)
    #[arg(short, long)]
    output: PathBuf,

    /// Also print the displacements as a table
    #[arg(long)]
    table: bool,
}

impl Frames {
    fn read(&self) -> Result<(Snapshot, Snapshot)> {
        let initial = Snapshot::read(&self.initial)
            .with_context(|| format!("Reading {}", self.initial.display()))?;
        let later = Snapshot::read(&self.later)
            .with_context(|| format!("Reading {}", self.later.display()))?;
        Ok((initial, later))
    }
}

#[derive(Args)]
struct QuiverCMD {
    #[command(flatten)]
    frames: Frames,

    /// Arrows are drawn with length |d| / scale
    #[arg(short, long, default_value_t = 1.7)]
    scale: f64,
}

#[derive(Args)]
struct ScatterCMD {
    #[command(flatten)]
    frames: Frames,
}

fn print_table(field: &DisplacementField) {
    let table = izip!(field.origins(), field.displacements())
        .map(|(p, d)| {
            [p.x, p.y, d.x, d.y]
                .into_iter()
                .map(|x| format!("{x:10.4}"))
                .join("\t")
        })
        .join("\n");
    println!("# x y dx dy\n{table}");
}

/// Shaft from `origin` to the tip followed by the two head strokes.
fn arrow(origin: &Point2<f64>, d: &Vector2<f64>) -> Vec<(f64, f64)> {
    let tip = origin + d;
    let back = -d * HEAD_LENGTH;
    let left = tip + Rotation2::new(HEAD_ANGLE) * back;
    let right = tip + Rotation2::new(-HEAD_ANGLE) * back;
    [*origin, tip, left, tip, right]
        .iter()
        .map(|p| (p.x, p.y))
        .collect()
}

fn plot_quiver(path: &Path, field: &DisplacementField, lx: f64, ly: f64, scale: f64) -> Result<()> {
    let plot_width: u32 = 1200;
    let plot_color_width: u32 = 100;
    let plot_height = ((f64::from(plot_width - plot_color_width) * ly / lx) as u32).clamp(300, 1200);

    let drawing_area = BitMapBackend::new(path, (plot_width, plot_height)).into_drawing_area();
    drawing_area.fill(&WHITE)?;
    let (left, right) = drawing_area.split_horizontally(plot_width - plot_color_width);

    let magnitudes = field.displacements().iter().map(|d| d.norm()).collect::<Vec<_>>();
    let max = magnitudes.iter().copied().fold(0.0, f64::max);
    let colorbar = Colorbar::new(0.0, max, viridis());
    colorbar.draw(ChartBuilder::on(&right))?;

    let mut chart = ChartBuilder::on(&left)
        .caption("Particle displacement vectors (x periodic)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0.0..lx, 0.0..ly)?;
    chart
        .configure_mesh()
        .x_desc("X")
        .y_desc("Y")
        .axis_style(BLACK)
        .label_style(("sans-serif", 14).into_font().color(&BLACK))
        .draw()?;
    chart.draw_series(izip!(field.origins(), field.displacements(), &magnitudes).map(
        |(p, d, &m)| PathElement::new(arrow(p, &(*d / scale)), colorbar.color(m).stroke_width(1)),
    ))?;
    drawing_area.present()?;
    info!("Saved {}", path.display());
    Ok(())
}

fn plot_scatter(path: &Path, field: &DisplacementField) -> Result<()> {
    let (lo, hi) = field.bounds().context("Empty displacement field")?;
    let drawing_area = BitMapBackend::new(path, (600, 600)).into_drawing_area();
    drawing_area.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&drawing_area)
        .caption(
            "Displacements (PBC-corrected, mean-centred)",
            ("sans-serif", 18),
        )
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(lo.x - 1.0..hi.x + 1.0, lo.y - 1.0..hi.y + 1.0)?;
    chart
        .configure_mesh()
        .x_desc("dx")
        .y_desc("dy")
        .axis_style(BLACK.stroke_width(2))
        .label_style(("sans-serif", 14).into_font().color(&BLACK))
        .draw()?;
    chart.draw_series(
        field
            .displacements()
            .iter()
            .map(|d| Circle::new((d.x, d.y), 2, SCATTER_COLOR.mix(0.7).filled())),
    )?;
    drawing_area.present()?;
    info!("Saved {}", path.display());
    Ok(())
}

fn do_quiver(args: &QuiverCMD) -> Result<()> {
    ensure!(args.scale > 0.0, "scale has to be positive");
    let (initial, later) = args.frames.read()?;
    ensure!(
        initial.lx > 0.0 && initial.ly > 0.0,
        "Invalid box {} x {}",
        initial.lx,
        initial.ly
    );
    let field = DisplacementField::raw_from_snapshots(&initial, &later)?;
    if args.frames.table {
        print_table(&field);
    }
    plot_quiver(&args.frames.output, &field, initial.lx, initial.ly, args.scale)
}

fn do_scatter(args: &ScatterCMD) -> Result<()> {
    let (initial, later) = args.frames.read()?;
    let field = DisplacementField::from_snapshots(&initial, &later)?;
    if args.frames.table {
        print_table(&field);
    }
    plot_scatter(&args.frames.output, &field)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Quiver(args) => do_quiver(args)?,
        Commands::Scatter(args) => do_scatter(args)?,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{point, vector};

    #[test]
    fn test_arrow() {
        let path = arrow(&point![1.0, 2.0], &vector![2.0, 0.0]);
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], (1.0, 2.0));
        assert_eq!(path[1], (3.0, 2.0));
        assert_eq!(path[3], (3.0, 2.0));
        // head strokes point back and are mirrored about the shaft
        assert!(path[2].0 < 3.0 && path[4].0 < 3.0);
        assert!((path[2].1 - 2.0 + (path[4].1 - 2.0)).abs() < 1e-12);
        assert!((path[2].0 - path[4].0).abs() < 1e-12);
    }
}
