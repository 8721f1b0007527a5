//! canopy3d CLI - light interception in 3D plant canopies

use std::path::{Path, PathBuf};

use anyhow::Result;
use canopy3d::CanopySimulation;
use canopy3d::io::{read_canopy, write_flux_report};
use canopy3d::sim::lighting::RunConfig;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canopy3d")]
#[command(about = "Ray-traced light interception in 3D plant canopies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace every configured hour and write the flux report
    Run {
        /// Canopy table, one facet per row
        #[arg(short, long)]
        canopy: PathBuf,
        /// JSON run configuration (tracer, climate, canopy format)
        #[arg(long)]
        config: PathBuf,
        /// Output report (tab-separated)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Load the canopy and print the grid layout without tracing
    GridInfo {
        #[arg(short, long)]
        canopy: PathBuf,
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            canopy,
            config,
            output,
        } => run(&canopy, &config, &output)?,
        Commands::GridInfo { canopy, config } => grid_info(&canopy, &config)?,
    }

    Ok(())
}

fn run(canopy: &Path, config: &Path, output: &Path) -> Result<()> {
    let config = RunConfig::from_json_file(config)?;
    let facets = read_canopy(canopy, &config.format)?;

    let mut simulation = CanopySimulation::new(facets, config.tracer.clone())?;
    let summary = simulation.run(&config.climate);
    let facets = simulation.into_facets();

    let hours: Vec<f64> = config.climate.hours.iter().map(|h| h.hour).collect();
    write_flux_report(output, &facets, &hours, config.format.layout)?;

    println!(
        "Traced {} rays over {} hour(s), absorbed flux {:.4}",
        summary.rays_traced(),
        summary.hours.len(),
        summary.absorbed_total()
    );
    println!("Report written to {}", output.display());
    Ok(())
}

fn grid_info(canopy: &Path, config: &Path) -> Result<()> {
    let config = RunConfig::from_json_file(config)?;
    let facets = read_canopy(canopy, &config.format)?;
    let simulation = CanopySimulation::new(facets, config.tracer)?;

    let grid = simulation.grid();
    let [nx, ny, nz] = grid.resolution();
    let stats = grid.stats();
    println!("Domain: {} .. {}", grid.bbox().min, grid.bbox().max);
    println!("Light plane height: {}", simulation.plane_height());
    println!("Cells: {nx} x {ny} x {nz}");
    println!(
        "Facets: {} registered, {} outside, {} degenerate",
        stats.registered, stats.outside, stats.degenerate
    );
    println!("Cell references: {}", stats.references);
    Ok(())
}
