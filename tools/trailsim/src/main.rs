/// Desire-path simulation driver.
///
/// `run`        reads a scenario JSON (DEM, points, edges, parameters), runs the
///              simulation and writes ground potential, path counts, per-edge
///              records and the final net cost.
/// `synthetic`  writes a scenario over fBm terrain with random points.
/// `fit`        fits the slope → cost polynomial from (degrees, cost) samples.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trail_core::{
    simulate, CostConfig, CostField, Edge, Grid, Point, SimulationConfig, SimulationOutput,
    SlopeCost,
};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "trailsim", about = "Simulate emergent desire paths on a DEM")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario file
    Run {
        /// Scenario JSON
        #[arg(short, long)]
        scenario: PathBuf,

        /// Result JSON
        #[arg(short, long, default_value = "trailsim_out.json")]
        output: PathBuf,
    },
    /// Generate a random scenario over fBm terrain
    Synthetic {
        #[arg(long, default_value = "64")]
        rows: usize,

        #[arg(long, default_value = "64")]
        cols: usize,

        /// Number of random points; edges join consecutive points in a loop
        #[arg(long, default_value = "8")]
        points: usize,

        /// Passes over the edge loop
        #[arg(long, default_value = "3")]
        rounds: usize,

        /// Peak-to-trough relief in map units
        #[arg(long, default_value = "20.0")]
        relief: f64,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(short, long, default_value = "scenario.json")]
        output: PathBuf,
    },
    /// Fit slope-cost coefficients from a JSON list of [degrees, cost] pairs
    Fit {
        #[arg(short, long)]
        samples: PathBuf,
    },
}

// ── Files ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct Scenario {
    dem: Grid<f64>,
    #[serde(default)]
    cost: CostConfig,
    /// Initial net cost; 1 everywhere when absent.
    #[serde(default)]
    netcost: Option<Grid<f64>>,
    #[serde(default)]
    simulation: SimulationConfig,
    points: Vec<Point>,
    edges: Vec<Edge>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    #[serde(flatten)]
    output: SimulationOutput,
    netcost: Grid<f64>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn run_scenario(scenario: Scenario) -> Result<RunReport> {
    let mut cost = match scenario.netcost {
        Some(nc) => CostField::with_netcost(scenario.dem, nc, &scenario.cost),
        None => CostField::new(scenario.dem, &scenario.cost),
    }
    .context("Invalid cost configuration")?;

    let output = simulate(&scenario.points, &scenario.edges, &mut cost, &scenario.simulation)
        .context("Simulation rejected its input")?;
    Ok(RunReport {
        output,
        netcost: cost.netcost().clone(),
    })
}

/// fBm elevation, rescaled so the range spans `relief`.
fn fbm_dem(rows: usize, cols: usize, relief: f64, seed: u32) -> Grid<f64> {
    const OCTAVES: u32 = 6;
    const GAIN: f64 = 0.55;
    let perlin = Perlin::new(seed);
    let base_freq = 4.0 / rows.max(cols) as f64;

    let mut dem = Grid::new(rows, cols, 0.0);
    for r in 0..rows {
        for c in 0..cols {
            let (mut value, mut amp, mut freq) = (0.0, 1.0, base_freq);
            for _ in 0..OCTAVES {
                value += amp * perlin.get([c as f64 * freq, r as f64 * freq]);
                amp *= GAIN;
                freq *= 2.0;
            }
            dem.set(r, c, value);
        }
    }

    let (lo, hi) = (dem.min_value(), dem.max_value());
    let span = (hi - lo).max(f64::EPSILON);
    dem.map(|v| (v - lo) / span * relief)
}

fn synthetic_scenario(
    rows: usize,
    cols: usize,
    n_points: usize,
    rounds: usize,
    relief: f64,
    seed: u64,
) -> Result<Scenario> {
    if rows == 0 || cols == 0 {
        bail!("grid must be at least 1x1, got {rows}x{cols}");
    }
    if n_points < 2 || n_points > rows * cols {
        bail!("need between 2 and {} points, got {n_points}", rows * cols);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let dem = fbm_dem(rows, cols, relief, rng.gen());

    let mut points: Vec<Point> = Vec::with_capacity(n_points);
    while points.len() < n_points {
        let (r, c) = (rng.gen_range(0..rows) as i64, rng.gen_range(0..cols) as i64);
        if points.iter().all(|p| (p.r, p.c) != (r, c)) {
            points.push(Point {
                id: points.len() as i64,
                r,
                c,
            });
        }
    }

    let n = n_points as i64;
    let edges = (0..rounds)
        .flat_map(|_| (0..n).map(move |k| Edge::new(k, (k + 1) % n)))
        .collect();

    Ok(Scenario {
        dem,
        cost: CostConfig {
            weight: 0.7,
            coef: [0.0, 0.0, 2.0, 0.0, 1.0],
            ..CostConfig::default()
        },
        netcost: None,
        simulation: SimulationConfig {
            g_max: 10.0,
            decay: 20.0,
            ..SimulationConfig::default()
        },
        points,
        edges,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trailsim=info,trail_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Run { scenario, output } => {
            let sc: Scenario = read_json(&scenario)?;
            info!(
                rows = sc.dem.rows,
                cols = sc.dem.cols,
                points = sc.points.len(),
                edges = sc.edges.len(),
                "loaded {}",
                scenario.display()
            );
            let report = run_scenario(sc)?;
            write_json(&output, &report)?;
            info!(
                outcome = ?report.output.outcome,
                max_potential = report.output.ground_potential.max_value(),
                "wrote {}",
                output.display()
            );
        }
        Command::Synthetic {
            rows,
            cols,
            points,
            rounds,
            relief,
            seed,
            output,
        } => {
            let sc = synthetic_scenario(rows, cols, points, rounds, relief, seed)?;
            write_json(&output, &sc)?;
            info!(edges = sc.edges.len(), "wrote {}", output.display());
        }
        Command::Fit { samples } => {
            let pairs: Vec<(f64, f64)> = read_json(&samples)?;
            let fit = SlopeCost::fit_degrees(&pairs).context("Cannot fit slope cost")?;
            println!("{}", serde_json::to_string(&fit.coef)?);
        }
    }

    Ok(())
}
