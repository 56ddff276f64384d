//! `metalfill` CLI: reads a chip/conductor database, runs the per-layer
//! fill engine over every layer, and writes the placed fillers.

use anyhow::{Context, Result};
use clap::Parser;
use core_config::EngineConfig;
use core_driver::StdoutDiagnostics;
use core_process::Filler;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "metalfill", version, about = "Dummy metal fill insertion for IC layouts")]
struct Args {
    /// Input database file (chip boundary, layers, conductors)
    input: PathBuf,

    /// Output file for placed fillers
    output: PathBuf,

    /// Optional engine config (defaults applied if omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config's tiles-per-window (`K`)
    #[arg(long)]
    tiles_per_window: Option<u32>,

    /// Increases log verbosity; repeat for more (`-v`, `-vv`, `-vvv`)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut diagnostics = StdoutDiagnostics;
    let mut timer = Timer::new();
    timer.start("runtime");
    let result = run(&args, &mut diagnostics, &mut timer);
    timer.stop("runtime", &mut diagnostics);
    result
}

fn run(args: &Args, diagnostics: &mut StdoutDiagnostics, timer: &mut Timer) -> Result<()> {
    let config = EngineConfig::load(args.config.as_deref()).context("loading engine config")?;

    timer.start("parse input");
    let mut database = core_io::read_database(&args.input)
        .with_context(|| format!("parsing input file {}", args.input.display()))?;
    timer.stop("parse input", diagnostics);

    let tiles_per_window = args.tiles_per_window.unwrap_or(config.grid.tiles_per_window) as usize;
    let chip_boundary = database.chip_boundary;
    let window_size = database.window_size;

    timer.start("processing");
    let mut fillers_by_layer: BTreeMap<i64, Vec<Filler>> = BTreeMap::new();
    for layer in &mut database.layers {
        let fillers = core_driver::solve_layer(
            chip_boundary,
            window_size,
            tiles_per_window,
            layer,
            config.fill.enable_chip_global_fallback,
            diagnostics,
        );
        fillers_by_layer.insert(layer.id, fillers);
    }
    timer.stop("processing", diagnostics);

    timer.start("write output");
    core_io::write_fillers(&args.output, &fillers_by_layer)
        .with_context(|| format!("writing output file {}", args.output.display()))?;
    timer.stop("write output", diagnostics);

    Ok(())
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Named wall-clock spans reported through [`Diagnostics`], never
/// consulted to gate computation (per `spec.md` §5).
struct Timer {
    starts: std::collections::HashMap<&'static str, Instant>,
}

impl Timer {
    fn new() -> Self {
        Self {
            starts: std::collections::HashMap::new(),
        }
    }

    fn start(&mut self, label: &'static str) {
        self.starts.insert(label, Instant::now());
    }

    fn stop(&mut self, label: &'static str, diagnostics: &mut dyn core_driver::Diagnostics) {
        if let Some(start) = self.starts.remove(label) {
            diagnostics.timing(label, elapsed_or_zero(start));
        }
    }
}

fn elapsed_or_zero(start: Instant) -> Duration {
    Instant::now().saturating_duration_since(start)
}
