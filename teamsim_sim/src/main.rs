//! teamsim CLI
//!
//! Run the development-team model and its scripted scenarios.

use clap::Parser;
use teamsim_sim::scenarios::ScenarioId;
use teamsim_sim::{HarnessError, ScenarioResult, ScenarioRunner, SimExport, SimParams};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// teamsim development-team simulator
#[derive(Parser, Debug)]
#[command(name = "teamsim")]
#[command(about = "Simulate coders pulling work from shared and private queues", long_about = None)]
struct Args {
    /// Master seed for determinism (overrides the parameter file)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of coders
    #[arg(short, long)]
    coders: Option<usize>,

    /// Simulated duration
    #[arg(short, long)]
    duration: Option<f64>,

    /// JSON parameter file; missing keys keep their defaults
    #[arg(short, long)]
    params: Option<String>,

    /// Parameter override as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Scenario to run (default, decomposition, interrupt, all)
    #[arg(short = 'S', long, default_value = "default")]
    scenario: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Export the full run to a JSON file
    #[arg(long)]
    export: Option<String>,
}

/// Defaults, then the parameter file, then `--set`, then dedicated flags.
fn load_params(args: &Args) -> Result<SimParams, HarnessError> {
    let mut params = match &args.params {
        Some(path) => SimParams::from_file(path)?,
        None => SimParams::default(),
    };
    params.apply_overrides(args.overrides.iter().map(String::as_str))?;

    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(coders) = args.coders {
        params.n_coder = coders;
    }
    if let Some(duration) = args.duration {
        params.t_sim = duration;
    }
    Ok(params)
}

/// Runs one scenario and writes the export file.
fn run_with_export(
    runner: &ScenarioRunner,
    scenario: ScenarioId,
    path: &str,
) -> Result<ScenarioResult, HarnessError> {
    let (result, sim) = runner.execute(scenario)?;

    let mut export = SimExport::new(scenario.name(), result.seed);
    if !scenario.is_scripted() {
        export = export.with_params(runner.params().clone());
    }
    export.capture(sim.world(), sim.now());
    export.finalize(result.passed);
    export.write_to_file(path)?;

    info!(
        "Exported {} items and {} log records to {}",
        export.items.len(),
        export.actors.len() + export.queues.len(),
        path
    );
    Ok(result)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let params = match load_params(&args) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: default, decomposition, interrupt, all");
            std::process::exit(2);
        })]
    };

    if !args.json {
        info!("teamsim v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "seed={} coders={} t_sim={}",
            params.seed, params.n_coder, params.t_sim
        );
    }

    let runner = ScenarioRunner::new(params);
    let mut results: Vec<ScenarioResult> = Vec::new();

    if let Some(path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(2);
        }
        match run_with_export(&runner, scenarios[0], path) {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("✗ {} aborted: {}", scenarios[0].name(), e);
                std::process::exit(1);
            }
        }
    } else {
        results.extend(scenarios.iter().map(|scenario| runner.run(*scenario)));
    }

    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "events": r.events,
                    "time_secs": r.final_time_secs,
                    "jobs_created": r.metrics.jobs_created,
                    "jobs_completed": r.metrics.jobs_completed,
                    "fragments": r.metrics.fragments,
                    "interrupts": r.metrics.interrupts,
                    "max_code_queue": r.metrics.max_code_queue,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        for r in &results {
            if r.passed {
                info!(
                    "✓ {} (seed={}) PASSED | jobs {}/{} | interrupts {} | max code queue {}",
                    r.scenario.name(),
                    r.seed,
                    r.metrics.jobs_completed,
                    r.metrics.jobs_created,
                    r.metrics.interrupts,
                    r.metrics.max_code_queue
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    r.scenario.name(),
                    r.seed,
                    r.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
