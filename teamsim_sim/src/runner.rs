//! Scenario runner - builds, runs and checks one simulation.

use crate::error::HarnessError;
use crate::params::SimParams;
use crate::scenarios::ScenarioId;

use std::time::Duration;
use teamsim_core::{build, Simulation, WorkItem, WorkKind, World, CODE_QUEUE};
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all checks
    pub passed: bool,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Events processed by the kernel
    pub events: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected from the finished world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioMetrics {
    pub jobs_created: usize,
    pub jobs_completed: usize,
    pub fragments: usize,
    pub interrupts: usize,
    pub interrupts_handled: usize,

    /// Longest shared queue seen by any put, get or sample
    pub max_code_queue: usize,
}

impl ScenarioMetrics {
    pub fn collect(world: &World) -> Self {
        let mut metrics = ScenarioMetrics::default();

        for (_, item) in world.ledger.items() {
            match item.kind {
                WorkKind::Job { .. } => {
                    metrics.jobs_created += 1;
                    if item.is_complete() {
                        metrics.jobs_completed += 1;
                    }
                }
                WorkKind::Fragment { .. } => metrics.fragments += 1,
                WorkKind::Interrupt => {
                    metrics.interrupts += 1;
                    if item.is_complete() {
                        metrics.interrupts_handled += 1;
                    }
                }
            }
        }

        metrics.max_code_queue = world
            .log
            .queue_records()
            .iter()
            .filter(|r| r.name == CODE_QUEUE)
            .map(|r| r.value)
            .max()
            .unwrap_or(0);
        metrics
    }
}

/// Runs team scenarios.
pub struct ScenarioRunner {
    params: SimParams,
}

impl ScenarioRunner {
    /// Creates a runner using `params` for seed, duration and model settings.
    pub fn new(params: SimParams) -> Self {
        Self { params }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Runs a scenario, folding errors into a failed result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        match self.execute(scenario) {
            Ok((result, _)) => result,
            Err(err) => {
                warn!(scenario = scenario.name(), %err, "scenario aborted");
                ScenarioResult {
                    scenario,
                    seed: self.params.seed,
                    passed: false,
                    final_time_secs: 0.0,
                    events: 0,
                    failure_reason: Some(err.to_string()),
                    metrics: ScenarioMetrics::default(),
                }
            }
        }
    }

    /// Runs a scenario and hands back the finished simulation as well.
    pub fn execute(&self, scenario: ScenarioId) -> Result<(ScenarioResult, Simulation), HarnessError> {
        let seed = self.params.seed;
        let config = scenario.model(&self.params)?;
        let until = self.params.duration()?;

        info!(scenario = scenario.name(), seed, until = ?until, "running scenario");
        let mut sim = build(config, seed)?;
        sim.run(until)?;

        let world = sim.world();
        let metrics = ScenarioMetrics::collect(world);
        debug!(?metrics, "scenario finished");

        let failure = check_world(world)
            .err()
            .or_else(|| check_scenario(scenario, world, until).err());

        let result = ScenarioResult {
            scenario,
            seed,
            passed: failure.is_none(),
            final_time_secs: sim.now().as_secs_f64(),
            events: sim.scheduler().events_processed(),
            failure_reason: failure,
            metrics,
        };
        Ok((result, sim))
    }
}

/// Checks that hold for every run.
fn check_world(world: &World) -> Result<(), String> {
    for (_, item) in world.ledger.items() {
        let label = format!("{} {}", item.category(), item.id);

        if let (Some(start), Some(end)) = (item.t_start, item.t_end) {
            if end < start {
                return Err(format!("{label} ended before it started"));
            }
        }
        if item.t_start.is_some_and(|start| start < item.t_create) {
            return Err(format!("{label} started before it was created"));
        }
        if let WorkKind::Fragment { coder, .. } = item.kind {
            if item.coder_id.is_some_and(|id| id != coder) {
                return Err(format!("{label} ran on a coder that did not split it"));
            }
        }
    }

    for holder in world.ledger.placeholders() {
        let parent = world
            .ledger
            .get(holder.parent)
            .map_err(|e| e.to_string())?;
        if holder.is_complete() != parent.is_complete() {
            return Err(format!(
                "placeholder {} and its job disagree on completion",
                holder.id
            ));
        }
    }
    Ok(())
}

fn items_of(world: &World, pred: impl Fn(&WorkKind) -> bool) -> Vec<&WorkItem> {
    world
        .ledger
        .items()
        .map(|(_, item)| item)
        .filter(|item| pred(&item.kind))
        .collect()
}

/// Expected traces of the scripted scenarios.
fn check_scenario(scenario: ScenarioId, world: &World, until: Duration) -> Result<(), String> {
    let secs = Duration::from_secs;

    match scenario {
        ScenarioId::Default => Ok(()),

        ScenarioId::Decomposition => {
            if until <= secs(7) {
                return Ok(());
            }
            let fragments = items_of(world, |k| matches!(k, WorkKind::Fragment { .. }));
            let durations: Vec<Duration> = fragments.iter().map(|f| f.duration).collect();
            if durations != [secs(1), secs(2), secs(2), secs(2)] {
                return Err(format!("unexpected fragment sizes {durations:?}"));
            }
            let job = items_of(world, |k| matches!(k, WorkKind::Job { .. }));
            match job.first().and_then(|j| j.t_end) {
                Some(end) if end == secs(7) => Ok(()),
                other => Err(format!("job finished at {other:?}, expected 7s")),
            }
        }

        ScenarioId::Interrupt => {
            if until <= secs(6) {
                return Ok(());
            }
            let job = items_of(world, |k| matches!(k, WorkKind::Job { .. }));
            let span = job.first().map(|j| (j.t_start, j.t_end));
            if span != Some((Some(secs(0)), Some(secs(3)))) {
                return Err(format!("job ran over {span:?}, expected 0s..3s"));
            }
            let interrupts = items_of(world, |k| *k == WorkKind::Interrupt);
            match interrupts.first() {
                Some(first) if first.t_create == secs(5) && first.t_start == Some(secs(5)) => Ok(()),
                Some(first) => Err(format!(
                    "first interrupt created {:?}, started {:?}; expected 5s",
                    first.t_create, first.t_start
                )),
                None => Err("no interrupt arrived".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn runner(t_sim: f64) -> ScenarioRunner {
        ScenarioRunner::new(SimParams {
            t_sim,
            ..SimParams::default()
        })
    }

    #[test]
    fn test_scripted_scenarios_pass() {
        for scenario in [ScenarioId::Decomposition, ScenarioId::Interrupt] {
            let result = runner(20.0).run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_decomposition_metrics() {
        let result = runner(20.0).run(ScenarioId::Decomposition);
        assert_eq!(result.metrics.jobs_created, 1);
        assert_eq!(result.metrics.jobs_completed, 1);
        assert_eq!(result.metrics.fragments, 4);
        assert_eq!(result.metrics.interrupts, 0);
        assert_relative_eq!(result.final_time_secs, 20.0);
    }

    #[test]
    fn test_default_scenario_runs() {
        let result = runner(50.0).with_seed(3).run(ScenarioId::Default);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.jobs_created > 0);
        assert!(result.events > 0);
    }

    #[test]
    fn test_bad_params_fail_the_run() {
        let runner = ScenarioRunner::new(SimParams {
            n_coder: 0,
            ..SimParams::default()
        });
        let result = runner.run(ScenarioId::Default);
        assert!(!result.passed);
        assert!(result.failure_reason.is_some());
    }
}
