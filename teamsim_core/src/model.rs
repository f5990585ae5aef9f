//! Assembles a ready-to-run simulation from a [`ModelConfig`].

use crate::actor::{spawn, Simulation};
use crate::coder::Coder;
use crate::config::ModelConfig;
use crate::error::SimError;
use crate::interrupter::Interrupter;
use crate::monitor::QueueMonitor;
use crate::source::JobSource;
use crate::world::World;
use tracing::info;

/// Validates `config` and spawns every actor.
///
/// Spawn order fixes the order of same-instant events: Coders first, then
/// the job source, the Interrupter (if configured), and the monitor last.
pub fn build(config: ModelConfig, seed: u64) -> Result<Simulation, SimError> {
    config.validate()?;

    let n_coder = config.n_coder;
    let interrupts = config.interrupts;
    let arrivals = config.arrivals.clone();

    let mut sim = Simulation::new(World::new(config, seed));

    for _ in 0..n_coder {
        spawn(&mut sim, Coder::new)?;
    }
    spawn(&mut sim, |id| JobSource::new(id, arrivals))?;
    if let Some(gap) = interrupts {
        spawn(&mut sim, |id| Interrupter::new(id, gap))?;
    }
    spawn(&mut sim, QueueMonitor::new)?;

    info!(
        seed,
        coders = n_coder,
        interrupter = interrupts.is_some(),
        processes = sim.process_count(),
        "simulation built"
    );
    Ok(sim)
}
