//! Actor contract and its binding to the kernel.

use crate::error::SimError;
use crate::registry::Category;
use crate::world::{SimContext, World};
use teamsim_env::{Context, Environment, Process, ProcessId, Wake};

/// The simulation type every actor runs in.
pub type Simulation = Environment<World, SimError>;

/// An entity whose behavior runs as a suspended computation.
///
/// Spawning an actor reserves an id in its [`Category`], runs
/// [`Actor::setup`], registers the id, and starts the behavior at the
/// current instant with [`Wake::Start`].
pub trait Actor: 'static {
    const CATEGORY: Category;

    /// Id reserved for this actor at spawn time.
    fn id(&self) -> u64;

    /// Allocates resources the behavior needs from its first step.
    fn setup(&mut self, _ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        Ok(())
    }

    /// Runs the behavior up to its next suspension point.
    fn resume(&mut self, wake: Wake, ctx: &mut SimContext<'_>) -> Result<(), SimError>;

    /// Reports `(category, id, state)` to the log collaborator.
    fn log(&self, ctx: &mut SimContext<'_>, state: &str) {
        let now = ctx.now();
        ctx.world.log_actor(now, Self::CATEGORY, self.id(), state);
    }
}

/// Adapter running an [`Actor`] as a kernel process.
struct ActorProcess<A>(A);

impl<A: Actor> Process<World, SimError> for ActorProcess<A> {
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_, World>) -> Result<(), SimError> {
        self.0.resume(wake, ctx)
    }
}

/// Spawns the actor produced by `build` from its reserved id.
pub fn spawn<A, F>(sim: &mut Simulation, build: F) -> Result<ProcessId, SimError>
where
    A: Actor,
    F: FnOnce(u64) -> A,
{
    sim.spawn_with(|ctx| {
        let id = ctx.world.registry.next(A::CATEGORY);
        let mut actor = build(id);
        actor.setup(ctx)?;
        ctx.world.registry.register(A::CATEGORY, id);
        Ok(ActorProcess(actor))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Arrivals, ModelConfig};
    use std::time::Duration;

    struct Blinker {
        id: u64,
        set_up: bool,
    }

    impl Actor for Blinker {
        const CATEGORY: Category = Category::QueueMonitor;

        fn id(&self) -> u64 {
            self.id
        }

        fn setup(&mut self, _ctx: &mut SimContext<'_>) -> Result<(), SimError> {
            self.set_up = true;
            Ok(())
        }

        fn resume(&mut self, _wake: Wake, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
            let state = if self.set_up { "on" } else { "off" };
            self.log(ctx, state);
            ctx.sleep(Duration::from_secs(1));
            Ok(())
        }
    }

    fn world() -> World {
        World::new(
            ModelConfig {
                n_coder: 1,
                fragment_size: Duration::from_secs(1),
                interrupts: None,
                interrupt_duration: Duration::from_secs(1),
                monitor_interval: Duration::from_secs(1),
                arrivals: Arrivals::Scripted(Vec::new()),
                code_queue_capacity: None,
            },
            0,
        )
    }

    #[test]
    fn test_spawn_assigns_ids_and_runs_setup() {
        let mut sim = Simulation::new(world());
        spawn(&mut sim, |id| Blinker { id, set_up: false }).unwrap();
        spawn(&mut sim, |id| Blinker { id, set_up: false }).unwrap();

        sim.run(Duration::from_millis(1500)).unwrap();

        let registry = &sim.world().registry;
        assert_eq!(registry.instances(Category::QueueMonitor), &[0, 1]);

        let log = &sim.world().log;
        assert_eq!(
            log.states_of(Category::QueueMonitor, 1),
            vec![(Duration::ZERO, "on"), (Duration::from_secs(1), "on")]
        );
    }
}
