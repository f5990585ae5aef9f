//! Processes and the environment that drives them.

use crate::error::EnvError;
use crate::scheduler::Scheduler;
use crate::types::{ProcessId, Wake};
use std::time::Duration;
use tracing::{debug, trace};

/// A suspended computation driven by the [`Environment`].
///
/// `resume` runs the process from its current state up to its next
/// suspension point. Before returning, the process must have arranged to
/// be woken again (a timer, a get, a blocked put), or it will never run
/// again.
pub trait Process<W, E> {
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_, W>) -> Result<(), E>;
}

/// What a process sees while it runs: its own id, the scheduler, and the world.
pub struct Context<'a, W> {
    pid: ProcessId,

    /// Virtual clock and event queue
    pub scheduler: &'a mut Scheduler,

    /// Shared model state (queues, registries, logs)
    pub world: &'a mut W,
}

impl<'a, W> Context<'a, W> {
    pub fn new(pid: ProcessId, scheduler: &'a mut Scheduler, world: &'a mut W) -> Self {
        Self {
            pid,
            scheduler,
            world,
        }
    }

    /// Id of the running process.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Suspends the running process for `delay`; it resumes with [`Wake::Timeout`].
    pub fn sleep(&mut self, delay: Duration) {
        self.scheduler.after(self.pid, delay);
    }
}

/// The simulation container: clock, world, and every spawned process.
pub struct Environment<W, E> {
    scheduler: Scheduler,
    world: W,
    processes: Vec<Option<Box<dyn Process<W, E>>>>,
}

impl<W, E> Environment<W, E>
where
    E: From<EnvError>,
{
    /// Creates an environment around `world` with the clock at zero.
    pub fn new(world: W) -> Self {
        Self {
            scheduler: Scheduler::new(),
            world,
            processes: Vec::new(),
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Number of spawned processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Spawns a ready-made process; it starts at the current instant.
    pub fn spawn(&mut self, process: Box<dyn Process<W, E>>) -> ProcessId {
        let pid = ProcessId(self.processes.len());
        self.processes.push(Some(process));
        self.scheduler.wake_now(pid, Wake::Start);
        pid
    }

    /// Spawns a process built with access to its own id and the world.
    ///
    /// `build` runs before the process is registered, so it can allocate
    /// resources (a private queue, say) that the process relies on from its
    /// first resumption.
    pub fn spawn_with<P, F>(&mut self, build: F) -> Result<ProcessId, E>
    where
        P: Process<W, E> + 'static,
        F: FnOnce(&mut Context<'_, W>) -> Result<P, E>,
    {
        let pid = ProcessId(self.processes.len());
        let mut ctx = Context::new(pid, &mut self.scheduler, &mut self.world);
        let process = build(&mut ctx)?;

        self.processes.push(Some(Box::new(process)));
        self.scheduler.wake_now(pid, Wake::Start);
        Ok(pid)
    }

    /// Processes the next event strictly before `until`.
    ///
    /// Returns `Ok(false)` when no such event remains.
    pub fn step(&mut self, until: Duration) -> Result<bool, E> {
        let Some((pid, wake)) = self.scheduler.pop_before(until) else {
            return Ok(false);
        };

        let slot = self
            .processes
            .get_mut(pid.0)
            .ok_or(EnvError::UnknownProcess(pid))?;
        let mut process = slot.take().ok_or(EnvError::Reentrant(pid))?;

        trace!(%pid, ?wake, now = ?self.scheduler.now(), "resuming process");
        let mut ctx = Context::new(pid, &mut self.scheduler, &mut self.world);
        let result = process.resume(wake, &mut ctx);
        self.processes[pid.0] = Some(process);

        result.map(|()| true)
    }

    /// Runs every event before `until`, then sets the clock to `until`.
    pub fn run(&mut self, until: Duration) -> Result<(), E> {
        debug!(?until, processes = self.processes.len(), "running environment");
        while self.step(until)? {}
        self.scheduler.advance_to(until);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PriorityStore;
    use crate::types::RequestId;

    #[derive(Default)]
    struct Shop {
        shelf: PriorityStore<u32>,
        sold: Vec<(Duration, u32)>,
    }

    /// Restocks one item per second.
    struct Supplier {
        next: u32,
    }

    impl Process<Shop, EnvError> for Supplier {
        fn resume(&mut self, _wake: Wake, ctx: &mut Context<'_, Shop>) -> Result<(), EnvError> {
            let pid = ctx.pid();
            ctx.world.shelf.put(self.next, pid, ctx.scheduler);
            self.next += 1;
            ctx.sleep(Duration::from_secs(1));
            Ok(())
        }
    }

    /// Buys an item, then spends two seconds with it.
    struct Buyer {
        pending: Option<RequestId>,
    }

    impl Process<Shop, EnvError> for Buyer {
        fn resume(&mut self, wake: Wake, ctx: &mut Context<'_, Shop>) -> Result<(), EnvError> {
            if let (Wake::Resolved(req), Some(pending)) = (wake, self.pending) {
                if req == pending {
                    let item = ctx.world.shelf.take(req).unwrap_or_default();
                    let now = ctx.now();
                    ctx.world.sold.push((now, item));
                    self.pending = None;
                    ctx.sleep(Duration::from_secs(2));
                    return Ok(());
                }
            }

            let pid = ctx.pid();
            self.pending = Some(ctx.world.shelf.get(pid, ctx.scheduler));
            Ok(())
        }
    }

    #[test]
    fn test_processes_interleave_on_virtual_clock() {
        let mut env: Environment<Shop, EnvError> = Environment::new(Shop::default());
        env.spawn(Box::new(Buyer { pending: None }));
        env.spawn(Box::new(Supplier { next: 0 }));

        env.run(Duration::from_secs(5)).unwrap();

        let sold = &env.world().sold;
        assert_eq!(
            sold,
            &vec![
                (Duration::from_secs(0), 0),
                (Duration::from_secs(2), 1),
                (Duration::from_secs(4), 2),
            ]
        );
        assert_eq!(env.now(), Duration::from_secs(5));
    }

    #[test]
    fn test_spawn_with_sees_own_pid() {
        let mut env: Environment<Shop, EnvError> = Environment::new(Shop::default());
        env.spawn(Box::new(Supplier { next: 0 }));

        let pid = env
            .spawn_with(|ctx| {
                assert_eq!(ctx.pid(), ProcessId(1));
                Ok(Supplier { next: 100 })
            })
            .unwrap();
        assert_eq!(pid, ProcessId(1));
        assert_eq!(env.process_count(), 2);
    }

    #[test]
    fn test_run_with_no_processes_advances_clock() {
        let mut env: Environment<Shop, EnvError> = Environment::new(Shop::default());
        env.run(Duration::from_secs(3)).unwrap();
        assert_eq!(env.now(), Duration::from_secs(3));
    }
}
