//! Interrupter - drops urgent work on a random Coder's private queue.

use crate::actor::Actor;
use crate::config::Interarrival;
use crate::error::SimError;
use crate::registry::Category;
use crate::world::SimContext;

use rand::seq::SliceRandom;
use teamsim_env::{PutStatus, RequestId, Wake};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterrupterState {
    Idle,
    Sleeping,
    Blocked(RequestId),
}

pub struct Interrupter {
    id: u64,
    arrivals: Interarrival,
    state: InterrupterState,
    sent: u64,
}

impl Interrupter {
    pub fn new(id: u64, arrivals: Interarrival) -> Self {
        Self {
            id,
            arrivals,
            state: InterrupterState::Idle,
            sent: 0,
        }
    }

    /// Number of interrupts delivered so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn sleep(&mut self, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let gap = self.arrivals.sample(&mut ctx.world.rng)?;
        ctx.sleep(gap);
        self.state = InterrupterState::Sleeping;
        Ok(())
    }

    fn interrupt(&mut self, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let now = ctx.now();
        let pid = ctx.pid();

        let target = *ctx
            .world
            .coders
            .choose(&mut ctx.world.rng)
            .ok_or_else(|| SimError::invariant("interrupter found no coders"))?;

        let item = ctx.world.new_interrupt(now);
        debug!(interrupter = self.id, coder = target.id, item = item.0, "interrupt");

        match ctx.world.put(target.queue, item, pid, ctx.scheduler)? {
            PutStatus::Stored => {
                self.sent += 1;
                self.sleep(ctx)
            }
            PutStatus::Blocked(request) => {
                self.state = InterrupterState::Blocked(request);
                Ok(())
            }
        }
    }
}

impl Actor for Interrupter {
    const CATEGORY: Category = Category::Interrupter;

    fn id(&self) -> u64 {
        self.id
    }

    fn resume(&mut self, wake: Wake, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        match (self.state, wake) {
            (InterrupterState::Idle, Wake::Start) => self.sleep(ctx),
            (InterrupterState::Sleeping, Wake::Timeout) => self.interrupt(ctx),
            (InterrupterState::Blocked(pending), Wake::Admitted(request)) if pending == request => {
                self.sent += 1;
                self.sleep(ctx)
            }
            (state, wake) => {
                trace!(interrupter = self.id, ?state, ?wake, "stale wake ignored");
                Ok(())
            }
        }
    }
}
