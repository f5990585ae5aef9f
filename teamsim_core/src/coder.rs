//! Coder - the worker that arbitrates between shared and private work.
//!
//! # State Machine
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!  Idle ──► Waiting ──(race settles)──► dispatch ──┬─► decompose ─┘
//!            ▲                                    ├─► Working ──(timeout)──┐
//!            │                                    └─► (already complete) ──┤
//!            └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! While waiting, a Coder holds one get request on the shared queue and one
//! on its own queue. Its own queue wins whenever both hold an item when the
//! race settles, so decomposed fragments and interrupts are always handled
//! before fresh work. The losing request is cancelled and any item it had
//! reserved goes back to its queue.

use crate::actor::Actor;
use crate::error::SimError;
use crate::registry::Category;
use crate::work::{fragment_durations, ItemId, Ticket};
use crate::world::{CoderHandle, QueueId, SimContext};

use teamsim_env::{PutStatus, Race, RaceWinner, Wake};
use tracing::{debug, trace};

/// Where a dispatched item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claimed {
    OwnQueue(ItemId),
    SharedQueue(ItemId),
}

impl Claimed {
    pub fn item(&self) -> ItemId {
        match self {
            Claimed::OwnQueue(item) | Claimed::SharedQueue(item) => *item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoderState {
    Idle,
    Waiting(Race),
    Working(ItemId),
}

pub struct Coder {
    id: u64,
    queue: Option<QueueId>,
    state: CoderState,
}

impl Coder {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            queue: None,
            state: CoderState::Idle,
        }
    }

    fn own_queue(&self) -> Result<QueueId, SimError> {
        self.queue
            .ok_or_else(|| SimError::invariant(format!("coder {} has no private queue", self.id)))
    }

    /// Enters Waiting: one get on the shared queue, one on the own queue.
    fn wait(&mut self, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        self.log(ctx, "waiting");

        let pid = ctx.pid();
        let shared = ctx.world.code_queue();
        let own = self.own_queue()?;

        let fallback = ctx.world.get(shared, pid, ctx.scheduler)?;
        let preferred = ctx.world.get(own, pid, ctx.scheduler)?;
        self.state = CoderState::Waiting(Race::new(preferred, fallback));
        Ok(())
    }

    /// Claims the race winner; `None` if neither request has an item yet.
    fn settle(&self, race: Race, ctx: &mut SimContext<'_>) -> Result<Option<Claimed>, SimError> {
        let shared = ctx.world.code_queue();
        let own = self.own_queue()?;

        let (own_q, shared_q) = ctx.world.queues.pair_mut(own, shared)?;
        let winner = race.settle(&mut own_q.store, &mut shared_q.store, ctx.scheduler);

        let now = ctx.now();
        let claimed = match winner {
            Some(RaceWinner::Preferred(Ticket { item, .. })) => {
                ctx.world.log_get(own, now);
                Claimed::OwnQueue(item)
            }
            Some(RaceWinner::Fallback(Ticket { item, .. })) => {
                ctx.world.log_get(shared, now);
                Claimed::SharedQueue(item)
            }
            None => return Ok(None),
        };
        Ok(Some(claimed))
    }

    /// Handles a dispatched item, then arranges the next suspension.
    fn dispatch(&mut self, claimed: Claimed, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let item = claimed.item();
        let now = ctx.now();

        let work = ctx.world.ledger.get_mut(item)?;
        work.start(self.id, now);
        trace!(coder = self.id, ?claimed, kind = ?work.kind, "dispatched");

        if work.needs_decomposition() {
            self.log(ctx, "decomposing");
            self.decompose(item, ctx)?;
            return self.wait(ctx);
        }

        if !work.is_complete() {
            let duration = work.duration;
            self.log(ctx, "working");
            ctx.sleep(duration);
            self.state = CoderState::Working(item);
            return Ok(());
        }

        self.wait(ctx)
    }

    /// Splits `item` into fragments on this Coder's own queue. Does not suspend.
    fn decompose(&mut self, item: ItemId, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let now = ctx.now();
        let pid = ctx.pid();
        let own = self.own_queue()?;

        let total = ctx.world.ledger.get(item)?.duration;
        let durations = fragment_durations(total, ctx.world.config.fragment_size)?;
        ctx.world.ledger.mark_decomposed(item)?;

        if durations.is_empty() {
            // Nothing left to do for a zero-length job
            ctx.world.ledger.complete(item, now)?;
            return Ok(());
        }

        let placeholder = ctx.world.new_placeholder(item, durations.len());
        debug!(
            coder = self.id,
            item = item.0,
            fragments = durations.len(),
            "decomposed"
        );

        for duration in durations {
            let fragment = ctx.world.new_fragment(self.id, placeholder, duration, now)?;
            if let PutStatus::Blocked(_) = ctx.world.put(own, fragment, pid, ctx.scheduler)? {
                return Err(SimError::invariant(format!(
                    "private queue of coder {} refused a fragment",
                    self.id
                )));
            }
        }
        Ok(())
    }

    fn finish(&mut self, item: ItemId, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let now = ctx.now();
        let completion = ctx.world.ledger.complete(item, now)?;
        if let Some(parent) = completion.parent_completed {
            debug!(coder = self.id, parent = parent.0, "all fragments done");
        }
        self.wait(ctx)
    }
}

impl Actor for Coder {
    const CATEGORY: Category = Category::Coder;

    fn id(&self) -> u64 {
        self.id
    }

    /// Allocates the private queue and publishes this Coder to the world.
    fn setup(&mut self, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        let queue = ctx.world.queues.add(format!("coder_{}", self.id), None);
        self.queue = Some(queue);
        ctx.world.coders.push(CoderHandle { id: self.id, queue });
        Ok(())
    }

    fn resume(&mut self, wake: Wake, ctx: &mut SimContext<'_>) -> Result<(), SimError> {
        match (self.state, wake) {
            (CoderState::Idle, Wake::Start) => self.wait(ctx),

            (CoderState::Waiting(race), Wake::Resolved(request)) if race.involves(request) => {
                match self.settle(race, ctx)? {
                    Some(claimed) => self.dispatch(claimed, ctx),
                    None => Ok(()),
                }
            }

            (CoderState::Working(item), Wake::Timeout) => self.finish(item, ctx),

            // Wake-up for a request this Coder already cancelled or claimed
            (state, wake) => {
                trace!(coder = self.id, ?state, ?wake, "stale wake ignored");
                Ok(())
            }
        }
    }
}
