//! World - the shared state every actor works against.

use crate::config::ModelConfig;
use crate::error::SimError;
use crate::log::{QueueOp, SimLog};
use crate::registry::{Category, IdentityRegistry};
use crate::work::{ItemId, Placeholder, PlaceholderId, Ticket, WorkItem, WorkLedger};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use teamsim_env::{Context, PriorityStore, ProcessId, PutStatus, RequestId, Scheduler};

/// What an actor sees while it runs.
pub type SimContext<'a> = Context<'a, World>;

/// Name of the shared, globally fed queue.
pub const CODE_QUEUE: &str = "code";

/// Index of a queue in the [`QueueSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(pub usize);

/// A priority store with the name it is reported under.
#[derive(Debug)]
pub struct NamedQueue {
    pub name: String,
    pub store: PriorityStore<Ticket>,
}

/// Every queue in the world, shared and private alike.
#[derive(Debug, Default)]
pub struct QueueSet {
    queues: Vec<NamedQueue>,
}

impl QueueSet {
    pub fn add(&mut self, name: impl Into<String>, capacity: Option<usize>) -> QueueId {
        let store = match capacity {
            Some(cap) => PriorityStore::bounded(cap),
            None => PriorityStore::new(),
        };
        self.queues.push(NamedQueue {
            name: name.into(),
            store,
        });
        QueueId(self.queues.len() - 1)
    }

    pub fn get(&self, id: QueueId) -> Option<&NamedQueue> {
        self.queues.get(id.0)
    }

    pub fn get_mut(&mut self, id: QueueId) -> Option<&mut NamedQueue> {
        self.queues.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<QueueId> {
        self.queues.iter().position(|q| q.name == name).map(QueueId)
    }

    pub fn ids(&self) -> impl Iterator<Item = QueueId> {
        (0..self.queues.len()).map(QueueId)
    }

    /// Current length of a queue; 0 for an unknown id.
    pub fn len_of(&self, id: QueueId) -> usize {
        self.get(id).map_or(0, |q| q.store.len())
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Borrows two distinct queues mutably at once.
    pub fn pair_mut(
        &mut self,
        a: QueueId,
        b: QueueId,
    ) -> Result<(&mut NamedQueue, &mut NamedQueue), SimError> {
        if a == b || a.0 >= self.queues.len() || b.0 >= self.queues.len() {
            return Err(SimError::invariant(format!(
                "cannot borrow queues {} and {} together",
                a.0, b.0
            )));
        }

        if a.0 < b.0 {
            let (left, right) = self.queues.split_at_mut(b.0);
            Ok((&mut left[a.0], &mut right[0]))
        } else {
            let (left, right) = self.queues.split_at_mut(a.0);
            Ok((&mut right[0], &mut left[b.0]))
        }
    }
}

/// Public face of a spawned Coder: its id and its private queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderHandle {
    pub id: u64,
    pub queue: QueueId,
}

/// Shared model state for one simulation run.
pub struct World {
    pub config: ModelConfig,
    pub registry: IdentityRegistry,
    pub ledger: WorkLedger,
    pub queues: QueueSet,
    pub log: SimLog,
    pub rng: ChaCha8Rng,

    /// Coders in spawn order
    pub coders: Vec<CoderHandle>,

    code_queue: QueueId,
    seed: u64,
}

impl World {
    /// Creates a world with an empty shared queue and a fresh registry.
    pub fn new(config: ModelConfig, seed: u64) -> Self {
        let mut queues = QueueSet::default();
        let code_queue = queues.add(CODE_QUEUE, config.code_queue_capacity);

        Self {
            config,
            registry: IdentityRegistry::new(),
            ledger: WorkLedger::new(),
            queues,
            log: SimLog::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            coders: Vec::new(),
            code_queue,
            seed,
        }
    }

    /// The shared queue fed by job arrivals.
    pub fn code_queue(&self) -> QueueId {
        self.code_queue
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn log_actor(&mut self, now: Duration, category: Category, id: u64, state: &str) {
        self.log.actor(now, category, id, state);
    }

    // -------------------------------------------------------------------------
    // Item creation
    // -------------------------------------------------------------------------

    /// Registers `item` with the identity registry and stores it in the ledger.
    pub fn create_item(&mut self, build: impl FnOnce(u64) -> WorkItem, category: Category) -> ItemId {
        let id = self.registry.enroll(category);
        self.ledger.insert(build(id))
    }

    pub fn new_placeholder(&mut self, parent: ItemId, count: usize) -> PlaceholderId {
        let id = self.registry.enroll(Category::Placeholder);
        self.ledger.add_placeholder(Placeholder::new(id, parent, count))
    }

    /// Creates a fragment. A zero-length fragment is a decomposition bug.
    pub fn new_fragment(
        &mut self,
        coder: u64,
        placeholder: PlaceholderId,
        duration: Duration,
        now: Duration,
    ) -> Result<ItemId, SimError> {
        if duration.is_zero() {
            return Err(SimError::invariant(format!(
                "zero-length fragment for placeholder {}",
                placeholder.0
            )));
        }
        Ok(self.create_item(
            |id| WorkItem::fragment(id, coder, placeholder, duration, now),
            Category::JobFragment,
        ))
    }

    pub fn new_interrupt(&mut self, now: Duration) -> ItemId {
        let duration = self.config.interrupt_duration;
        self.create_item(|id| WorkItem::interrupt(id, duration, now), Category::Interrupt)
    }

    // -------------------------------------------------------------------------
    // Queue operations
    // -------------------------------------------------------------------------

    fn queue_mut(&mut self, queue: QueueId) -> Result<&mut NamedQueue, SimError> {
        self.queues
            .get_mut(queue)
            .ok_or_else(|| SimError::invariant(format!("unknown queue {}", queue.0)))
    }

    /// Puts `item` on `queue` on behalf of `pid`.
    pub fn put(
        &mut self,
        queue: QueueId,
        item: ItemId,
        pid: ProcessId,
        sched: &mut Scheduler,
    ) -> Result<PutStatus, SimError> {
        let ticket = self.ledger.ticket(item)?;
        let now = sched.now();
        let q = self.queue_mut(queue)?;
        let status = q.store.put(ticket, pid, sched);
        let (name, len) = (q.name.clone(), q.store.len());

        if status == PutStatus::Stored {
            self.log.queue(now, &name, QueueOp::Put, len);
        }
        Ok(status)
    }

    /// Issues a get request on `queue` for `pid`.
    pub fn get(
        &mut self,
        queue: QueueId,
        pid: ProcessId,
        sched: &mut Scheduler,
    ) -> Result<RequestId, SimError> {
        Ok(self.queue_mut(queue)?.store.get(pid, sched))
    }

    /// Records that an item left `queue`.
    pub fn log_get(&mut self, queue: QueueId, now: Duration) {
        if let Some(q) = self.queues.get(queue) {
            let (name, len) = (q.name.clone(), q.store.len());
            self.log.queue(now, &name, QueueOp::Get, len);
        }
    }
}
