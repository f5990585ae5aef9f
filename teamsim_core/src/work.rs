//! Work Item Model
//! ================
//!
//! Everything a Coder can pull off a queue:
//! - **Job**: fresh work from the shared queue, optionally needing decomposition
//! - **JobFragment**: a slice of a decomposed job, routed back to its Coder
//! - **Interrupt**: an unplanned disruption injected into a Coder's own queue
//!
//! Items live in a [`WorkLedger`] arena and are addressed by [`ItemId`].
//! Queues carry [`Ticket`]s, which hold the ordering key and the id.
//! Fragments of one decomposition share a [`Placeholder`] that completes the
//! parent job once the last fragment finishes.

use crate::error::SimError;
use crate::registry::Category;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// PRIORITY & IDS
// =============================================================================

/// Lower is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High = 0,
    Medium = 1,
    Low = 2,
}

impl Priority {
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

/// Index of an item in the [`WorkLedger`]. Also its global creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

/// Index of a [`Placeholder`] in the [`WorkLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceholderId(pub usize);

/// Queue entry. Orders by priority, then creation time, then creation order.
///
/// Field order matters: the derived `Ord` compares fields top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket {
    pub priority: Priority,
    pub t_create: Duration,
    pub item: ItemId,
}

// =============================================================================
// WORK ITEMS
// =============================================================================

/// The closed set of item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    /// Fresh work. `decompose` marks it for splitting on first dispatch.
    Job { decompose: bool, decomposed: bool },

    /// Slice of a decomposed job, owned by the Coder that split it.
    Fragment {
        coder: u64,
        placeholder: PlaceholderId,
    },

    Interrupt,
}

impl WorkKind {
    pub fn category(&self) -> Category {
        match self {
            WorkKind::Job { .. } => Category::Job,
            WorkKind::Fragment { .. } => Category::JobFragment,
            WorkKind::Interrupt => Category::Interrupt,
        }
    }
}

/// A unit of work plus its lifecycle record.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Per-category id from the identity registry
    pub id: u64,
    pub kind: WorkKind,
    pub priority: Priority,

    /// Processing time required
    pub duration: Duration,

    pub t_create: Duration,
    pub t_start: Option<Duration>,
    pub t_end: Option<Duration>,

    /// Coder that last dispatched this item
    pub coder_id: Option<u64>,
}

impl WorkItem {
    pub fn job(id: u64, duration: Duration, priority: Priority, decompose: bool, now: Duration) -> Self {
        Self::new(
            id,
            WorkKind::Job {
                decompose,
                decomposed: false,
            },
            priority,
            duration,
            now,
        )
    }

    pub fn fragment(
        id: u64,
        coder: u64,
        placeholder: PlaceholderId,
        duration: Duration,
        now: Duration,
    ) -> Self {
        Self::new(
            id,
            WorkKind::Fragment { coder, placeholder },
            Priority::High,
            duration,
            now,
        )
    }

    pub fn interrupt(id: u64, duration: Duration, now: Duration) -> Self {
        Self::new(id, WorkKind::Interrupt, Priority::High, duration, now)
    }

    fn new(id: u64, kind: WorkKind, priority: Priority, duration: Duration, now: Duration) -> Self {
        Self {
            id,
            kind,
            priority,
            duration,
            t_create: now,
            t_start: None,
            t_end: None,
            coder_id: None,
        }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// True if dispatching this item should split it instead of running it.
    pub fn needs_decomposition(&self) -> bool {
        match self.kind {
            WorkKind::Job {
                decompose,
                decomposed,
            } => decompose && !decomposed && !self.is_complete(),
            WorkKind::Fragment { .. } | WorkKind::Interrupt => false,
        }
    }

    /// True once the item needs no further scheduling.
    pub fn is_complete(&self) -> bool {
        self.t_end.is_some()
    }

    /// Records the dispatching Coder. The first start time sticks.
    pub fn start(&mut self, coder_id: u64, now: Duration) {
        self.coder_id = Some(coder_id);
        if self.t_start.is_none() {
            self.t_start = Some(now);
        }
    }

    fn finish(&mut self, now: Duration) {
        self.t_end = Some(now);
    }
}

// =============================================================================
// PLACEHOLDER
// =============================================================================

/// Completion tracker shared by the fragments of one decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub id: u64,
    pub parent: ItemId,
    pub total: usize,
    outstanding: usize,
}

impl Placeholder {
    pub fn new(id: u64, parent: ItemId, count: usize) -> Self {
        Self {
            id,
            parent,
            total: count,
            outstanding: count,
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding == 0
    }

    /// Records one fragment completion. Returns true on the 1 → 0 transition.
    pub fn settle_one(&mut self) -> Result<bool, SimError> {
        if self.outstanding == 0 {
            return Err(SimError::invariant(format!(
                "placeholder {} settled more times than its {} fragments",
                self.id, self.total
            )));
        }
        self.outstanding -= 1;
        Ok(self.outstanding == 0)
    }
}

// =============================================================================
// DECOMPOSITION
// =============================================================================

/// Splits `total` into whole fragments of `size` plus a leading remainder.
///
/// The remainder (if non-zero) comes first. The result sums to `total`
/// exactly and holds `ceil(total / size)` entries.
pub fn fragment_durations(total: Duration, size: Duration) -> Result<Vec<Duration>, SimError> {
    if size.is_zero() {
        return Err(SimError::invariant("fragment size of zero"));
    }

    let size_ns = size.as_nanos();
    let whole = total.as_nanos() / size_ns;
    let remainder_ns = total.as_nanos() - whole * size_ns;
    let whole = usize::try_from(whole)
        .map_err(|_| SimError::invariant(format!("{whole} fragments do not fit in memory")))?;

    let mut out = Vec::with_capacity(whole + 1);
    if remainder_ns > 0 {
        // remainder < size, and size came from a Duration, so it fits
        let secs = (remainder_ns / 1_000_000_000) as u64;
        let nanos = (remainder_ns % 1_000_000_000) as u32;
        out.push(Duration::new(secs, nanos));
    }
    out.extend(std::iter::repeat(size).take(whole));
    Ok(out)
}

// =============================================================================
// LEDGER
// =============================================================================

/// Fragment completion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub item: ItemId,

    /// Parent job completed by this fragment, if it was the last one
    pub parent_completed: Option<ItemId>,
}

/// Arena of every item and placeholder created during a run.
#[derive(Debug, Default)]
pub struct WorkLedger {
    items: Vec<WorkItem>,
    placeholders: Vec<Placeholder>,
}

impl WorkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: WorkItem) -> ItemId {
        let id = ItemId(self.items.len());
        self.items.push(item);
        id
    }

    pub fn get(&self, id: ItemId) -> Result<&WorkItem, SimError> {
        self.items
            .get(id.0)
            .ok_or_else(|| SimError::invariant(format!("unknown work item {}", id.0)))
    }

    pub fn get_mut(&mut self, id: ItemId) -> Result<&mut WorkItem, SimError> {
        self.items
            .get_mut(id.0)
            .ok_or_else(|| SimError::invariant(format!("unknown work item {}", id.0)))
    }

    pub fn ticket(&self, id: ItemId) -> Result<Ticket, SimError> {
        let item = self.get(id)?;
        Ok(Ticket {
            priority: item.priority,
            t_create: item.t_create,
            item: id,
        })
    }

    /// Iterates every item in creation order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &WorkItem)> {
        self.items.iter().enumerate().map(|(i, item)| (ItemId(i), item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_placeholder(&mut self, placeholder: Placeholder) -> PlaceholderId {
        let id = PlaceholderId(self.placeholders.len());
        self.placeholders.push(placeholder);
        id
    }

    pub fn placeholder(&self, id: PlaceholderId) -> Option<&Placeholder> {
        self.placeholders.get(id.0)
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Flags a job as split so it is never decomposed twice.
    pub fn mark_decomposed(&mut self, id: ItemId) -> Result<(), SimError> {
        match &mut self.get_mut(id)?.kind {
            WorkKind::Job { decomposed, .. } => {
                *decomposed = true;
                Ok(())
            }
            other => Err(SimError::invariant(format!(
                "only jobs can be decomposed, item {} is {:?}",
                id.0, other
            ))),
        }
    }

    /// Marks `id` finished at `now`; a fragment also settles its placeholder.
    pub fn complete(&mut self, id: ItemId, now: Duration) -> Result<Completion, SimError> {
        let item = self.get_mut(id)?;
        if item.is_complete() {
            return Err(SimError::invariant(format!(
                "{} {} completed twice",
                item.category(),
                item.id
            )));
        }
        item.finish(now);
        let kind = item.kind;

        let parent_completed = match kind {
            WorkKind::Job { .. } | WorkKind::Interrupt => None,
            WorkKind::Fragment { placeholder, .. } => self.settle_fragment(placeholder, now)?,
        };

        Ok(Completion {
            item: id,
            parent_completed,
        })
    }

    fn settle_fragment(
        &mut self,
        placeholder: PlaceholderId,
        now: Duration,
    ) -> Result<Option<ItemId>, SimError> {
        let holder = self
            .placeholders
            .get_mut(placeholder.0)
            .ok_or_else(|| SimError::invariant(format!("unknown placeholder {}", placeholder.0)))?;

        if !holder.settle_one()? {
            return Ok(None);
        }

        let parent = holder.parent;
        self.get_mut(parent)?.finish(now);
        Ok(Some(parent))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.placeholders.clear();
    }
}
