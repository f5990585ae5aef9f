//! Racing two get requests against each other.

use crate::scheduler::Scheduler;
use crate::store::PriorityStore;
use crate::types::RequestId;
use tracing::trace;

/// Which side of a [`Race`] produced the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceWinner<T> {
    Preferred(T),
    Fallback(T),
}

impl<T> RaceWinner<T> {
    /// Returns the item regardless of which side won.
    pub fn into_inner(self) -> T {
        match self {
            RaceWinner::Preferred(item) | RaceWinner::Fallback(item) => item,
        }
    }
}

/// Two get requests in flight at once, one of them preferred.
///
/// The owning process is resumed as soon as either request resolves.
/// [`Race::settle`] then decides the winner from the stores' state rather
/// than from wake-up order: if the preferred request holds an item it wins,
/// even when the fallback resolved first at the same instant. The loser is
/// cancelled, which hands any item it had reserved back to its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Race {
    preferred: RequestId,
    fallback: RequestId,
}

impl Race {
    pub fn new(preferred: RequestId, fallback: RequestId) -> Self {
        Self { preferred, fallback }
    }

    pub fn preferred(&self) -> RequestId {
        self.preferred
    }

    pub fn fallback(&self) -> RequestId {
        self.fallback
    }

    /// Returns true if `request` is one of the two racing requests.
    pub fn involves(&self, request: RequestId) -> bool {
        request == self.preferred || request == self.fallback
    }

    /// Claims the winning item and cancels the losing request.
    ///
    /// Returns `None` if neither request has resolved yet; both stay pending.
    pub fn settle<T: Ord>(
        &self,
        preferred_store: &mut PriorityStore<T>,
        fallback_store: &mut PriorityStore<T>,
        sched: &mut Scheduler,
    ) -> Option<RaceWinner<T>> {
        if let Some(item) = preferred_store.take(self.preferred) {
            let returned = fallback_store.cancel(self.fallback, sched);
            trace!(preferred = %self.preferred, returned, "race won by preferred request");
            return Some(RaceWinner::Preferred(item));
        }

        if let Some(item) = fallback_store.take(self.fallback) {
            preferred_store.cancel(self.preferred, sched);
            trace!(fallback = %self.fallback, "race won by fallback request");
            return Some(RaceWinner::Fallback(item));
        }

        None
    }
}
