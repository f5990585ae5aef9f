//! Priority store with cancellable get requests.
//!
//! Getters are served in request order. The item handed to a getter is
//! the smallest one in the store (per `Ord`), and it is *reserved* for the
//! request until the owning process claims it with [`PriorityStore::take`]
//! or gives it back with [`PriorityStore::cancel`].
//!
//! ```text
//!   put ──► items (min-heap) ──► reserved[req] ──► take(req)
//!                 ▲                    │
//!                 └──── cancel(req) ───┘
//! ```

use crate::scheduler::Scheduler;
use crate::types::{ProcessId, RequestId, Wake};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use tracing::trace;

/// Outcome of [`PriorityStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    /// The item is in the store.
    Stored,

    /// The store is full. The putter is resumed with [`Wake::Admitted`]
    /// carrying this id once the item has been taken in.
    Blocked(RequestId),
}

/// A priority queue whose get and put operations can suspend.
#[derive(Debug)]
pub struct PriorityStore<T> {
    capacity: Option<usize>,
    items: BinaryHeap<Reverse<T>>,
    getters: VecDeque<(RequestId, ProcessId)>,
    reserved: HashMap<RequestId, T>,
    putters: VecDeque<(RequestId, ProcessId, T)>,
}

impl<T: Ord> PriorityStore<T> {
    /// Creates an unbounded store. Puts never block.
    pub fn new() -> Self {
        Self {
            capacity: None,
            items: BinaryHeap::new(),
            getters: VecDeque::new(),
            reserved: HashMap::new(),
            putters: VecDeque::new(),
        }
    }

    /// Creates a store holding at most `capacity` items.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Returns the configured capacity, `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of items physically in the store.
    ///
    /// Items reserved for a getter have left the store and are not counted.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if a put would block.
    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.items.len() >= cap)
    }

    /// Returns the item the next getter would receive.
    pub fn peek(&self) -> Option<&T> {
        self.items.peek().map(|Reverse(item)| item)
    }

    /// Iterates the stored items in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|Reverse(item)| item)
    }

    /// Number of get requests still waiting for an item.
    pub fn waiting_getters(&self) -> usize {
        self.getters.len()
    }

    /// Offers `item` to the store on behalf of `pid`.
    pub fn put(&mut self, item: T, pid: ProcessId, sched: &mut Scheduler) -> PutStatus {
        if self.is_full() {
            let request = sched.next_request();
            trace!(%request, %pid, "put blocked");
            self.putters.push_back((request, pid, item));
            return PutStatus::Blocked(request);
        }

        self.items.push(Reverse(item));
        self.dispatch(sched);
        PutStatus::Stored
    }

    /// Issues a get request for `pid`.
    ///
    /// If an item is available it is reserved at once and the wake-up is
    /// scheduled for the current instant; otherwise the request waits.
    pub fn get(&mut self, pid: ProcessId, sched: &mut Scheduler) -> RequestId {
        let request = sched.next_request();
        self.getters.push_back((request, pid));
        self.dispatch(sched);
        request
    }

    /// Returns true if `request` has an item reserved and not yet claimed.
    pub fn is_resolved(&self, request: RequestId) -> bool {
        self.reserved.contains_key(&request)
    }

    /// Returns true if `request` is still waiting for an item.
    pub fn is_pending(&self, request: RequestId) -> bool {
        self.getters.iter().any(|(r, _)| *r == request)
    }

    /// Claims the item reserved for `request`.
    pub fn take(&mut self, request: RequestId) -> Option<T> {
        self.reserved.remove(&request)
    }

    /// Withdraws `request`.
    ///
    /// A waiting getter or blocked putter is dropped from its line. A
    /// resolved-but-unclaimed getter hands its item back to the store,
    /// where the next waiting getter may receive it. A request that was
    /// already claimed (or never existed) is left alone.
    ///
    /// Returns true if the store changed.
    pub fn cancel(&mut self, request: RequestId, sched: &mut Scheduler) -> bool {
        if let Some(pos) = self.getters.iter().position(|(r, _)| *r == request) {
            self.getters.remove(pos);
            trace!(%request, "cancelled waiting get");
            return true;
        }

        if let Some(item) = self.reserved.remove(&request) {
            self.items.push(Reverse(item));
            trace!(%request, "cancelled resolved get, item returned");
            self.dispatch(sched);
            return true;
        }

        if let Some(pos) = self.putters.iter().position(|(r, _, _)| *r == request) {
            self.putters.remove(pos);
            trace!(%request, "cancelled blocked put");
            return true;
        }

        false
    }

    /// Admits blocked putters and serves waiting getters until neither can progress.
    fn dispatch(&mut self, sched: &mut Scheduler) {
        loop {
            let mut progressed = false;

            while !self.is_full() {
                let Some((request, pid, item)) = self.putters.pop_front() else {
                    break;
                };
                self.items.push(Reverse(item));
                sched.wake_now(pid, Wake::Admitted(request));
                progressed = true;
            }

            if !self.items.is_empty() {
                if let Some((request, pid)) = self.getters.pop_front() {
                    if let Some(Reverse(item)) = self.items.pop() {
                        self.reserved.insert(request, item);
                        sched.wake_now(pid, Wake::Resolved(request));
                        progressed = true;
                    }
                }
            }

            if !progressed {
                break;
            }
        }
    }
}

impl<T: Ord> Default for PriorityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn drain(sched: &mut Scheduler) -> Vec<(ProcessId, Wake)> {
        std::iter::from_fn(|| sched.pop_before(Duration::MAX)).collect()
    }

    #[test]
    fn test_get_on_empty_store_waits() {
        let mut sched = Scheduler::new();
        let mut store: PriorityStore<u32> = PriorityStore::new();

        let req = store.get(ProcessId(0), &mut sched);
        assert!(store.is_pending(req));
        assert!(!store.is_resolved(req));
        assert_eq!(sched.pending(), 0);

        store.put(7, ProcessId(1), &mut sched);
        assert!(store.is_resolved(req));
        assert!(store.is_empty());
        assert_eq!(drain(&mut sched), vec![(ProcessId(0), Wake::Resolved(req))]);
        assert_eq!(store.take(req), Some(7));
    }

    #[test]
    fn test_items_come_out_smallest_first() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::new();
        for item in [5, 1, 3] {
            store.put(item, ProcessId(9), &mut sched);
        }

        let mut got = Vec::new();
        for _ in 0..3 {
            let req = store.get(ProcessId(0), &mut sched);
            got.push(store.take(req).unwrap());
        }
        assert_eq!(got, vec![1, 3, 5]);
    }

    #[test]
    fn test_getters_are_served_in_request_order() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::new();
        let first = store.get(ProcessId(0), &mut sched);
        let second = store.get(ProcessId(1), &mut sched);

        store.put(10, ProcessId(2), &mut sched);
        assert!(store.is_resolved(first));
        assert!(store.is_pending(second));
    }

    #[test]
    fn test_cancel_waiting_get_leaves_items_alone() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::new();
        let req = store.get(ProcessId(0), &mut sched);

        assert!(store.cancel(req, &mut sched));
        assert_eq!(store.waiting_getters(), 0);

        store.put(4, ProcessId(1), &mut sched);
        assert_eq!(store.len(), 1);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_cancel_resolved_get_returns_item_to_next_getter() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::new();
        store.put(1, ProcessId(9), &mut sched);

        let loser = store.get(ProcessId(0), &mut sched);
        let other = store.get(ProcessId(1), &mut sched);
        assert!(store.is_resolved(loser));
        assert!(store.is_pending(other));

        assert!(store.cancel(loser, &mut sched));
        assert!(store.is_resolved(other));
        assert_eq!(store.take(other), Some(1));
    }

    #[test]
    fn test_cancel_claimed_request_is_noop() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::new();
        store.put(1, ProcessId(9), &mut sched);
        store.put(2, ProcessId(9), &mut sched);

        let req = store.get(ProcessId(0), &mut sched);
        assert_eq!(store.take(req), Some(1));

        let now = sched.now();
        let pending = sched.pending();
        assert!(!store.cancel(req, &mut sched));
        assert_eq!(store.len(), 1);
        assert_eq!(sched.pending(), pending);
        assert_eq!(sched.now(), now);
    }

    #[test]
    fn test_bounded_put_blocks_until_space() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::bounded(1);
        assert_eq!(store.put(1, ProcessId(0), &mut sched), PutStatus::Stored);

        let status = store.put(2, ProcessId(0), &mut sched);
        let PutStatus::Blocked(put_req) = status else {
            panic!("expected blocked put, got {status:?}");
        };
        assert_eq!(store.len(), 1);

        let get_req = store.get(ProcessId(1), &mut sched);
        assert_eq!(store.take(get_req), Some(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.peek(), Some(&2));

        let wakes = drain(&mut sched);
        assert!(wakes.contains(&(ProcessId(0), Wake::Admitted(put_req))));
        assert!(wakes.contains(&(ProcessId(1), Wake::Resolved(get_req))));
    }

    #[test]
    fn test_cancel_blocked_put_drops_item() {
        let mut sched = Scheduler::new();
        let mut store = PriorityStore::bounded(0);
        let PutStatus::Blocked(req) = store.put(3, ProcessId(0), &mut sched) else {
            panic!("zero-capacity store accepted an item");
        };

        assert!(store.cancel(req, &mut sched));
        assert!(store.is_empty());
        assert!(!store.cancel(req, &mut sched));
    }

    proptest! {
        #[test]
        fn prop_gets_drain_in_priority_order(items in prop::collection::vec(0u32..1000, 0..50)) {
            let mut sched = Scheduler::new();
            let mut store = PriorityStore::new();
            for item in &items {
                store.put(*item, ProcessId(0), &mut sched);
            }

            let drained: Vec<u32> = (0..items.len())
                .filter_map(|_| {
                    let req = store.get(ProcessId(1), &mut sched);
                    store.take(req)
                })
                .collect();

            let mut sorted = items.clone();
            sorted.sort_unstable();
            prop_assert_eq!(drained, sorted);
            prop_assert!(store.is_empty());
        }

        #[test]
        fn prop_cancel_conserves_items(items in prop::collection::vec(0u32..100, 1..20), cancel_every in 1usize..4) {
            let mut sched = Scheduler::new();
            let mut store = PriorityStore::new();
            for item in &items {
                store.put(*item, ProcessId(0), &mut sched);
            }

            let mut taken = 0;
            for i in 0..items.len() {
                let req = store.get(ProcessId(1), &mut sched);
                if i % cancel_every == 0 {
                    prop_assert!(store.cancel(req, &mut sched));
                } else if store.take(req).is_some() {
                    taken += 1;
                }
            }
            prop_assert_eq!(store.len() + taken, items.len());
        }
    }
}
