//! Virtual clock and event queue.

use crate::types::{ProcessId, RequestId, Wake};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A wake-up scheduled for a process at a virtual time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledWake {
    time: Duration,
    sequence: u64,
    target: ProcessId,
    wake: Wake,
}

impl PartialOrd for ScheduledWake {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledWake {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap: reverse so the earliest (time, sequence) pops first
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// The virtual clock plus the queue of pending wake-ups.
///
/// Time only moves forward, and only when [`Scheduler::pop_before`] hands
/// out the next event. Events at the same instant keep scheduling order.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_sequence: u64,
    next_request: u64,
    heap: BinaryHeap<ScheduledWake>,
    events_processed: u64,
}

impl Scheduler {
    /// Creates a scheduler with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedules `wake` for `target` after `delay` from now.
    pub fn schedule(&mut self, target: ProcessId, delay: Duration, wake: Wake) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.heap.push(ScheduledWake {
            time: self.now + delay,
            sequence,
            target,
            wake,
        });
    }

    /// Schedules a timer for `target`; it resumes with [`Wake::Timeout`].
    pub fn after(&mut self, target: ProcessId, delay: Duration) {
        self.schedule(target, delay, Wake::Timeout);
    }

    /// Schedules `wake` for `target` at the current instant.
    pub fn wake_now(&mut self, target: ProcessId, wake: Wake) {
        self.schedule(target, Duration::ZERO, wake);
    }

    /// Allocates a fresh request id.
    pub fn next_request(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }

    /// Pops the earliest event strictly before `until` and moves the clock to it.
    pub(crate) fn pop_before(&mut self, until: Duration) -> Option<(ProcessId, Wake)> {
        if self.heap.peek()?.time >= until {
            return None;
        }

        let event = self.heap.pop()?;
        self.now = event.time;
        self.events_processed += 1;
        Some((event.target, event.wake))
    }

    /// Moves the clock forward to `time`. Never moves it backwards.
    pub(crate) fn advance_to(&mut self, time: Duration) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Returns the number of events still queued.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    /// Returns the number of events handed out so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_pop_in_time_order() {
        let mut sched = Scheduler::new();
        sched.after(ProcessId(0), Duration::from_secs(3));
        sched.after(ProcessId(1), Duration::from_secs(1));
        sched.after(ProcessId(2), Duration::from_secs(2));

        let until = Duration::from_secs(10);
        assert_eq!(sched.pop_before(until).map(|e| e.0), Some(ProcessId(1)));
        assert_eq!(sched.now(), Duration::from_secs(1));
        assert_eq!(sched.pop_before(until).map(|e| e.0), Some(ProcessId(2)));
        assert_eq!(sched.pop_before(until).map(|e| e.0), Some(ProcessId(0)));
        assert_eq!(sched.now(), Duration::from_secs(3));
        assert!(sched.pop_before(until).is_none());
        assert_eq!(sched.events_processed(), 3);
    }

    #[test]
    fn test_same_instant_keeps_scheduling_order() {
        let mut sched = Scheduler::new();
        for i in 0..5 {
            sched.wake_now(ProcessId(i), Wake::Start);
        }

        let order: Vec<usize> = std::iter::from_fn(|| sched.pop_before(Duration::from_secs(1)))
            .map(|(pid, _)| pid.0)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(sched.now(), Duration::ZERO);
    }

    #[test]
    fn test_events_at_until_are_not_popped() {
        let mut sched = Scheduler::new();
        sched.after(ProcessId(0), Duration::from_secs(5));

        assert!(sched.pop_before(Duration::from_secs(5)).is_none());
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.now(), Duration::ZERO);
    }

    #[test]
    fn test_advance_never_goes_backwards() {
        let mut sched = Scheduler::new();
        sched.advance_to(Duration::from_secs(4));
        sched.advance_to(Duration::from_secs(2));
        assert_eq!(sched.now(), Duration::from_secs(4));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let mut sched = Scheduler::new();
        let a = sched.next_request();
        let b = sched.next_request();
        assert_ne!(a, b);
    }
}
