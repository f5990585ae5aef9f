//! Structured event log collected during a run.
//!
//! Every record is also mirrored to `tracing` at DEBUG level, so a run can be
//! followed live with `--verbose` and exported afterwards.

use crate::registry::Category;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// What happened to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOp {
    Put,
    Get,
    /// Periodic sample taken by a monitor
    Length,
}

/// An actor entered a new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub time: Duration,
    pub category: Category,
    pub id: u64,
    pub state: String,
}

/// A queue operation or length sample. `value` is the length afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub time: Duration,
    pub name: String,
    pub op: QueueOp,
    pub value: usize,
}

/// Log collaborator shared by every actor in a world.
#[derive(Debug, Default)]
pub struct SimLog {
    actors: Vec<ActorRecord>,
    queues: Vec<QueueRecord>,
}

impl SimLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(&mut self, time: Duration, category: Category, id: u64, state: &str) {
        debug!(t = time.as_secs_f64(), %category, id, state, "actor");
        self.actors.push(ActorRecord {
            time,
            category,
            id,
            state: state.to_string(),
        });
    }

    pub fn queue(&mut self, time: Duration, name: &str, op: QueueOp, value: usize) {
        debug!(t = time.as_secs_f64(), queue = name, ?op, value, "queue");
        self.queues.push(QueueRecord {
            time,
            name: name.to_string(),
            op,
            value,
        });
    }

    pub fn actor_records(&self) -> &[ActorRecord] {
        &self.actors
    }

    pub fn queue_records(&self) -> &[QueueRecord] {
        &self.queues
    }

    /// States logged by one actor, in order.
    pub fn states_of(&self, category: Category, id: u64) -> Vec<(Duration, &str)> {
        self.actors
            .iter()
            .filter(|r| r.category == category && r.id == id)
            .map(|r| (r.time, r.state.as_str()))
            .collect()
    }

    /// Length samples for one queue, in order.
    pub fn samples_of(&self, name: &str) -> Vec<(Duration, usize)> {
        self.queues
            .iter()
            .filter(|r| r.op == QueueOp::Length && r.name == name)
            .map(|r| (r.time, r.value))
            .collect()
    }

    pub fn clear(&mut self) {
        self.actors.clear();
        self.queues.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_filter_by_actor_and_queue() {
        let mut log = SimLog::new();
        log.actor(Duration::ZERO, Category::Coder, 0, "waiting");
        log.actor(Duration::ZERO, Category::Coder, 1, "waiting");
        log.actor(Duration::from_secs(1), Category::Coder, 0, "working");
        log.queue(Duration::ZERO, "code", QueueOp::Put, 1);
        log.queue(Duration::from_secs(5), "code", QueueOp::Length, 1);

        assert_eq!(
            log.states_of(Category::Coder, 0),
            vec![(Duration::ZERO, "waiting"), (Duration::from_secs(1), "working")]
        );
        assert_eq!(log.samples_of("code"), vec![(Duration::from_secs(5), 1)]);

        log.clear();
        assert!(log.actor_records().is_empty());
        assert!(log.queue_records().is_empty());
    }
}
