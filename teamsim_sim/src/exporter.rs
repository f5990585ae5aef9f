//! JSON export of a finished run.
//!
//! Times are written in simulated seconds, rounded to three decimals.

use crate::error::HarnessError;
use crate::params::SimParams;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::time::Duration;
use teamsim_core::{Category, QueueOp, World};

const PRECISION: f64 = 1000.0;

/// Seconds rounded to the export precision.
pub fn rounded(time: Duration) -> f64 {
    (time.as_secs_f64() * PRECISION).round() / PRECISION
}

fn rounded_opt(time: Option<Duration>) -> Option<f64> {
    time.map(rounded)
}

/// Lifecycle of one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub kind: Category,
    pub id: u64,
    pub priority: u8,
    pub duration: f64,
    pub t_create: f64,
    pub t_start: Option<f64>,
    pub t_end: Option<f64>,
    pub coder_id: Option<u64>,
}

/// An actor state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEntry {
    pub time: f64,
    pub actor: Category,
    pub id: u64,
    pub state: String,
}

/// A queue operation or length sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub time: f64,
    pub name: String,
    pub op: QueueOp,
    pub length: usize,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Parameters of a random run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<SimParams>,

    /// Simulated time at the end of the run
    pub duration_sec: f64,

    pub passed: bool,

    pub items: Vec<ItemRecord>,
    pub actors: Vec<ActorEntry>,
    pub queues: Vec<QueueEntry>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            params: None,
            duration_sec: 0.0,
            passed: false,
            items: Vec::new(),
            actors: Vec::new(),
            queues: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: SimParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Copies every record out of a finished world.
    pub fn capture(&mut self, world: &World, now: Duration) {
        self.duration_sec = rounded(now);

        self.items = world
            .ledger
            .items()
            .map(|(_, item)| ItemRecord {
                kind: item.category(),
                id: item.id,
                priority: item.priority.level(),
                duration: rounded(item.duration),
                t_create: rounded(item.t_create),
                t_start: rounded_opt(item.t_start),
                t_end: rounded_opt(item.t_end),
                coder_id: item.coder_id,
            })
            .collect();

        self.actors = world
            .log
            .actor_records()
            .iter()
            .map(|r| ActorEntry {
                time: rounded(r.time),
                actor: r.category,
                id: r.id,
                state: r.state.clone(),
            })
            .collect();

        self.queues = world
            .log
            .queue_records()
            .iter()
            .map(|r| QueueEntry {
                time: rounded(r.time),
                name: r.name.clone(),
                op: r.op,
                length: r.value,
            })
            .collect();
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool) {
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), HarnessError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| HarnessError::io(path, e))?;
        Ok(())
    }
}
