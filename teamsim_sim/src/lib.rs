//! teamsim Scenario Harness
//!
//! Runs the team model from user-facing parameters and checks the result.
//!
//! # Usage
//!
//! ```ignore
//! use teamsim_sim::{ScenarioRunner, SimParams};
//! use teamsim_sim::scenarios::ScenarioId;
//!
//! let mut params = SimParams::default();
//! params.apply_override("n_coder=3")?;
//!
//! let result = ScenarioRunner::new(params).run(ScenarioId::Default);
//! assert!(result.passed);
//! ```

mod error;
pub mod exporter;
mod params;
pub mod runner;
pub mod scenarios;

pub use error::HarnessError;
pub use exporter::{ActorEntry, ItemRecord, QueueEntry, SimExport};
pub use params::SimParams;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
