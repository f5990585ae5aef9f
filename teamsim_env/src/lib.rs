//! teamsim Discrete-Event Kernel
//!
//! This crate provides the scheduling capability the team model runs on:
//! a single-threaded, deterministic discrete-event engine.
//!
//! # Core Concept: Explicit Suspension
//!
//! Every process is a state machine. It runs until it reaches a suspension
//! point and then returns control to the [`Environment`]:
//! - **Timer**: [`Context::sleep`] resumes the process with [`Wake::Timeout`]
//! - **Queue get**: [`PriorityStore::get`] resumes it with [`Wake::Resolved`]
//! - **Queue put** on a full bounded store: resumes it with [`Wake::Admitted`]
//! - **Race**: two gets in flight at once, settled by [`Race::settle`]
//!
//! The virtual clock only advances when the scheduler pops the next event.
//! Events scheduled for the same instant run in the order they were
//! scheduled, so a run is fully reproducible.
//!
//! # Example
//!
//! ```ignore
//! use teamsim_env::{Context, Environment, Process, Wake};
//!
//! struct Ticker;
//!
//! impl Process<u32, EnvError> for Ticker {
//!     fn resume(&mut self, _wake: Wake, ctx: &mut Context<'_, u32>) -> Result<(), EnvError> {
//!         *ctx.world += 1;
//!         ctx.sleep(Duration::from_secs(1));
//!         Ok(())
//!     }
//! }
//! ```

mod context;
mod error;
mod race;
mod scheduler;
mod store;
mod types;

pub use context::{Context, Environment, Process};
pub use error::EnvError;
pub use race::{Race, RaceWinner};
pub use scheduler::Scheduler;
pub use store::{PriorityStore, PutStatus};
pub use types::{ProcessId, RequestId, Wake};
