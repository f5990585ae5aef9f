//! teamsim Core - an actor model of a software development team
//!
//! This crate models a team of Coders pulling work from a shared queue
//! while being interrupted, built on the [`teamsim_env`] kernel.
//!
//! # Actors
//!
//! - **Coder**: waits on the shared `code` queue and its own private queue
//!   at once, always preferring private work. Large jobs are split into
//!   fragments on the private queue before any of them run.
//! - **Interrupter**: drops interrupts on a random Coder's private queue.
//! - **JobSource**: feeds jobs into the shared queue.
//! - **QueueMonitor**: samples queue lengths at a fixed interval.
//!
//! # Work Ordering
//!
//! Every queue is a priority store ordered by `(priority, t_create, id)`.
//! Fragments and interrupts are [`Priority::High`], so they always run
//! before queued jobs on the same queue.
//!
//! ```ignore
//! let mut sim = teamsim_core::build(config, 12345)?;
//! sim.run(Duration::from_secs(100))?;
//! for (_, item) in sim.world().ledger.items() {
//!     println!("{:?}", item);
//! }
//! ```

pub mod actor;
pub mod coder;
pub mod config;
pub mod error;
pub mod interrupter;
pub mod log;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod source;
pub mod work;
pub mod world;

pub use actor::{spawn, Actor, Simulation};
pub use coder::{Claimed, Coder};
pub use config::{
    secs_to_duration, Arrivals, Interarrival, ModelConfig, PoissonArrivals, ScriptedJob,
};
pub use error::{ConfigError, SimError};
pub use interrupter::Interrupter;
pub use log::{ActorRecord, QueueOp, QueueRecord, SimLog};
pub use model::build;
pub use monitor::QueueMonitor;
pub use registry::{Category, IdentityRegistry};
pub use source::JobSource;
pub use work::{
    fragment_durations, Completion, ItemId, Placeholder, PlaceholderId, Priority, Ticket,
    WorkItem, WorkKind, WorkLedger,
};
pub use world::{CoderHandle, QueueId, QueueSet, SimContext, World, CODE_QUEUE};
