//! Error types for the discrete-event kernel.

use crate::types::ProcessId;
use thiserror::Error;

/// Errors raised by the kernel itself.
///
/// These indicate misuse of the engine (an event addressed to a process
/// that does not exist), never a condition of the simulated model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// An event targeted a process id that was never spawned.
    #[error("Unknown process: {0}")]
    UnknownProcess(ProcessId),

    /// A process was resumed while it was already running.
    #[error("Process {0} resumed re-entrantly")]
    Reentrant(ProcessId),
}
