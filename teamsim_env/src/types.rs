//! Common types for the discrete-event kernel.

/// Identifier of a spawned process, assigned in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub usize);

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proc#{}", self.0)
    }
}

/// Identifier of a pending get or put request on a store.
///
/// Request ids are unique across all stores of one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Why a process is being resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// First resumption after spawn.
    Start,

    /// A timer set with `Context::sleep` fired.
    Timeout,

    /// A get request has an item reserved for it.
    Resolved(RequestId),

    /// A blocked put request was admitted into its store.
    Admitted(RequestId),
}
