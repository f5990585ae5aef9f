//! Per-category identity bookkeeping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of entity an id belongs to. Each category counts from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Coder,
    Interrupter,
    QueueMonitor,
    JobSource,
    Job,
    JobFragment,
    Interrupt,
    Placeholder,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Coder => "Coder",
            Category::Interrupter => "Interrupter",
            Category::QueueMonitor => "QueueMonitor",
            Category::JobSource => "JobSource",
            Category::Job => "Job",
            Category::JobFragment => "JobFragment",
            Category::Interrupt => "Interrupt",
            Category::Placeholder => "Placeholder",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Hands out sequence numbers per category and remembers who got them.
///
/// One registry belongs to one simulation run. Call [`IdentityRegistry::reset`]
/// before reusing it, otherwise ids keep counting from the previous run.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    counters: HashMap<Category, u64>,
    instances: HashMap<Category, Vec<u64>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next id in `category`, starting at 0.
    pub fn next(&mut self, category: Category) -> u64 {
        let counter = self.counters.entry(category).or_insert(0);
        let id = *counter;
        *counter += 1;
        id
    }

    /// Records a live instance of `category`.
    pub fn register(&mut self, category: Category, id: u64) {
        self.instances.entry(category).or_default().push(id);
    }

    /// Reserves and registers in one step.
    pub fn enroll(&mut self, category: Category) -> u64 {
        let id = self.next(category);
        self.register(category, id);
        id
    }

    /// Ids registered under `category`, in registration order.
    pub fn instances(&self, category: Category) -> &[u64] {
        self.instances
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of ids handed out in `category`.
    pub fn issued(&self, category: Category) -> u64 {
        self.counters.get(&category).copied().unwrap_or(0)
    }

    /// Clears every counter and instance list.
    pub fn reset(&mut self) {
        self.counters.clear();
        self.instances.clear();
    }
}
