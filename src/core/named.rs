//! # Named-plan index.
//!
//! Maps (target identity, name) to the plan currently running under that name
//! and the performer executing it. One record per pair at any time:
//! - `put` hands back the record it displaced,
//! - `remove` hands back the record it deleted (`None` = nothing to do).
//!
//! The runtime uses the returned record to tell the old performer to stop.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::registry::PerformerKey;
use crate::plans::{PlanRef, TargetId};

/// A dispatched named plan.
#[derive(Clone, Debug)]
pub(crate) struct NamedRecord {
    pub plan: PlanRef,
    pub performer: PerformerKey,
}

/// Per-target name → record map.
#[derive(Default)]
pub(crate) struct NamedPlanIndex {
    records: HashMap<TargetId, HashMap<Arc<str>, NamedRecord>>,
}

impl NamedPlanIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, returning the one it replaces.
    pub fn put(&mut self, target: TargetId, name: Arc<str>, record: NamedRecord) -> Option<NamedRecord> {
        self.records.entry(target).or_default().insert(name, record)
    }

    /// Deletes the record for (target, name) if present.
    pub fn remove(&mut self, target: TargetId, name: &str) -> Option<NamedRecord> {
        let names = self.records.get_mut(&target)?;
        let removed = names.remove(name);
        if names.is_empty() {
            self.records.remove(&target);
        }
        removed
    }

    pub fn get(&self, target: TargetId, name: &str) -> Option<&NamedRecord> {
        self.records.get(&target)?.get(name)
    }

    /// Sorted names of the plans running on `target`.
    pub fn names(&self, target: TargetId) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .get(&target)
            .map(|m| m.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.records.values().map(HashMap::len).sum()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
