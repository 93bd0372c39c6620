//! # Performer registry - one performer per (kind, target).
//!
//! The registry owns every live performer together with the bookkeeping the
//! runtime needs to decide when a performer is idle:
//! - the number of anonymous plans it was given (never removable),
//! - the set of named plans it currently executes.
//!
//! ## Architecture
//! ```text
//! MotionRuntime::dispatch()
//!     ├─► Registry::get(key)            ─► Some(handle)  (reuse)
//!     ├─► Registry::insert(key, entry)  ─► handle        (first plan of this kind)
//!     ├─► Registry::retain_*(key)       ─► plan accepted
//!     └─► Registry::take_if_idle(key)   ─► Entry ─► Entry::release()
//! ```
//!
//! ## Rules
//! - At most one performer per `PerformerKey` at any time.
//! - The registry lock is never held while a performer runs.
//! - Releasing an entry cancels its token, calls `Perform::release` and drops
//!   the performer, which terminates its remaining activity tokens.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::performers::{BoxPerformer, PerformerKind};
use crate::plans::{Target, TargetId};

/// Registry key: capability signature plus target identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PerformerKey {
    pub target: TargetId,
    pub kind: PerformerKind,
}

impl PerformerKey {
    pub fn new(kind: PerformerKind, target: &Target) -> Self {
        Self {
            target: target.id(),
            kind,
        }
    }
}

/// Shared handle to a live performer.
pub(crate) type PerformerCell = Arc<Mutex<BoxPerformer>>;

/// A live performer and its plan references.
pub(crate) struct Entry {
    pub key: PerformerKey,
    /// Keeps the target alive exactly as long as the performer.
    pub target: Target,
    pub performer: PerformerCell,
    pub cancel: CancellationToken,
    anonymous: usize,
    named: HashSet<Arc<str>>,
}

impl Entry {
    pub fn new(
        key: PerformerKey,
        target: Target,
        performer: BoxPerformer,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            key,
            target,
            performer: Arc::new(Mutex::new(performer)),
            cancel,
            anonymous: 0,
            named: HashSet::new(),
        }
    }

    fn is_idle(&self) -> bool {
        self.anonymous == 0 && self.named.is_empty()
    }

    /// Cancel → `Perform::release` → drop.
    pub fn release(self) {
        self.cancel.cancel();
        self.performer.lock().release();
    }
}

/// Live performers keyed by (kind, target).
pub(crate) struct Registry {
    performers: Mutex<HashMap<PerformerKey, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            performers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the performer for `key` if one is live.
    pub fn get(&self, key: &PerformerKey) -> Option<PerformerCell> {
        self.performers
            .lock()
            .get(key)
            .map(|e| Arc::clone(&e.performer))
    }

    /// Registers a freshly created performer.
    ///
    /// If a performer was registered for the same key in the meantime, the
    /// existing one wins and the new entry is handed back to be released.
    pub fn insert(&self, entry: Entry) -> (PerformerCell, Option<Entry>) {
        let mut performers = self.performers.lock();
        match performers.get(&entry.key) {
            Some(existing) => (Arc::clone(&existing.performer), Some(entry)),
            None => {
                let cell = Arc::clone(&entry.performer);
                performers.insert(entry.key, entry);
                (cell, None)
            }
        }
    }

    /// Records an accepted anonymous plan.
    pub fn retain_anonymous(&self, key: &PerformerKey) {
        if let Some(e) = self.performers.lock().get_mut(key) {
            e.anonymous += 1;
        }
    }

    /// Records an accepted named plan.
    pub fn retain_named(&self, key: &PerformerKey, name: &Arc<str>) {
        if let Some(e) = self.performers.lock().get_mut(key) {
            e.named.insert(Arc::clone(name));
        }
    }

    /// Forgets a named plan the performer no longer executes.
    pub fn forget_named(&self, key: &PerformerKey, name: &str) {
        if let Some(e) = self.performers.lock().get_mut(key) {
            e.named.remove(name);
        }
    }

    /// Removes the entry if no plan references it anymore.
    pub fn take_if_idle(&self, key: &PerformerKey) -> Option<Entry> {
        let mut performers = self.performers.lock();
        if performers.get(key).is_some_and(Entry::is_idle) {
            performers.remove(key)
        } else {
            None
        }
    }

    /// Removes every entry (teardown).
    pub fn drain(&self) -> Vec<Entry> {
        self.performers.lock().drain().map(|(_, e)| e).collect()
    }

    pub fn len(&self) -> usize {
        self.performers.lock().len()
    }
}
