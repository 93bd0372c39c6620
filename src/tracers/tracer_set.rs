//! # Synchronous event fan-out to registered tracers.
//!
//! Provides [`TracerSet`], an ordered, identity-keyed collection of tracers.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├─ snapshot = tracers.read().clone()      (lock released before delivery)
//!     │
//!     ├──► tracer1.on_event()
//!     │        └──► panic → error! + TracerPanicked to the others
//!     ├──► tracer2.on_event()
//!     └──► tracerN.on_event()
//! ```
//!
//! ## Rules
//! - **Registration order**: delivery follows insertion order.
//! - **Identity**: tracers are compared by allocation address, never by value.
//! - **Snapshot**: a tracer added or removed during `emit` affects the next
//!   event, not the one being delivered.
//! - **Isolation**: a panicking tracer does not stop delivery to the others.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::DuplicateTracers;
use crate::events::Event;
use crate::tracers::Trace;

/// Ordered set of tracers.
pub struct TracerSet {
    tracers: RwLock<Vec<Arc<dyn Trace>>>,
    duplicates: DuplicateTracers,
}

impl TracerSet {
    /// Creates an empty set with the given duplicate policy.
    #[must_use]
    pub fn new(duplicates: DuplicateTracers) -> Self {
        Self {
            tracers: RwLock::new(Vec::new()),
            duplicates,
        }
    }

    /// Appends `tracer`. Returns `false` if it was ignored as a duplicate.
    pub fn add(&self, tracer: Arc<dyn Trace>) -> bool {
        let mut tracers = self.tracers.write();
        if self.duplicates == DuplicateTracers::Ignore
            && tracers.iter().any(|t| same_tracer(t, &tracer))
        {
            return false;
        }
        tracers.push(tracer);
        true
    }

    /// Removes `tracer` (every registration of it). Returns `false` if it was not registered.
    pub fn remove<T: Trace + ?Sized>(&self, tracer: &Arc<T>) -> bool {
        let needle = Arc::as_ptr(tracer) as *const ();
        let mut tracers = self.tracers.write();
        let before = tracers.len();
        tracers.retain(|t| Arc::as_ptr(t) as *const () != needle);
        tracers.len() != before
    }

    /// Ordered copy of the current registrations.
    pub fn snapshot(&self) -> Vec<Arc<dyn Trace>> {
        self.tracers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.tracers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracers.read().is_empty()
    }

    /// Delivers `event` to every registered tracer, in order.
    pub fn emit(&self, event: &Event) {
        let tracers = self.snapshot();
        for (idx, tracer) in tracers.iter().enumerate() {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| tracer.on_event(event))) {
                let info = panic_message(&*panic_err);
                tracing::error!(tracer = tracer.name(), info = %info, "tracer panicked");
                if !event.is_tracer_panic() {
                    let report = Event::tracer_panicked(tracer.name(), info);
                    deliver_quietly(&tracers, idx, &report);
                }
            }
        }
    }
}

/// Delivers a panic report to every tracer except the one that panicked.
fn deliver_quietly(tracers: &[Arc<dyn Trace>], skip: usize, report: &Event) {
    for (idx, tracer) in tracers.iter().enumerate() {
        if idx == skip {
            continue;
        }
        if catch_unwind(AssertUnwindSafe(|| tracer.on_event(report))).is_err() {
            tracing::error!(tracer = tracer.name(), "tracer panicked on panic report");
        }
    }
}

fn same_tracer(a: &Arc<dyn Trace>, b: &Arc<dyn Trace>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
