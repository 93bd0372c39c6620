//! # Tracer trait.
//!
//! Provides [`Trace`], the extension point for observing the runtime without
//! taking part in dispatch.
//!
//! ## Rules
//! - Events are delivered synchronously, on the context that caused them,
//!   in registration order.
//! - A tracer sees only events emitted while it is registered.
//! - Panics are caught; the other tracers receive `EventKind::TracerPanicked`.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use motionvisor::{Event, EventKind, Trace};
//!
//! #[derive(Default)]
//! struct PerformerCounter(AtomicUsize);
//!
//! impl Trace for PerformerCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::PerformerCreated) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "performer-counter" }
//! }
//! ```

use crate::events::Event;

/// Observer of runtime events.
///
/// ### Implementation requirements
/// - Keep `on_event` short: it runs inline with dispatch.
/// - Read-only calls into the runtime are fine; adding or removing plans from
///   inside `on_event` is not supported.
pub trait Trace: Send + Sync + 'static {
    /// Handles a single event.
    fn on_event(&self, event: &Event);

    /// Returns the tracer name used in logs and panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
