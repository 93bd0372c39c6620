//! # Trace events emitted by the motion runtime.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Plan events**: plans added (anonymous or named), named plans removed, plans rejected
//! - **Performer events**: performers created and released
//! - **Runtime events**: activity transitions, tracer panics
//!
//! The [`Event`] struct carries the metadata tracers need: target identity,
//! the plan, the plan name, the performer kind, the activity flag, a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Tracers receive events synchronously, in emission order.
//!
//! ## Example
//! ```rust
//! use motionvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::NamedPlanRemoved)
//!     .with_name("drag")
//!     .with_reason("replaced");
//!
//! assert_eq!(ev.kind, EventKind::NamedPlanRemoved);
//! assert_eq!(ev.name.as_deref(), Some("drag"));
//! assert_eq!(ev.reason.as_deref(), Some("replaced"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::plans::{PlanRef, TargetId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Plan events ===
    /// An anonymous plan is about to be dispatched.
    ///
    /// Sets:
    /// - `target`: target identity
    /// - `plan`: the plan
    PlanAdded,

    /// A named plan is about to be dispatched.
    ///
    /// Sets:
    /// - `target`: target identity
    /// - `plan`: the plan
    /// - `name`: plan name
    NamedPlanAdded,

    /// A named plan was removed from its performer.
    ///
    /// Sets:
    /// - `target`: target identity
    /// - `name`: plan name
    /// - `performer`: performer kind that held the plan
    /// - `reason`: `"removed"` or `"replaced"`
    NamedPlanRemoved,

    /// A performer refused a plan.
    ///
    /// Sets:
    /// - `target`: target identity
    /// - `plan`: the plan
    /// - `name`: plan name (named plans only)
    /// - `performer`: performer kind
    /// - `reason`: error label
    PlanRejected,

    // === Performer events ===
    /// A performer instance was created for a target.
    ///
    /// Sets:
    /// - `target`: target identity
    /// - `performer`: performer kind
    PerformerCreated,

    /// A performer instance was released (idle or runtime teardown).
    ///
    /// Sets:
    /// - `target`: target identity
    /// - `performer`: performer kind
    PerformerReleased,

    // === Runtime events ===
    /// The runtime's aggregate activity flipped.
    ///
    /// Sets:
    /// - `active`: the new state
    ActivityChanged,

    /// A tracer panicked while handling an event.
    ///
    /// Sets:
    /// - `tracer`: tracer name
    /// - `reason`: panic message
    TracerPanicked,
}

/// Trace event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Identity of the target the event concerns.
    pub target: Option<TargetId>,
    /// The plan being added or rejected.
    pub plan: Option<PlanRef>,
    /// Name of a named plan.
    pub name: Option<Arc<str>>,
    /// Display name of the performer kind.
    pub performer: Option<&'static str>,
    /// Aggregate activity after an `ActivityChanged`.
    pub active: Option<bool>,
    /// Name of the tracer (only for `TracerPanicked`).
    pub tracer: Option<&'static str>,
    /// Human-readable reason (error labels, panic details, removal cause).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            target: None,
            plan: None,
            name: None,
            performer: None,
            active: None,
            tracer: None,
            reason: None,
        }
    }

    /// Attaches a target identity.
    #[inline]
    pub fn with_target(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }

    /// Attaches a plan.
    #[inline]
    pub fn with_plan(mut self, plan: PlanRef) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Attaches a plan name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a performer kind name.
    #[inline]
    pub fn with_performer(mut self, performer: &'static str) -> Self {
        self.performer = Some(performer);
        self
    }

    /// Attaches the aggregate activity flag.
    #[inline]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a tracer panic event.
    #[inline]
    pub fn tracer_panicked(tracer: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::TracerPanicked).with_reason(info);
        ev.tracer = Some(tracer);
        ev
    }

    #[inline]
    pub fn is_tracer_panic(&self) -> bool {
        matches!(self.kind, EventKind::TracerPanicked)
    }
}
