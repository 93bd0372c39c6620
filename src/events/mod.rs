//! Trace events: the data model tracers receive.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publisher**: `MotionRuntime` (dispatch, named-plan replacement, performer
//!   release, activity transitions) and `TracerSet` (tracer panics).
//! - **Consumers**: every registered [`Trace`](crate::Trace) via `TracerSet::emit`.

mod event;

pub use event::{Event, EventKind};
