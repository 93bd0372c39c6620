//! # Tracers: observers of the motion runtime.
//!
//! This module provides the [`Trace`] trait and the [`TracerSet`] that fans
//! events out to every registered tracer.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   MotionRuntime ── emit(Event) ──► TracerSet ──► Trace::on_event(&Event)
//!                                                        │
//!                                                   ┌────┴────┬─────────┐
//!                                                   ▼         ▼         ▼
//!                                               LogTracer  Recorder  Custom ...
//! ```
//!
//! Tracers are strictly observers: the runtime's activity flag is driven by
//! tokens, never by tracers.

#[cfg(feature = "logging")]
mod log;
mod tracer;
mod tracer_set;

#[cfg(feature = "logging")]
pub use log::LogTracer;
pub use tracer::Trace;
pub use tracer_set::TracerSet;
