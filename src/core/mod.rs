//! Runtime core: dispatch, activity and lifecycle.
//!
//! The public API from this module is [`MotionRuntime`] and the handles it
//! gives performers ([`TokenGenerator`], [`Token`], [`PlanEmitter`]).
//!
//! Internal modules:
//! - [`runtime`]: dispatches plans, manages named plans, releases performers;
//! - [`activity`]: counts live tokens and announces active/inactive flips;
//! - [`registry`]: one performer per (kind, target);
//! - [`named`]: the (target, name) → plan index;
//! - [`emitter`]: plans added by performers themselves.

mod activity;
mod builder;
mod config;
mod delegate;
mod emitter;
mod named;
mod registry;
mod runtime;

pub(crate) use activity::ActivityAggregator;
pub use activity::{Token, TokenGenerator};
pub use builder::RuntimeBuilder;
pub use config::{DuplicateTracers, RuntimeConfig};
pub use delegate::RuntimeDelegate;
pub use emitter::PlanEmitter;
pub use runtime::MotionRuntime;
