//! # Performer abstractions.
//!
//! - [`Perform`] - trait implemented by performers
//! - [`PerformerKind`] - capability signature plans return, used as registry key
//! - [`PerformerContext`] - target, token generator, emitter and cancellation handed to new performers

mod context;
mod kind;
mod perform;

pub use context::PerformerContext;
pub(crate) use kind::{BoxPerformer, short_type_name};
pub use kind::PerformerKind;
pub use perform::Perform;
