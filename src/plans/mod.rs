//! # Plans and targets.
//!
//! - [`Plan`] - trait for declarative plans
//! - [`PlanRef`] - shared reference to a plan (`Arc<dyn Plan>`)
//! - [`Target`] / [`TargetId`] - identity-keyed handle to the object a plan acts on

mod plan;
mod target;

pub use plan::{AsAny, Plan, PlanRef, downcast_plan};
pub use target::{Target, TargetId};
