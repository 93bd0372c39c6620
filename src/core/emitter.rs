//! # Plan emission from performers.
//!
//! A performer may need further plans executed, on its own target or on
//! another one (a drag performer emitting a spring on release, say). It uses
//! the [`PlanEmitter`] from its [`PerformerContext`](crate::PerformerContext).
//!
//! ## Rules
//! - Emitted plans are queued; the runtime dispatches them once the outermost
//!   dispatch in progress returns, so no performer is re-entered mid-call.
//! - Emitting outside any dispatch (e.g. from a completion callback) dispatches
//!   immediately.
//! - Emitting after the runtime is gone is a no-op.

use std::sync::Weak;

use crate::core::MotionRuntime;
use crate::plans::{PlanRef, Target};

/// Adds plans to the runtime that created the performer.
#[derive(Clone)]
pub struct PlanEmitter {
    runtime: Weak<MotionRuntime>,
}

impl PlanEmitter {
    pub(crate) fn new(runtime: Weak<MotionRuntime>) -> Self {
        Self { runtime }
    }

    /// An emitter bound to no runtime; every emission is dropped.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            runtime: Weak::new(),
        }
    }

    /// Queues `plan` for `target`.
    ///
    /// Returns `false` if the runtime no longer exists.
    pub fn emit_plan(&self, plan: PlanRef, target: &Target) -> bool {
        match self.runtime.upgrade() {
            Some(runtime) => {
                runtime.enqueue_emitted(plan, target.clone());
                true
            }
            None => {
                tracing::debug!(plan = ?plan, "plan emitted after runtime was dropped");
                false
            }
        }
    }
}

impl std::fmt::Debug for PlanEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEmitter")
            .field("attached", &(self.runtime.strong_count() > 0))
            .finish()
    }
}
