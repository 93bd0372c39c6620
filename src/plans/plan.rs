//! # Plan abstraction.
//!
//! A [`Plan`] is an immutable description of desired behavior. It never
//! references a performer or a target; it only declares the capability
//! signature ([`PerformerKind`]) of the performer able to execute it.
//!
//! Plans are shared as [`PlanRef`] (`Arc<dyn Plan>`). Performers recover the
//! concrete plan type with [`downcast_ref`](trait.Plan.html#method.downcast_ref)
//! or [`downcast_plan`].

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::PerformError;
use crate::performers::{PerformerKind, short_type_name};

/// Shared handle to a plan.
pub type PlanRef = Arc<dyn Plan>;

/// Upcast helper implemented for every `'static` type.
#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// # Declarative description of desired behavior.
///
/// Two plans returning the same [`PerformerKind`] for the same target are
/// executed by the same performer instance, however different their types.
///
/// # Example
/// ```
/// use motionvisor::{Perform, PerformError, PerformerContext, PerformerKind, Plan, PlanRef};
///
/// #[derive(Debug)]
/// struct FadeIn;
///
/// struct Fader;
///
/// impl Perform for Fader {
///     fn create(_ctx: PerformerContext) -> Self { Fader }
///     fn add_plan(&mut self, _plan: &PlanRef) -> Result<(), PerformError> { Ok(()) }
/// }
///
/// impl Plan for FadeIn {
///     fn performer_kind(&self) -> PerformerKind { PerformerKind::of::<Fader>() }
/// }
///
/// let plan: PlanRef = std::sync::Arc::new(FadeIn);
/// assert!(plan.downcast_ref::<FadeIn>().is_some());
/// assert_eq!(plan.performer_kind(), PerformerKind::of::<Fader>());
/// ```
pub trait Plan: AsAny + Debug + Send + Sync + 'static {
    /// Returns the capability signature of the performer that executes this plan.
    fn performer_kind(&self) -> PerformerKind;

    /// Returns a short display name used in logs and rejection errors.
    fn plan_name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

impl dyn Plan {
    /// Returns `true` if the plan's concrete type is `P`.
    pub fn is<P: Plan>(&self) -> bool {
        self.as_any().is::<P>()
    }

    /// Returns the plan as `P` if that is its concrete type.
    pub fn downcast_ref<P: Plan>(&self) -> Option<&P> {
        self.as_any().downcast_ref::<P>()
    }
}

/// Downcasts `plan` to `P`, or returns [`PerformError::UnexpectedPlan`] naming `performer`.
///
/// Intended for use at the top of [`Perform::add_plan`](crate::Perform::add_plan):
/// ```ignore
/// let fade = downcast_plan::<Fade>(plan, "Fader")?;
/// ```
pub fn downcast_plan<'a, P: Plan>(
    plan: &'a PlanRef,
    performer: &'static str,
) -> Result<&'a P, PerformError> {
    plan.downcast_ref::<P>()
        .ok_or_else(|| PerformError::UnexpectedPlan {
            performer,
            plan: plan.plan_name(),
        })
}
