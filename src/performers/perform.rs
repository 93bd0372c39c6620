//! # Performer abstraction.
//!
//! A performer is the imperative side of a plan: a stateful object the runtime
//! creates for one target and one [`PerformerKind`](crate::PerformerKind), then
//! hands every matching plan to.
//!
//! Performers declare outstanding work by generating [`Token`](crate::Token)s
//! through the [`TokenGenerator`](crate::TokenGenerator) in their
//! [`PerformerContext`]; they never manage the runtime's activity flag directly.

use crate::error::PerformError;
use crate::performers::PerformerContext;
use crate::plans::PlanRef;

/// # Executor of plans for one target.
///
/// ### Lifecycle
/// 1. [`create`](Perform::create): on the first plan of this kind for a target.
/// 2. [`add_plan`](Perform::add_plan) / [`add_plan_named`](Perform::add_plan_named):
///    once per dispatched plan.
/// 3. [`remove_plan_named`](Perform::remove_plan_named): when a named plan is removed,
///    or replaced by a plan that runs on another performer.
/// 4. [`release`](Perform::release): once, when no plan needs the performer anymore or
///    the runtime is torn down. The performer is dropped right after.
///
/// ### Implementation requirements
/// - Terminate (or drop) every token that belongs to a removed plan.
/// - Do not call back into the runtime from inside these methods; use the
///   [`PlanEmitter`](crate::PlanEmitter) to add plans. Activity flips caused by
///   tokens are announced after the method returns.
///
/// # Example
/// ```
/// use motionvisor::{
///     Perform, PerformError, PerformerContext, PlanRef, Token, TokenGenerator,
/// };
///
/// struct Pulse {
///     tokens: TokenGenerator,
///     running: Vec<Token>,
/// }
///
/// impl Perform for Pulse {
///     fn create(ctx: PerformerContext) -> Self {
///         Self { tokens: ctx.tokens().clone(), running: Vec::new() }
///     }
///
///     fn add_plan(&mut self, _plan: &PlanRef) -> Result<(), PerformError> {
///         self.running.push(self.tokens.generate());
///         Ok(())
///     }
/// }
/// ```
pub trait Perform: Send + 'static {
    /// Builds the performer for the target carried by `ctx`.
    fn create(ctx: PerformerContext) -> Self
    where
        Self: Sized;

    /// Starts executing an anonymous plan.
    fn add_plan(&mut self, plan: &PlanRef) -> Result<(), PerformError>;

    /// Starts executing a named plan.
    ///
    /// If a plan of the same name already runs on this performer, it must be
    /// replaced here: the runtime does not call
    /// [`remove_plan_named`](Perform::remove_plan_named) first. If the new plan
    /// is refused, the old one keeps running.
    ///
    /// The default refuses with [`PerformError::NamedPlansUnsupported`].
    fn add_plan_named(&mut self, plan: &PlanRef, name: &str) -> Result<(), PerformError> {
        let _ = (plan, name);
        Err(PerformError::NamedPlansUnsupported {
            performer: crate::performers::short_type_name::<Self>(),
        })
    }

    /// Stops the named plan and terminates its tokens. Unknown names are ignored.
    fn remove_plan_named(&mut self, name: &str) {
        let _ = name;
    }

    /// Teardown hook, called once before the performer is dropped.
    ///
    /// Tokens still held are terminated when the performer is dropped; override
    /// this to stop work eagerly.
    fn release(&mut self) {}
}
