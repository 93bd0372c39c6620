//! # motionvisor
//!
//! **Motionvisor** is a small runtime that coordinates interactive motion.
//!
//! Callers describe *what* should happen to a target as [`Plan`]s. The
//! runtime routes every plan to a [`Perform`]er that knows *how* to execute
//! it, keeping exactly one performer per (kind, target) pair. Performers
//! report outstanding work with [`Token`]s; the runtime folds every token
//! into a single active/inactive flag and tells its [`RuntimeDelegate`]
//! whenever that flag flips.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Plan (Fade) │   │ Plan (Spring)│   │  Plan (Drag) │
//!     │  anonymous   │   │ named "snap" │   │ named "drag" │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  MotionRuntime (plan dispatcher)                                  │
//! │  - Registry (one performer per kind × target)                     │
//! │  - NamedPlanIndex (target × name → plan)                          │
//! │  - ActivityAggregator (live token count, delegate)                │
//! │  - TracerSet (fans out to user tracers)                           │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │    Fader     │   │   Springer   │   │   Dragger    │   │
//!     │ (performer)  │   │ (performer)  │   │ (performer)  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ generate()       │ generate()       │ emit_plan()     │
//!      │ terminate()      │ terminate()      │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 ActivityAggregator (live tokens)                  │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼ 0 ↔ 1
//!                       ┌────────────────────────┐
//!                       │   announce_activity    │
//!                       └───┬────────────────┬───┘
//!                           ▼                ▼
//!                  RuntimeDelegate      TracerSet
//!                                  ┌─────────┼─────────┐
//!                                  ▼         ▼         ▼
//!                               tracer1   tracer2   tracerN
//! ```
//!
//! ### Lifecycle of a plan
//! ```text
//! add_plan(plan, target)
//!   ├─► tracers: PlanAdded
//!   ├─► performer = registry[(plan.performer_kind(), target)]
//!   │       └─ missing ─► PerformerKind::create(ctx) ─► PerformerCreated
//!   ├─► performer.add_plan(plan)
//!   │       ├─ Ok  ─► performer generates tokens while it works
//!   │       └─ Err ─► PlanRejected, RuntimeError::PlanRejected
//!   └─► plans emitted by performers meanwhile are dispatched
//!
//! add_plan_named(plan, name, target)
//!   ├─► previous plan "name" on target ─► old performer.remove_plan_named(name)
//!   └─► as above, with performer.add_plan_named(plan, name)
//!
//! remove_plan_named(name, target)
//!   └─► performer.remove_plan_named(name); performer released once idle
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types / traits                          |
//! |-----------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Plans**       | Declarative descriptions of motion bound to a target.        | [`Plan`], [`PlanRef`], [`Target`]           |
//! | **Performers**  | Executors of plans; one per kind and target.                 | [`Perform`], [`PerformerKind`]              |
//! | **Activity**    | Tokens for outstanding work and the aggregate flag.          | [`Token`], [`TokenGenerator`]               |
//! | **Runtime**     | Dispatch, named plans, delegate notification.                | [`MotionRuntime`], [`RuntimeDelegate`]      |
//! | **Tracing**     | Observe every dispatch and state change.                     | [`Trace`], [`Event`]                        |
//! | **Errors**      | Typed errors for dispatch and plan refusal.                  | [`RuntimeError`], [`PerformError`]          |
//! | **Configuration** | Centralize runtime settings.                               | [`RuntimeConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogTracer`] that writes events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use motionvisor::{
//!     MotionRuntime, Perform, PerformError, PerformerContext, PerformerKind, Plan, PlanRef,
//!     RuntimeConfig, Target, Token, TokenGenerator, downcast_plan,
//! };
//!
//! #[derive(Debug)]
//! struct Fade { to: f32 }
//!
//! impl Plan for Fade {
//!     fn performer_kind(&self) -> PerformerKind { PerformerKind::of::<Fader>() }
//! }
//!
//! struct Fader { tokens: TokenGenerator, running: Vec<Token> }
//!
//! impl Perform for Fader {
//!     fn create(ctx: PerformerContext) -> Self {
//!         Self { tokens: ctx.tokens().clone(), running: Vec::new() }
//!     }
//!
//!     fn add_plan(&mut self, plan: &PlanRef) -> Result<(), PerformError> {
//!         let fade = downcast_plan::<Fade>(plan, "Fader")?;
//!         if fade.to > 0.0 {
//!             self.running.push(self.tokens.generate());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! // Build a runtime (tracers are optional)
//! #[cfg(feature = "logging")]
//! let tracers: Vec<Arc<dyn motionvisor::Trace>> = vec![Arc::new(motionvisor::LogTracer::new())];
//! #[cfg(not(feature = "logging"))]
//! let tracers: Vec<Arc<dyn motionvisor::Trace>> = Vec::new();
//!
//! let runtime = MotionRuntime::builder(RuntimeConfig::default().with_label("card"))
//!     .with_tracers(tracers)
//!     .build();
//!
//! let card = Target::new("card");
//! runtime.add_plan(Arc::new(Fade { to: 1.0 }), &card).unwrap();
//! assert!(runtime.is_active());
//! assert_eq!(runtime.performer_count(), 1);
//!
//! // Dropping the runtime releases the performer and its tokens.
//! drop(runtime);
//! ```
mod core;
mod error;
mod events;
mod performers;
mod plans;
mod tracers;

// ---- Public re-exports ----

pub use core::{
    DuplicateTracers, MotionRuntime, PlanEmitter, RuntimeBuilder, RuntimeConfig, RuntimeDelegate,
    Token, TokenGenerator,
};
pub use error::{PerformError, RuntimeError};
pub use events::{Event, EventKind};
pub use performers::{Perform, PerformerContext, PerformerKind};
pub use plans::{AsAny, Plan, PlanRef, Target, TargetId, downcast_plan};
pub use tracers::{Trace, TracerSet};

// Optional: expose a built-in tracer that logs through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use tracers::LogTracer;
