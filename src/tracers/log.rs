//! # LogTracer: forwards runtime events to `tracing`
//!
//! A minimal tracer that turns every [`Event`] into a structured `tracing`
//! event under the `motionvisor` target. Install a `tracing` subscriber to see
//! the output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO motionvisor: [plan-added] seq=3 on=target@0x6000023c8010 plan=Fade { to: 1.0 }
//! INFO motionvisor: [performer-created] seq=4 on=target@0x6000023c8010 performer="Fader"
//! INFO motionvisor: [activity] seq=5 active=true
//! INFO motionvisor: [named-plan-removed] seq=9 on=target@0x6000023c8010 name="drag" reason="removed"
//! WARN motionvisor: [plan-rejected] seq=12 on=target@0x6000023c8010 performer="Fader" reason="perform_unexpected_plan"
//! ```

use crate::events::{Event, EventKind};
use crate::tracers::Trace;

/// Event writer tracer.
#[derive(Default)]
pub struct LogTracer;

impl LogTracer {
    /// Construct a new [`LogTracer`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Trace for LogTracer {
    fn on_event(&self, e: &Event) {
        let on = e.target.map(|t| t.to_string()).unwrap_or_default();
        match e.kind {
            EventKind::PlanAdded => {
                tracing::info!(target: "motionvisor", seq = e.seq, on = %on, plan = ?e.plan, "[plan-added]");
            }
            EventKind::NamedPlanAdded => {
                tracing::info!(
                    target: "motionvisor",
                    seq = e.seq,
                    on = %on,
                    name = e.name.as_deref().unwrap_or("unknown"),
                    plan = ?e.plan,
                    "[named-plan-added]"
                );
            }
            EventKind::NamedPlanRemoved => {
                tracing::info!(
                    target: "motionvisor",
                    seq = e.seq,
                    on = %on,
                    name = e.name.as_deref().unwrap_or("unknown"),
                    reason = e.reason.as_deref().unwrap_or("removed"),
                    "[named-plan-removed]"
                );
            }
            EventKind::PlanRejected => {
                tracing::warn!(
                    target: "motionvisor",
                    seq = e.seq,
                    on = %on,
                    performer = e.performer.unwrap_or("unknown"),
                    reason = e.reason.as_deref().unwrap_or("unknown"),
                    "[plan-rejected]"
                );
            }
            EventKind::PerformerCreated => {
                tracing::info!(
                    target: "motionvisor",
                    seq = e.seq,
                    on = %on,
                    performer = e.performer.unwrap_or("unknown"),
                    "[performer-created]"
                );
            }
            EventKind::PerformerReleased => {
                tracing::info!(
                    target: "motionvisor",
                    seq = e.seq,
                    on = %on,
                    performer = e.performer.unwrap_or("unknown"),
                    "[performer-released]"
                );
            }
            EventKind::ActivityChanged => {
                tracing::info!(target: "motionvisor", seq = e.seq, active = ?e.active, "[activity]");
            }
            EventKind::TracerPanicked => {
                tracing::error!(
                    target: "motionvisor",
                    seq = e.seq,
                    tracer = e.tracer.unwrap_or("unknown"),
                    info = e.reason.as_deref().unwrap_or("unknown"),
                    "[tracer-panicked]"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogTracer"
    }
}
