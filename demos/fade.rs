//! # Example: fade
//!
//! Demonstrates plans, performers and activity tracking end to end.
//!
//! Shows how to:
//! - Implement the [`Plan`] and [`Perform`] traits.
//! - Hand activity tokens to background work and end them on cancellation.
//! - Replace and remove a named plan.
//! - Observe the runtime with [`LogTracer`] and a [`RuntimeDelegate`].
//!
//! ## Flow
//! ```text
//! add_plan_named(Fade{to: 1.0}, "appear", card)
//!     ├─► LogTracer: [named-plan-added], [performer-created]
//!     ├─► Fader::add_plan_named() ─► token + tokio task
//!     └─► 0 → 1 ─► Watcher: active
//! add_plan_named(Fade{to: 0.5}, "appear", card)
//!     └─► Fader::add_plan_named() ─► previous fade cancelled, new one started
//! task finishes ─► token.terminate() ─► 1 → 0 ─► Watcher: idle
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=motionvisor=debug cargo run --example fade --features logging
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use motionvisor::{
    LogTracer, MotionRuntime, Perform, PerformError, PerformerContext, PerformerKind, Plan,
    PlanRef, RuntimeConfig, RuntimeDelegate, Target, Trace, downcast_plan,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Fade {
    to: f32,
    over: Duration,
}

impl Plan for Fade {
    fn performer_kind(&self) -> PerformerKind {
        PerformerKind::of::<Fader>()
    }
}

/// Fades a card; one running fade per plan name.
struct Fader {
    ctx: PerformerContext,
    running: HashMap<String, CancellationToken>,
}

impl Fader {
    fn start(&self, fade: &Fade) -> CancellationToken {
        let token = self.ctx.tokens().generate();
        let stop = self.ctx.cancellation().child_token();
        let (to, over, child) = (fade.to, fade.over, stop.clone());

        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => println!("[fader] fade to {to} interrupted"),
                _ = tokio::time::sleep(over) => println!("[fader] opacity reached {to}"),
            }
            token.terminate();
        });
        stop
    }
}

impl Perform for Fader {
    fn create(ctx: PerformerContext) -> Self {
        Self {
            ctx,
            running: HashMap::new(),
        }
    }

    fn add_plan(&mut self, plan: &PlanRef) -> Result<(), PerformError> {
        let fade = downcast_plan::<Fade>(plan, "Fader")?;
        let stop = self.start(fade);
        self.running.insert(format!("anon-{}", self.running.len()), stop);
        Ok(())
    }

    fn add_plan_named(&mut self, plan: &PlanRef, name: &str) -> Result<(), PerformError> {
        let fade = downcast_plan::<Fade>(plan, "Fader")?;
        let stop = self.start(fade);
        if let Some(prev) = self.running.insert(name.to_string(), stop) {
            prev.cancel();
        }
        Ok(())
    }

    fn remove_plan_named(&mut self, name: &str) {
        if let Some(stop) = self.running.remove(name) {
            stop.cancel();
        }
    }
}

/// Wakes `main` once the runtime has no work left.
#[derive(Default)]
struct Watcher {
    idle: Notify,
}

impl RuntimeDelegate for Watcher {
    fn activity_state_did_change(&self, runtime: &MotionRuntime) {
        if runtime.is_active() {
            println!("[watcher] runtime active");
        } else {
            println!("[watcher] runtime idle");
            self.idle.notify_one();
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let watcher = Arc::new(Watcher::default());
    let tracers: Vec<Arc<dyn Trace>> = vec![Arc::new(LogTracer::new())];
    let runtime = MotionRuntime::builder(RuntimeConfig::default().with_label("card-demo"))
        .with_tracers(tracers)
        .with_delegate(&watcher)
        .build();

    let card = Target::new("card");

    runtime.add_plan_named(
        Arc::new(Fade {
            to: 1.0,
            over: Duration::from_millis(400),
        }),
        "appear",
        &card,
    )?;

    tokio::time::sleep(Duration::from_millis(100)).await;

    // Same name: the Fader swaps the running fade for the new one.
    runtime.add_plan_named(
        Arc::new(Fade {
            to: 0.5,
            over: Duration::from_millis(200),
        }),
        "appear",
        &card,
    )?;

    // The interrupted fade may end its token before the new one starts.
    loop {
        watcher.idle.notified().await;
        if !runtime.is_active() {
            break;
        }
    }
    println!(
        "[main] named plans on card: {:?}",
        runtime.named_plans(&card)
    );

    runtime.remove_plan_named("appear", &card);
    println!("[main] performers left: {}", runtime.performer_count());
    Ok(())
}
