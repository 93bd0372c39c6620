//! # MotionRuntime: dispatches plans to performers and aggregates their activity.
//!
//! The [`MotionRuntime`] owns the performer registry, the named-plan index,
//! the tracer set and the activity aggregator. It is the only component that
//! mutates them, always in response to a public call.
//!
//! ## Key responsibilities
//! - resolve (create or reuse) the performer for a plan's kind on a target
//! - replace and remove named plans, one record per (target, name)
//! - release performers no plan needs anymore
//! - announce activity flips to tracers and the delegate
//!
//! ## Dispatch
//! ```text
//! add_plan(plan, target) / add_plan_named(plan, name, target)
//!   ├─► [named, other performer] NamedPlanIndex.remove(target, name)
//!   │         └─► old performer.remove_plan_named(name)   → NamedPlanRemoved{replaced}
//!   │             └─► release old performer if idle
//!   ├─► TracerSet.emit(PlanAdded | NamedPlanAdded)          (notify, then dispatch)
//!   ├─► Registry.get(kind, target) or kind.create(ctx)     → PerformerCreated
//!   ├─► performer.add_plan(plan) / add_plan_named(plan, name)
//!   │       ├─ Ok  ─► retain plan reference (+ NamedPlanIndex.put)
//!   │       └─ Err ─► PlanRejected, release performer if idle, return error
//!   └─► outermost call only: drain deferred work, in order
//!           ├─ Activity(active) ─► ActivityChanged + delegate callback
//!           └─ Plan(plan, target) ─► dispatch (emitted by a performer)
//!
//! Token flips (any context):
//!   TokenGenerator::generate / Token::terminate ─► ActivityAggregator
//!       └─► 0↔1 ─► deferred Activity(active) ─► drained by the outermost call,
//!                  or right away when no call is in progress
//! ```
//!
//! ## Rules
//! - No internal lock is held while a tracer or the delegate runs; both may
//!   call back into the runtime.
//! - Replacing a named plan on the same performer is left to the performer's
//!   `add_plan_named`; `remove_plan_named` is only sent to a different performer.
//! - Removal of an unknown name and removal of an unregistered tracer are no-ops.
//! - Dropping the runtime releases every performer; a pending true→false flip
//!   is announced before the drop completes.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::activity::ActivityAggregator;
use crate::core::named::{NamedPlanIndex, NamedRecord};
use crate::core::registry::{Entry, PerformerCell, PerformerKey, Registry};
use crate::core::{PlanEmitter, RuntimeBuilder, RuntimeConfig, RuntimeDelegate};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::performers::PerformerContext;
use crate::plans::{PlanRef, Target};
use crate::tracers::{Trace, TracerSet};

/// Work postponed until no performer is mid-call.
enum Deferred {
    /// A plan emitted by a performer.
    Plan(PlanRef, Target),
    /// An activity flip, with the state it flipped to.
    Activity(bool),
}

/// Mediates between plans and performers for one interaction.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use motionvisor::{
///     MotionRuntime, Perform, PerformError, PerformerContext, PerformerKind, Plan, PlanRef,
///     Target, Token, TokenGenerator,
/// };
///
/// #[derive(Debug)]
/// struct Fade { to: f32 }
///
/// struct Fader { tokens: TokenGenerator, running: Option<Token> }
///
/// impl Perform for Fader {
///     fn create(ctx: PerformerContext) -> Self {
///         Self { tokens: ctx.tokens().clone(), running: None }
///     }
///     fn add_plan(&mut self, _plan: &PlanRef) -> Result<(), PerformError> {
///         self.running = Some(self.tokens.generate());
///         Ok(())
///     }
/// }
///
/// impl Plan for Fade {
///     fn performer_kind(&self) -> PerformerKind { PerformerKind::of::<Fader>() }
/// }
///
/// let runtime = MotionRuntime::new();
/// let view = Target::new("view");
///
/// runtime.add_plan(Arc::new(Fade { to: 1.0 }), &view).unwrap();
/// assert!(runtime.is_active());
///
/// runtime.teardown();
/// assert!(!runtime.is_active());
/// ```
pub struct MotionRuntime {
    cfg: RuntimeConfig,
    tracers: TracerSet,
    registry: Registry,
    named: Mutex<NamedPlanIndex>,
    activity: Arc<ActivityAggregator>,
    deferred: Mutex<VecDeque<Deferred>>,
    depth: AtomicUsize,
    root: CancellationToken,
    me: Weak<MotionRuntime>,
}

impl MotionRuntime {
    /// Creates a runtime with the default configuration.
    pub fn new() -> Arc<Self> {
        RuntimeBuilder::new(RuntimeConfig::default()).build()
    }

    /// Returns a builder for a runtime with the given configuration.
    pub fn builder(cfg: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: RuntimeConfig,
        tracers: Vec<Arc<dyn Trace>>,
        delegate: Option<Weak<dyn RuntimeDelegate>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| {
            let activity = ActivityAggregator::new(me.clone());
            activity.set_delegate(delegate);

            let set = TracerSet::new(cfg.duplicate_tracers);
            for tracer in tracers {
                set.add(tracer);
            }

            Self {
                cfg,
                tracers: set,
                registry: Registry::new(),
                named: Mutex::new(NamedPlanIndex::new()),
                activity,
                deferred: Mutex::new(VecDeque::new()),
                depth: AtomicUsize::new(0),
                root: CancellationToken::new(),
                me: me.clone(),
            }
        })
    }

    /// Returns the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.cfg
    }

    // ---------------------------
    // Plans
    // ---------------------------

    /// Associates a plan with a target.
    ///
    /// Tracers are notified before the plan reaches its performer. Fails only
    /// if the performer refuses the plan.
    pub fn add_plan(&self, plan: PlanRef, target: &Target) -> Result<(), RuntimeError> {
        self.in_dispatch(|| self.dispatch(plan, None, target))
    }

    /// Associates plans with a target, in order.
    ///
    /// Not atomic: stops at the first refused plan and leaves the plans before
    /// it dispatched.
    pub fn add_plans<I>(&self, plans: I, target: &Target) -> Result<(), RuntimeError>
    where
        I: IntoIterator<Item = PlanRef>,
    {
        self.in_dispatch(|| {
            plans
                .into_iter()
                .try_for_each(|plan| self.dispatch(plan, None, target))
        })
    }

    /// Associates a named plan with a target, replacing any plan of that name.
    ///
    /// If the previous plan of that name runs on a different performer, it is
    /// removed from it before the new one is dispatched. On the same performer,
    /// `add_plan_named` itself replaces it.
    pub fn add_plan_named(
        &self,
        plan: PlanRef,
        name: &str,
        target: &Target,
    ) -> Result<(), RuntimeError> {
        if name.is_empty() {
            return Err(RuntimeError::EmptyPlanName);
        }
        self.in_dispatch(|| self.dispatch(plan, Some(Arc::from(name)), target))
    }

    /// Removes the plan with the given name from the target. No-op if absent.
    pub fn remove_plan_named(&self, name: &str, target: &Target) {
        self.in_dispatch(|| {
            let Some(record) = self.named.lock().remove(target.id(), name) else {
                return;
            };
            let key = record.performer;
            self.retire(record, name, target, "removed");
            self.release_if_idle(&key);
        });
    }

    /// Sorted names of the plans currently running on `target`.
    pub fn named_plans(&self, target: &Target) -> Vec<String> {
        self.named.lock().names(target.id())
    }

    /// The plan currently registered under `name` on `target`.
    pub fn named_plan(&self, name: &str, target: &Target) -> Option<PlanRef> {
        self.named
            .lock()
            .get(target.id(), name)
            .map(|r| Arc::clone(&r.plan))
    }

    // ---------------------------
    // Tracing
    // ---------------------------

    /// Registers a tracer. The runtime holds it strongly until it is removed.
    pub fn add_tracer(&self, tracer: Arc<dyn Trace>) {
        if !self.tracers.add(tracer) {
            tracing::debug!(runtime = self.cfg.label(), "tracer already registered");
        }
    }

    /// Removes a tracer. Does nothing if it is not registered.
    pub fn remove_tracer<T: Trace + ?Sized>(&self, tracer: &Arc<T>) {
        self.tracers.remove(tracer);
    }

    /// Registered tracers, in registration order.
    pub fn tracers(&self) -> Vec<Arc<dyn Trace>> {
        self.tracers.snapshot()
    }

    // ---------------------------
    // State
    // ---------------------------

    /// Whether at least one performer holds a live token.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.activity.is_active()
    }

    /// Number of live tokens across all performers.
    pub fn live_tokens(&self) -> usize {
        self.activity.live()
    }

    /// Number of live performers.
    pub fn performer_count(&self) -> usize {
        self.registry.len()
    }

    /// Installs the delegate, replacing the previous one. Only a weak reference is kept.
    pub fn set_delegate<D: RuntimeDelegate + 'static>(&self, delegate: &Arc<D>) {
        let weak = Arc::downgrade(delegate);
        let weak: Weak<dyn RuntimeDelegate> = weak;
        self.activity.set_delegate(Some(weak));
    }

    /// Removes the delegate.
    pub fn clear_delegate(&self) {
        self.activity.set_delegate(None);
    }

    /// The current delegate, if one is installed and still alive.
    pub fn delegate(&self) -> Option<Arc<dyn RuntimeDelegate>> {
        self.activity.delegate()
    }

    /// Releases every performer and forgets every named plan.
    ///
    /// Performers' tokens are terminated, so the runtime ends inactive unless a
    /// performer leaked a token elsewhere. Plans emitted while performers are
    /// released are dropped; activity flips are still announced. The runtime
    /// stays usable.
    pub fn teardown(&self) {
        self.in_dispatch(|| {
            let entries = self.registry.drain();
            self.named.lock().clear();
            for entry in entries {
                self.release_entry(entry);
            }
            self.deferred
                .lock()
                .retain(|work| matches!(work, Deferred::Activity(_)));
        });
    }

    // ---------------------------
    // Internals
    // ---------------------------

    fn dispatch(
        &self,
        plan: PlanRef,
        name: Option<Arc<str>>,
        target: &Target,
    ) -> Result<(), RuntimeError> {
        let kind = plan.performer_kind();
        let key = PerformerKey::new(kind, target);

        if let Some(name) = &name {
            let replaced = {
                let mut named = self.named.lock();
                let elsewhere = named
                    .get(target.id(), name)
                    .is_some_and(|old| old.performer != key);
                if elsewhere {
                    named.remove(target.id(), name)
                } else {
                    None
                }
            };
            if let Some(old) = replaced {
                let old_key = old.performer;
                self.retire(old, name, target, "replaced");
                self.release_if_idle(&old_key);
            }
        }

        let added = match &name {
            Some(n) => Event::new(EventKind::NamedPlanAdded).with_name(Arc::clone(n)),
            None => Event::new(EventKind::PlanAdded),
        };
        self.tracers
            .emit(&added.with_target(target.id()).with_plan(Arc::clone(&plan)));

        tracing::debug!(
            runtime = self.cfg.label(),
            on = %target.id(),
            performer = kind.name(),
            name = name.as_deref(),
            "dispatching plan"
        );

        let result = {
            let performer = self.resolve(key, target);
            let mut performer = performer.lock();
            match &name {
                Some(n) => performer.add_plan_named(&plan, n),
                None => performer.add_plan(&plan),
            }
        };

        match result {
            Ok(()) => {
                match name {
                    Some(name) => {
                        self.registry.retain_named(&key, &name);
                        let displaced = self.named.lock().put(
                            target.id(),
                            Arc::clone(&name),
                            NamedRecord {
                                plan,
                                performer: key,
                            },
                        );
                        if displaced.is_some() {
                            self.tracers.emit(
                                &Event::new(EventKind::NamedPlanRemoved)
                                    .with_target(target.id())
                                    .with_name(name)
                                    .with_performer(kind.name())
                                    .with_reason("replaced"),
                            );
                        }
                    }
                    None => self.registry.retain_anonymous(&key),
                }
                Ok(())
            }
            Err(source) => {
                tracing::warn!(
                    runtime = self.cfg.label(),
                    on = %target.id(),
                    performer = kind.name(),
                    error = %source,
                    "plan rejected"
                );
                let mut ev = Event::new(EventKind::PlanRejected)
                    .with_target(target.id())
                    .with_plan(plan)
                    .with_performer(kind.name())
                    .with_reason(source.as_label());
                if let Some(name) = name {
                    ev = ev.with_name(name);
                }
                self.tracers.emit(&ev);
                self.release_if_idle(&key);
                Err(RuntimeError::PlanRejected {
                    performer: kind.name(),
                    source,
                })
            }
        }
    }

    /// Returns the live performer for `key`, creating it on first use.
    fn resolve(&self, key: PerformerKey, target: &Target) -> PerformerCell {
        if let Some(existing) = self.registry.get(&key) {
            return existing;
        }

        let cancel = self.root.child_token();
        let ctx = PerformerContext::new(
            target.clone(),
            self.activity.generator(key.kind.name()),
            PlanEmitter::new(self.me.clone()),
            cancel.clone(),
        );
        let performer = key.kind.create(ctx);

        let (cell, duplicate) = self
            .registry
            .insert(Entry::new(key, target.clone(), performer, cancel));
        match duplicate {
            Some(dup) => dup.release(),
            None => {
                tracing::debug!(
                    runtime = self.cfg.label(),
                    on = %target.id(),
                    performer = key.kind.name(),
                    "performer created"
                );
                self.tracers.emit(
                    &Event::new(EventKind::PerformerCreated)
                        .with_target(target.id())
                        .with_performer(key.kind.name()),
                );
            }
        }
        cell
    }

    /// Tells the record's performer to stop the named plan.
    fn retire(&self, record: NamedRecord, name: &str, target: &Target, reason: &'static str) {
        let key = record.performer;
        if let Some(performer) = self.registry.get(&key) {
            performer.lock().remove_plan_named(name);
        }
        self.registry.forget_named(&key, name);

        tracing::debug!(
            runtime = self.cfg.label(),
            on = %target.id(),
            name,
            reason,
            "named plan removed"
        );
        self.tracers.emit(
            &Event::new(EventKind::NamedPlanRemoved)
                .with_target(target.id())
                .with_name(name)
                .with_performer(key.kind.name())
                .with_reason(reason),
        );
    }

    fn release_if_idle(&self, key: &PerformerKey) {
        if !self.cfg.release_idle_performers {
            return;
        }
        if let Some(entry) = self.registry.take_if_idle(key) {
            self.release_entry(entry);
        }
    }

    fn release_entry(&self, entry: Entry) {
        let on = entry.target.id();
        let performer = entry.key.kind.name();
        entry.release();

        tracing::debug!(runtime = self.cfg.label(), on = %on, performer, "performer released");
        self.tracers.emit(
            &Event::new(EventKind::PerformerReleased)
                .with_target(on)
                .with_performer(performer),
        );
    }

    /// Runs `f` as a dispatch; the outermost one drains deferred work.
    fn in_dispatch<R>(&self, f: impl FnOnce() -> R) -> R {
        let out = {
            let scope = DispatchScope::enter(&self.depth);
            let out = f();
            if scope.outermost {
                self.drain_deferred();
            }
            out
        };
        // Work deferred by another thread after the drain above.
        while self.depth.load(Ordering::SeqCst) == 0 && !self.deferred.lock().is_empty() {
            let _scope = DispatchScope::enter(&self.depth);
            self.drain_deferred();
        }
        out
    }

    fn drain_deferred(&self) {
        loop {
            let next = self.deferred.lock().pop_front();
            match next {
                Some(Deferred::Activity(active)) => self.announce_activity(active),
                Some(Deferred::Plan(plan, target)) => {
                    if let Err(err) = self.dispatch(plan, None, &target) {
                        tracing::warn!(runtime = self.cfg.label(), error = %err, "emitted plan rejected");
                    }
                }
                None => break,
            }
        }
    }

    /// Queues `work`; runs it right away when no dispatch is in progress.
    fn defer(&self, work: Deferred) {
        self.deferred.lock().push_back(work);
        if self.depth.load(Ordering::SeqCst) == 0 {
            self.in_dispatch(|| ());
        }
    }

    pub(crate) fn enqueue_emitted(&self, plan: PlanRef, target: Target) {
        self.defer(Deferred::Plan(plan, target));
    }

    /// Records an activity flip seen by the aggregator.
    pub(crate) fn activity_flipped(&self, active: bool) {
        self.defer(Deferred::Activity(active));
    }

    /// Reports an activity flip to tracers and the delegate.
    fn announce_activity(&self, active: bool) {
        tracing::debug!(runtime = self.cfg.label(), active, "activity changed");
        self.tracers
            .emit(&Event::new(EventKind::ActivityChanged).with_active(active));
        if let Some(delegate) = self.activity.delegate() {
            delegate.activity_state_did_change(self);
        }
    }
}

impl Drop for MotionRuntime {
    fn drop(&mut self) {
        self.teardown();
        self.root.cancel();
        for active in self.activity.take_parked() {
            self.announce_activity(active);
        }
    }
}

impl fmt::Debug for MotionRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionRuntime")
            .field("label", &self.cfg.label())
            .field("active", &self.is_active())
            .field("performers", &self.performer_count())
            .field("named_plans", &self.named.lock().len())
            .field("tracers", &self.tracers.len())
            .finish()
    }
}

/// Nesting counter for dispatches in progress.
struct DispatchScope<'a> {
    depth: &'a AtomicUsize,
    outermost: bool,
}

impl<'a> DispatchScope<'a> {
    fn enter(depth: &'a AtomicUsize) -> Self {
        let outermost = depth.fetch_add(1, Ordering::SeqCst) == 0;
        Self { depth, outermost }
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use crate::core::Token;
    use crate::error::PerformError;
    use crate::performers::{Perform, PerformerKind};
    use crate::plans::{Plan, downcast_plan};

    /// Target payload that lets tests observe the performers acting on it.
    #[derive(Default)]
    struct Probe {
        created: AtomicUsize,
        released: AtomicUsize,
        removed: Mutex<Vec<String>>,
        emitter: Mutex<Option<PlanEmitter>>,
    }

    fn probe(target: &Target) -> Arc<Probe> {
        target.downcast::<Probe>().expect("probe target")
    }

    fn target() -> Target {
        Target::new(Probe::default())
    }

    #[derive(Debug)]
    struct Fade {
        hold: bool,
    }

    #[derive(Debug)]
    struct Slide;

    #[derive(Debug)]
    struct Spin;

    #[derive(Debug)]
    struct Spring;

    #[derive(Debug)]
    struct Nudge;

    impl Plan for Fade {
        fn performer_kind(&self) -> PerformerKind {
            PerformerKind::of::<Fader>()
        }
    }

    impl Plan for Slide {
        fn performer_kind(&self) -> PerformerKind {
            PerformerKind::of::<Fader>()
        }
    }

    impl Plan for Spin {
        fn performer_kind(&self) -> PerformerKind {
            PerformerKind::of::<Fader>()
        }
    }

    impl Plan for Spring {
        fn performer_kind(&self) -> PerformerKind {
            PerformerKind::of::<Springer>()
        }
    }

    impl Plan for Nudge {
        fn performer_kind(&self) -> PerformerKind {
            PerformerKind::of::<Nudger>()
        }
    }

    /// Runs fades and slides; a held fade or any slide keeps a token.
    struct Fader {
        ctx: PerformerContext,
        running: Vec<Token>,
        named: HashMap<String, Token>,
    }

    impl Fader {
        fn start(&mut self, plan: &PlanRef) -> Result<Option<Token>, PerformError> {
            if let Some(fade) = plan.downcast_ref::<Fade>() {
                return Ok(fade.hold.then(|| self.ctx.tokens().generate()));
            }
            downcast_plan::<Slide>(plan, "Fader")?;
            Ok(Some(self.ctx.tokens().generate()))
        }
    }

    impl Perform for Fader {
        fn create(ctx: PerformerContext) -> Self {
            probe(ctx.target()).created.fetch_add(1, Ordering::SeqCst);
            Self {
                ctx,
                running: Vec::new(),
                named: HashMap::new(),
            }
        }

        fn add_plan(&mut self, plan: &PlanRef) -> Result<(), PerformError> {
            let token = self.start(plan)?;
            self.running.extend(token);
            Ok(())
        }

        fn add_plan_named(&mut self, plan: &PlanRef, name: &str) -> Result<(), PerformError> {
            match self.start(plan)? {
                Some(token) => self.named.insert(name.to_string(), token),
                None => self.named.remove(name),
            };
            Ok(())
        }

        fn remove_plan_named(&mut self, name: &str) {
            probe(self.ctx.target()).removed.lock().push(name.to_string());
            self.named.remove(name);
        }

        fn release(&mut self) {
            probe(self.ctx.target()).released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Accepts named plans only.
    struct Springer {
        ctx: PerformerContext,
        named: HashMap<String, Token>,
    }

    impl Perform for Springer {
        fn create(ctx: PerformerContext) -> Self {
            probe(ctx.target()).created.fetch_add(1, Ordering::SeqCst);
            Self {
                ctx,
                named: HashMap::new(),
            }
        }

        fn add_plan(&mut self, _plan: &PlanRef) -> Result<(), PerformError> {
            Err(PerformError::Refused {
                performer: "Springer",
                reason: "springs run under a name".into(),
            })
        }

        fn add_plan_named(&mut self, _plan: &PlanRef, name: &str) -> Result<(), PerformError> {
            self.named
                .insert(name.to_string(), self.ctx.tokens().generate());
            Ok(())
        }

        fn remove_plan_named(&mut self, name: &str) {
            probe(self.ctx.target()).removed.lock().push(name.to_string());
            self.named.remove(name);
        }

        fn release(&mut self) {
            probe(self.ctx.target()).released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Does no work itself; hands a held fade back to the runtime.
    struct Nudger {
        ctx: PerformerContext,
    }

    impl Perform for Nudger {
        fn create(ctx: PerformerContext) -> Self {
            let probe = probe(ctx.target());
            probe.created.fetch_add(1, Ordering::SeqCst);
            *probe.emitter.lock() = Some(ctx.emitter().clone());
            Self { ctx }
        }

        fn add_plan(&mut self, _plan: &PlanRef) -> Result<(), PerformError> {
            let follow_up: PlanRef = Arc::new(Fade { hold: true });
            self.ctx.emitter().emit_plan(follow_up, self.ctx.target());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().iter().map(|e| e.kind).collect()
        }

        fn count(&self, kind: EventKind) -> usize {
            self.events.lock().iter().filter(|e| e.kind == kind).count()
        }
    }

    impl Trace for Recorder {
        fn on_event(&self, event: &Event) {
            self.events.lock().push(event.clone());
        }
    }

    #[derive(Default)]
    struct Flips {
        seen: Mutex<Vec<bool>>,
    }

    impl RuntimeDelegate for Flips {
        fn activity_state_did_change(&self, runtime: &MotionRuntime) {
            self.seen.lock().push(runtime.is_active());
        }
    }

    fn runtime_with(flips: &Arc<Flips>, recorder: &Arc<Recorder>) -> Arc<MotionRuntime> {
        let tracer: Arc<dyn Trace> = recorder.clone();
        MotionRuntime::builder(RuntimeConfig::default())
            .with_tracers(vec![tracer])
            .with_delegate(flips)
            .build()
    }

    #[test]
    fn test_active_follows_live_tokens_and_delegate_fires_per_flip() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        rt.add_plan(Arc::new(Fade { hold: true }), &view).unwrap();
        assert!(rt.is_active());
        assert_eq!(rt.live_tokens(), 1);

        rt.add_plan(Arc::new(Fade { hold: true }), &view).unwrap();
        assert_eq!(rt.live_tokens(), 2);
        assert_eq!(*flips.seen.lock(), vec![true], "second token is not a flip");

        rt.teardown();
        assert!(!rt.is_active());
        assert_eq!(rt.live_tokens(), 0);
        assert_eq!(*flips.seen.lock(), vec![true, false]);
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 1);
        assert_eq!(rec.count(EventKind::ActivityChanged), 2);
    }

    #[test]
    fn test_plan_without_work_leaves_runtime_inactive() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        rt.add_plan(Arc::new(Fade { hold: false }), &view).unwrap();

        assert_eq!(rt.performer_count(), 1);
        assert!(!rt.is_active());
        assert!(flips.seen.lock().is_empty());
        assert_eq!(
            rec.kinds(),
            vec![EventKind::PlanAdded, EventKind::PerformerCreated]
        );
    }

    #[test]
    fn test_compatible_plans_share_one_performer_per_target() {
        let rt = MotionRuntime::new();
        let card = target();
        let sheet = target();

        rt.add_plan(Arc::new(Fade { hold: true }), &card).unwrap();
        rt.add_plan(Arc::new(Slide), &card).unwrap();
        rt.add_plan(Arc::new(Slide), &sheet).unwrap();

        assert_eq!(probe(&card).created.load(Ordering::SeqCst), 1);
        assert_eq!(probe(&sheet).created.load(Ordering::SeqCst), 1);
        assert_eq!(rt.performer_count(), 2);
        assert_eq!(rt.live_tokens(), 3);
    }

    #[test]
    fn test_add_plans_stops_at_first_rejection_without_rollback() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        let plans: Vec<PlanRef> = vec![
            Arc::new(Fade { hold: true }),
            Arc::new(Spin),
            Arc::new(Slide),
        ];
        let err = rt.add_plans(plans, &view).unwrap_err();

        assert!(matches!(
            err,
            RuntimeError::PlanRejected {
                performer: "Fader",
                source: PerformError::UnexpectedPlan { plan: "Spin", .. },
            }
        ));
        assert_eq!(rt.live_tokens(), 1, "the fade stays, the slide never ran");
        assert_eq!(rt.performer_count(), 1);
        assert_eq!(rec.count(EventKind::PlanAdded), 2);

        let events = rec.events.lock();
        let rejected = events
            .iter()
            .find(|e| e.kind == EventKind::PlanRejected)
            .expect("rejection traced");
        assert_eq!(rejected.performer, Some("Fader"));
        assert_eq!(rejected.reason.as_deref(), Some("perform_unexpected_plan"));
    }

    #[test]
    fn test_refused_first_plan_releases_the_fresh_performer() {
        let rt = MotionRuntime::new();
        let view = target();

        let err = rt.add_plan(Arc::new(Spring), &view).unwrap_err();

        assert_eq!(err.as_label(), "runtime_plan_rejected");
        assert_eq!(rt.performer_count(), 0);
        assert_eq!(probe(&view).created.load(Ordering::SeqCst), 1);
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_named_plan_needs_a_name_and_a_willing_performer() {
        let rt = MotionRuntime::new();
        let view = target();

        let err = rt.add_plan_named(Arc::new(Spring), "", &view).unwrap_err();
        assert!(matches!(err, RuntimeError::EmptyPlanName));
        assert_eq!(probe(&view).created.load(Ordering::SeqCst), 0);

        let err = rt.add_plan_named(Arc::new(Nudge), "nudge", &view).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::PlanRejected {
                source: PerformError::NamedPlansUnsupported { performer: "Nudger" },
                ..
            }
        ));
        assert!(rt.named_plans(&view).is_empty());
        assert_eq!(rt.performer_count(), 0);
    }

    #[test]
    fn test_adding_a_name_twice_keeps_one_record() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        let first: PlanRef = Arc::new(Fade { hold: true });
        let second: PlanRef = Arc::new(Fade { hold: true });
        rt.add_plan_named(first, "foo", &view).unwrap();
        rt.add_plan_named(Arc::clone(&second), "foo", &view).unwrap();

        assert_eq!(rt.named_plans(&view), vec!["foo".to_string()]);
        let current = rt.named_plan("foo", &view).expect("record for foo");
        assert!(Arc::ptr_eq(&current, &second));
        assert!(
            probe(&view).removed.lock().is_empty(),
            "the performer replaces its own plan"
        );
        assert_eq!(probe(&view).created.load(Ordering::SeqCst), 1);
        assert_eq!(rt.live_tokens(), 1);
        assert_eq!(*flips.seen.lock(), vec![true], "no flip through inactive");

        let kinds = rec.kinds();
        assert_eq!(
            kinds[kinds.len() - 2..],
            [EventKind::NamedPlanAdded, EventKind::NamedPlanRemoved]
        );
        let events = rec.events.lock();
        let removed = events.last().expect("replacement traced");
        assert_eq!(removed.reason.as_deref(), Some("replaced"));
        assert_eq!(removed.name.as_deref(), Some("foo"));
        assert_eq!(removed.performer, Some("Fader"));
    }

    #[test]
    fn test_refused_replacement_keeps_the_running_plan() {
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&Arc::new(Flips::default()), &rec);
        let view = target();

        let first: PlanRef = Arc::new(Fade { hold: true });
        rt.add_plan_named(Arc::clone(&first), "foo", &view).unwrap();
        let err = rt.add_plan_named(Arc::new(Spin), "foo", &view).unwrap_err();

        assert_eq!(err.as_label(), "runtime_plan_rejected");
        let current = rt.named_plan("foo", &view).expect("record for foo");
        assert!(Arc::ptr_eq(&current, &first));
        assert_eq!(rt.live_tokens(), 1);
        assert_eq!(rt.performer_count(), 1);
        assert_eq!(rec.count(EventKind::NamedPlanRemoved), 0);
    }

    #[test]
    fn test_replace_with_other_performer_then_remove() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        rt.add_plan_named(Arc::new(Fade { hold: true }), "foo", &view)
            .unwrap();
        rt.add_plan_named(Arc::new(Spring), "foo", &view).unwrap();

        assert_eq!(rt.performer_count(), 1, "the idle fader was released");
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 1);
        assert!(rt.is_active());

        let before = flips.seen.lock().len();
        rt.remove_plan_named("foo", &view);

        assert!(rt.named_plans(&view).is_empty());
        assert!(rt.named_plan("foo", &view).is_none());
        assert!(!rt.is_active());
        assert_eq!(flips.seen.lock()[before..], [false]);
        assert_eq!(rt.performer_count(), 0);
        assert_eq!(rec.count(EventKind::PerformerReleased), 2);
    }

    #[test]
    fn test_removing_unknown_name_is_a_noop() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        rt.remove_plan_named("never-added", &view);
        assert!(rec.kinds().is_empty());

        rt.add_plan_named(Arc::new(Spring), "snap", &view).unwrap();
        let seen = rec.kinds().len();
        rt.remove_plan_named("never-added", &view);

        assert_eq!(rec.kinds().len(), seen);
        assert!(rt.is_active());
        assert_eq!(*flips.seen.lock(), vec![true]);
        assert_eq!(rt.named_plans(&view), vec!["snap".to_string()]);
    }

    #[test]
    fn test_removed_tracer_receives_nothing_afterwards() {
        let flips = Arc::new(Flips::default());
        let first = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &first);
        let view = target();

        let second = Arc::new(Recorder::default());
        rt.add_tracer(second.clone());
        rt.add_tracer(second.clone());
        assert_eq!(rt.tracers().len(), 2, "duplicate registration ignored");

        rt.add_plan(Arc::new(Fade { hold: false }), &view).unwrap();
        let delivered = second.kinds();

        rt.remove_tracer(&second);
        rt.remove_tracer(&second);
        rt.add_plan(Arc::new(Slide), &view).unwrap();

        assert_eq!(second.kinds(), delivered);
        assert_eq!(
            delivered,
            vec![EventKind::PlanAdded, EventKind::PerformerCreated]
        );
        assert_eq!(first.count(EventKind::PlanAdded), 2);

        let tracers = rt.tracers();
        assert_eq!(tracers.len(), 1);
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(&tracers[0]),
            Arc::as_ptr(&first)
        ));
    }

    #[test]
    fn test_drop_releases_performers_and_announces_the_pending_flip() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        rt.add_plan(Arc::new(Fade { hold: true }), &view).unwrap();
        rt.add_plan_named(Arc::new(Spring), "snap", &view).unwrap();
        drop(rt);

        assert_eq!(*flips.seen.lock(), vec![true, false]);
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 2);
        assert_eq!(rec.kinds().last(), Some(&EventKind::ActivityChanged));
        assert_eq!(rec.events.lock().last().and_then(|e| e.active), Some(false));
    }

    #[test]
    fn test_emitted_plans_run_after_the_emitting_dispatch() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        rt.add_plan(Arc::new(Nudge), &view).unwrap();

        assert_eq!(
            rec.kinds(),
            vec![
                EventKind::PlanAdded,
                EventKind::PerformerCreated,
                EventKind::PlanAdded,
                EventKind::PerformerCreated,
                EventKind::ActivityChanged,
            ]
        );
        assert_eq!(rt.performer_count(), 2);
        assert!(rt.is_active());
    }

    #[test]
    fn test_emitter_outside_dispatch_and_after_drop() {
        let rt = MotionRuntime::new();
        let view = target();
        rt.add_plan(Arc::new(Nudge), &view).unwrap();

        let emitter = probe(&view)
            .emitter
            .lock()
            .clone()
            .expect("nudger kept its emitter");
        assert!(emitter.emit_plan(Arc::new(Slide), &view));
        assert_eq!(rt.live_tokens(), 2);
        assert_eq!(probe(&view).created.load(Ordering::SeqCst), 2);

        drop(rt);
        assert!(!emitter.emit_plan(Arc::new(Slide), &view));
    }

    /// Re-enters the runtime from the delegate callback.
    struct Chaser {
        view: Target,
        plan: fn() -> PlanRef,
        when_active: bool,
        fired: AtomicBool,
        seen: Mutex<Vec<bool>>,
    }

    impl Chaser {
        fn new(view: &Target, plan: fn() -> PlanRef, when_active: bool) -> Arc<Self> {
            Arc::new(Self {
                view: view.clone(),
                plan,
                when_active,
                fired: AtomicBool::new(false),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl RuntimeDelegate for Chaser {
        fn activity_state_did_change(&self, runtime: &MotionRuntime) {
            let active = runtime.is_active();
            self.seen.lock().push(active);
            if active == self.when_active && !self.fired.swap(true, Ordering::SeqCst) {
                runtime
                    .add_plan((self.plan)(), &self.view)
                    .expect("re-entrant add");
            }
        }
    }

    #[test]
    fn test_delegate_adds_to_the_performer_that_flipped() {
        let rec = Arc::new(Recorder::default());
        let view = target();
        let chaser = Chaser::new(&view, || Arc::new(Slide), true);
        let tracer: Arc<dyn Trace> = rec.clone();
        let rt = MotionRuntime::builder(RuntimeConfig::default())
            .with_tracers(vec![tracer])
            .with_delegate(&chaser)
            .build();

        rt.add_plan(Arc::new(Fade { hold: true }), &view).unwrap();

        assert_eq!(*chaser.seen.lock(), vec![true]);
        assert_eq!(rt.live_tokens(), 2);
        assert_eq!(rt.performer_count(), 1);
        assert_eq!(probe(&view).created.load(Ordering::SeqCst), 1);
        assert_eq!(
            rec.kinds(),
            vec![
                EventKind::PlanAdded,
                EventKind::PerformerCreated,
                EventKind::ActivityChanged,
                EventKind::PlanAdded,
            ]
        );
    }

    #[test]
    fn test_delegate_restarts_work_when_removal_goes_inactive() {
        let rec = Arc::new(Recorder::default());
        let view = target();
        let chaser = Chaser::new(&view, || Arc::new(Fade { hold: true }), false);
        let tracer: Arc<dyn Trace> = rec.clone();
        let rt = MotionRuntime::builder(RuntimeConfig::default())
            .with_tracers(vec![tracer])
            .with_delegate(&chaser)
            .build();

        rt.add_plan_named(Arc::new(Fade { hold: true }), "foo", &view)
            .unwrap();
        rt.remove_plan_named("foo", &view);

        assert_eq!(*chaser.seen.lock(), vec![true, false, true]);
        assert!(rt.is_active());
        assert_eq!(rt.live_tokens(), 1);
        assert!(rt.named_plans(&view).is_empty());
        assert_eq!(probe(&view).created.load(Ordering::SeqCst), 2);
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 1);

        let flips: Vec<bool> = rec.events.lock().iter().filter_map(|e| e.active).collect();
        assert_eq!(flips, vec![true, false, true]);
    }

    /// Removes one named plan when another one is announced.
    struct Canceller {
        runtime: Mutex<Weak<MotionRuntime>>,
        view: Target,
        on: &'static str,
        cancel: &'static str,
    }

    impl Trace for Canceller {
        fn on_event(&self, event: &Event) {
            if event.kind != EventKind::NamedPlanAdded || event.name.as_deref() != Some(self.on) {
                return;
            }
            let Some(runtime) = self.runtime.lock().upgrade() else {
                return;
            };
            runtime.remove_plan_named(self.cancel, &self.view);
        }
    }

    #[test]
    fn test_tracer_removes_a_named_plan_during_dispatch() {
        let flips = Arc::new(Flips::default());
        let rec = Arc::new(Recorder::default());
        let rt = runtime_with(&flips, &rec);
        let view = target();

        let canceller = Arc::new(Canceller {
            runtime: Mutex::new(Arc::downgrade(&rt)),
            view: view.clone(),
            on: "bar",
            cancel: "foo",
        });
        rt.add_tracer(canceller.clone());

        rt.add_plan_named(Arc::new(Spring), "foo", &view).unwrap();
        let before = rec.kinds().len();
        rt.add_plan_named(Arc::new(Fade { hold: true }), "bar", &view)
            .unwrap();

        assert_eq!(rt.named_plans(&view), vec!["bar".to_string()]);
        assert_eq!(*probe(&view).removed.lock(), vec!["foo".to_string()]);
        assert_eq!(rt.live_tokens(), 1);
        assert_eq!(rt.performer_count(), 1);
        assert_eq!(*flips.seen.lock(), vec![true, false, true]);
        assert_eq!(
            rec.kinds()[before..],
            [
                EventKind::NamedPlanAdded,
                EventKind::NamedPlanRemoved,
                EventKind::PerformerReleased,
                EventKind::PerformerCreated,
                EventKind::ActivityChanged,
                EventKind::ActivityChanged,
            ]
        );
    }

    #[test]
    fn test_idle_performers_survive_when_release_is_disabled() {
        let cfg = RuntimeConfig {
            release_idle_performers: false,
            ..RuntimeConfig::default()
        };
        let rt = MotionRuntime::builder(cfg).build();
        let view = target();

        rt.add_plan_named(Arc::new(Spring), "snap", &view).unwrap();
        rt.remove_plan_named("snap", &view);

        assert!(!rt.is_active());
        assert_eq!(rt.performer_count(), 1);
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 0);

        rt.teardown();
        assert_eq!(rt.performer_count(), 0);
        assert_eq!(probe(&view).released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delegate_is_replaced_and_held_weakly() {
        let rt = MotionRuntime::new();
        let view = target();
        let a = Arc::new(Flips::default());
        let b = Arc::new(Flips::default());

        rt.set_delegate(&a);
        rt.set_delegate(&b);
        rt.add_plan_named(Arc::new(Spring), "snap", &view).unwrap();
        assert!(a.seen.lock().is_empty());
        assert_eq!(*b.seen.lock(), vec![true]);

        drop(b);
        assert!(rt.delegate().is_none());
        rt.remove_plan_named("snap", &view);
        assert!(!rt.is_active());

        rt.set_delegate(&a);
        rt.clear_delegate();
        rt.add_plan_named(Arc::new(Spring), "snap", &view).unwrap();
        assert!(a.seen.lock().is_empty());
    }

    #[derive(Debug)]
    struct Pulse {
        ms: u64,
    }

    impl Plan for Pulse {
        fn performer_kind(&self) -> PerformerKind {
            PerformerKind::of::<Pulser>()
        }
    }

    /// Hands its token to a background task that ends it on timeout or cancellation.
    struct Pulser {
        ctx: PerformerContext,
    }

    impl Perform for Pulser {
        fn create(ctx: PerformerContext) -> Self {
            Self { ctx }
        }

        fn add_plan(&mut self, plan: &PlanRef) -> Result<(), PerformError> {
            let pulse = downcast_plan::<Pulse>(plan, "Pulser")?;
            let ms = pulse.ms;
            let token = self.ctx.tokens().generate();
            let cancel = self.ctx.cancellation().clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                }
                token.terminate();
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct Settled {
        notify: tokio::sync::Notify,
        seen: Mutex<Vec<bool>>,
    }

    impl RuntimeDelegate for Settled {
        fn activity_state_did_change(&self, runtime: &MotionRuntime) {
            let active = runtime.is_active();
            self.seen.lock().push(active);
            if !active {
                self.notify.notify_one();
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_token_terminated_on_another_thread_flips_inactive() {
        let settled = Arc::new(Settled::default());
        let rt = MotionRuntime::builder(RuntimeConfig::default())
            .with_delegate(&settled)
            .build();
        let view = Target::new("pulse");

        rt.add_plan(Arc::new(Pulse { ms: 20 }), &view).unwrap();
        assert!(rt.is_active());

        tokio::time::timeout(Duration::from_secs(2), settled.notify.notified())
            .await
            .expect("activity settles");
        assert!(!rt.is_active());
        assert_eq!(*settled.seen.lock(), vec![true, false]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_teardown_cancels_background_work() {
        let settled = Arc::new(Settled::default());
        let rt = MotionRuntime::builder(RuntimeConfig::default())
            .with_delegate(&settled)
            .build();
        let view = Target::new("pulse");

        rt.add_plan(Arc::new(Pulse { ms: 60_000 }), &view).unwrap();
        rt.teardown();

        tokio::time::timeout(Duration::from_secs(2), settled.notify.notified())
            .await
            .expect("cancelled work ends its token");
        assert!(!rt.is_active());
    }
}
