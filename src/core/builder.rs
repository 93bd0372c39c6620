use std::sync::{Arc, Weak};

use crate::core::{MotionRuntime, RuntimeConfig, RuntimeDelegate};
use crate::tracers::Trace;

/// Builder for constructing a [`MotionRuntime`] with tracers and a delegate
/// installed before the first plan is added.
pub struct RuntimeBuilder {
    cfg: RuntimeConfig,
    tracers: Vec<Arc<dyn Trace>>,
    delegate: Option<Weak<dyn RuntimeDelegate>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RuntimeConfig) -> Self {
        Self {
            cfg,
            tracers: Vec::new(),
            delegate: None,
        }
    }

    /// Sets the initial tracers, in notification order.
    ///
    /// Duplicates are handled per [`RuntimeConfig::duplicate_tracers`].
    pub fn with_tracers(mut self, tracers: Vec<Arc<dyn Trace>>) -> Self {
        self.tracers = tracers;
        self
    }

    /// Installs the delegate. Only a weak reference is kept.
    pub fn with_delegate<D: RuntimeDelegate + 'static>(mut self, delegate: &Arc<D>) -> Self {
        let weak = Arc::downgrade(delegate);
        let weak: Weak<dyn RuntimeDelegate> = weak;
        self.delegate = Some(weak);
        self
    }

    /// Builds and returns the runtime.
    ///
    /// The runtime is always shared (`Arc`): performers reach it through weak
    /// handles for token accounting and plan emission.
    pub fn build(self) -> Arc<MotionRuntime> {
        MotionRuntime::new_internal(self.cfg, self.tracers, self.delegate)
    }
}
