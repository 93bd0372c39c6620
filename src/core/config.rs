//! # Runtime configuration.
//!
//! Provides [`RuntimeConfig`], the settings a [`MotionRuntime`](crate::MotionRuntime)
//! is built with:
//! 1. **Default construction**: `MotionRuntime::new()`
//! 2. **Builder**: `MotionRuntime::builder(cfg).with_tracers(..).build()`

/// Policy for registering a tracer that is already registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateTracers {
    /// The second registration is ignored; the tracer is notified once per event.
    #[default]
    Ignore,
    /// Every registration is kept; the tracer is notified once per registration.
    Allow,
}

/// Configuration for a motion runtime.
///
/// ## Field semantics
/// - `label`: name of the runtime in log fields (`None` = anonymous)
/// - `duplicate_tracers`: what `add_tracer` does with an already registered tracer
/// - `release_idle_performers`: release a performer once its last plan is removed
///
/// ## Notes
/// All fields are public; use [`RuntimeConfig::label`] to avoid repeating the
/// `None` fallback across the codebase.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Identifies the runtime in log output (e.g. the interaction it serves).
    pub label: Option<String>,

    /// Duplicate tracer registration policy.
    pub duplicate_tracers: DuplicateTracers,

    /// Release performers that no longer execute any plan.
    ///
    /// - `true` = a performer is released (its tokens terminated) when its last
    ///   named plan is removed and it never received an anonymous plan
    /// - `false` = performers live until the runtime is torn down
    pub release_idle_performers: bool,
}

impl RuntimeConfig {
    /// Returns the label used in logs, `"runtime"` when none is set.
    #[inline]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("runtime")
    }

    /// Returns a config with the given label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `label = None`
    /// - `duplicate_tracers = DuplicateTracers::Ignore`
    /// - `release_idle_performers = true`
    fn default() -> Self {
        Self {
            label: None,
            duplicate_tracers: DuplicateTracers::Ignore,
            release_idle_performers: true,
        }
    }
}
