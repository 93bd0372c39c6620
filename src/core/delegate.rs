use crate::core::MotionRuntime;

/// Listener for runtime state changes.
///
/// The runtime holds its delegate weakly: dropping the delegate is the same as
/// clearing it. At most one delegate is installed at a time.
pub trait RuntimeDelegate: Send + Sync {
    /// Called exactly once per flip of [`MotionRuntime::is_active`], in flip order.
    ///
    /// A flip caused during a runtime call is reported when the outermost call
    /// returns; any other flip is reported on the thread that caused it. No
    /// runtime lock is held, so the callback may add or remove plans.
    fn activity_state_did_change(&self, runtime: &MotionRuntime);
}
