//! # Activity aggregation over performer tokens.
//!
//! Folds every live [`Token`] of every performer into the runtime's single
//! active/inactive flag and announces each flip exactly once.
//!
//! ## Architecture
//! ```text
//! Performer ──► TokenGenerator::generate() ──► ActivityAggregator::acquire()
//!                                                    │  live += 1
//!                                                    └─ 0 → 1 ─► MotionRuntime::activity_flipped(true)
//! Token::terminate() / drop(Token) ──────────► ActivityAggregator::release()
//!                                                    │  live -= 1
//!                                                    └─ 1 → 0 ─► MotionRuntime::activity_flipped(false)
//! ```
//!
//! ## Rules
//! - The aggregator counts tokens; it never owns them.
//! - A token is released at most once (`terminate` is idempotent, `Drop` terminates).
//! - `is_active` is a single atomic load.
//! - Each flip carries the state it flipped to; observers never re-read it.
//! - A flip that happens while the runtime is being dropped is parked and
//!   announced by the runtime before its teardown completes.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::core::{MotionRuntime, RuntimeDelegate};

/// Runtime-wide live-token counter.
pub(crate) struct ActivityAggregator {
    live: AtomicUsize,
    next_id: AtomicU64,
    parked: Mutex<Vec<bool>>,
    delegate: RwLock<Option<Weak<dyn RuntimeDelegate>>>,
    runtime: Weak<MotionRuntime>,
}

impl ActivityAggregator {
    /// Creates an aggregator that announces flips to `runtime`.
    pub fn new(runtime: Weak<MotionRuntime>) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            parked: Mutex::new(Vec::new()),
            delegate: RwLock::new(None),
            runtime,
        })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::Acquire) > 0
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Returns a generator whose tokens are attributed to `performer`.
    pub fn generator(self: &Arc<Self>, performer: &'static str) -> TokenGenerator {
        TokenGenerator {
            activity: Arc::clone(self),
            performer,
        }
    }

    pub fn set_delegate(&self, delegate: Option<Weak<dyn RuntimeDelegate>>) {
        *self.delegate.write() = delegate;
    }

    /// Upgrades the installed delegate; a dropped delegate reads as none.
    pub fn delegate(&self) -> Option<Arc<dyn RuntimeDelegate>> {
        self.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    /// Returns and clears the flips parked while the runtime could not be reached, oldest first.
    pub fn take_parked(&self) -> Vec<bool> {
        std::mem::take(&mut *self.parked.lock())
    }

    fn acquire(&self, performer: &'static str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let prev = self.live.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(token = id, performer, live = prev + 1, "token generated");
        if prev == 0 {
            self.flip(true);
        }
        id
    }

    fn release(&self, id: u64, performer: &'static str) {
        let prev = self.live.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(token = id, performer, live = prev - 1, "token terminated");
        if prev == 1 {
            self.flip(false);
        }
    }

    fn flip(&self, active: bool) {
        match self.runtime.upgrade() {
            Some(runtime) => runtime.activity_flipped(active),
            None => self.parked.lock().push(active),
        }
    }
}

/// Generates activity tokens on behalf of one performer.
///
/// Cheap to clone; performers usually keep one in their state.
#[derive(Clone)]
pub struct TokenGenerator {
    activity: Arc<ActivityAggregator>,
    performer: &'static str,
}

impl TokenGenerator {
    /// Declares a new unit of outstanding work.
    ///
    /// The first live token of the runtime flips it to active.
    pub fn generate(&self) -> Token {
        let id = self.activity.acquire(self.performer);
        Token {
            id,
            performer: self.performer,
            live: AtomicBool::new(true),
            activity: Arc::clone(&self.activity),
        }
    }
}

impl fmt::Debug for TokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGenerator")
            .field("performer", &self.performer)
            .finish_non_exhaustive()
    }
}

/// Outstanding work owned by a performer.
///
/// Live until [`terminate`](Token::terminate) is called or the token is dropped.
/// Terminating twice is a no-op.
pub struct Token {
    id: u64,
    performer: &'static str,
    live: AtomicBool,
    activity: Arc<ActivityAggregator>,
}

impl Token {
    /// Marks the work as done. The last live token of the runtime flips it to inactive.
    pub fn terminate(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            self.activity.release(self.id, self.performer);
        }
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        !self.live.load(Ordering::Acquire)
    }

    /// Runtime-unique token number (for logs).
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("performer", &self.performer)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
