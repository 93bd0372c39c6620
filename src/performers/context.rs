//! # What a performer receives at construction.

use tokio_util::sync::CancellationToken;

use crate::core::{PlanEmitter, TokenGenerator};
use crate::plans::Target;

/// Handles given to a performer by the runtime when it is created.
///
/// - [`target`](Self::target): the object the performer acts on
/// - [`tokens`](Self::tokens): generator for activity tokens
/// - [`emitter`](Self::emitter): adds further plans to the runtime
/// - [`cancellation`](Self::cancellation): cancelled when the performer is released
#[derive(Clone)]
pub struct PerformerContext {
    target: Target,
    tokens: TokenGenerator,
    emitter: PlanEmitter,
    cancel: CancellationToken,
}

impl PerformerContext {
    pub(crate) fn new(
        target: Target,
        tokens: TokenGenerator,
        emitter: PlanEmitter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            tokens,
            emitter,
            cancel,
        }
    }

    /// The target this performer acts on.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Generator for this performer's activity tokens.
    pub fn tokens(&self) -> &TokenGenerator {
        &self.tokens
    }

    /// Emitter for adding plans from inside the performer.
    pub fn emitter(&self) -> &PlanEmitter {
        &self.emitter
    }

    /// Token cancelled when the performer is released or the runtime is dropped.
    ///
    /// Background work started by the performer should stop and drop its
    /// activity tokens once this is cancelled.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
