use crate::tx::BoundTx;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Request-scoped state passed to every repository call.
///
/// Carries a cancellation token, an optional deadline and, inside
/// [`Database::run_in_transaction`](crate::Database::run_in_transaction), the
/// bound transaction. Contexts are cheap to clone and derived contexts never
/// affect their parent except through cancellation of the parent's token.
#[derive(Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    tx: Option<BoundTx>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled together with `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..Self::default()
        }
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with `deadline`, keeping an earlier existing one.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
            tx: self.tx.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    pub(crate) fn with_transaction(&self, tx: BoundTx) -> Self {
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            tx: Some(tx),
        }
    }

    pub(crate) fn transaction(&self) -> Option<&BoundTx> {
        self.tx.as_ref()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
