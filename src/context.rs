//! Per-operation context handed to every handler call.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::schema::Diagnostic;

/// Cancellation and warning collection for one host operation.
///
/// Handlers return errors directly; warnings that must not block the state
/// commit are pushed here and merged into the response by the engine.
#[derive(Debug, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    warnings: Mutex<Vec<Diagnostic>>,
}

impl OpContext {
    /// Create a context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context bound to an existing token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// The cancellation token for this operation.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the host has cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record a warning.
    pub fn warn(&self, diagnostic: Diagnostic) {
        let mut warnings = match self.warnings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        warnings.push(diagnostic);
    }

    /// Drain the recorded warnings.
    pub fn take_warnings(&self) -> Vec<Diagnostic> {
        let mut warnings = match self.warnings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_drain() {
        let ctx = OpContext::new();
        ctx.warn(Diagnostic::warning("slow"));
        ctx.warn(Diagnostic::warning("slower"));

        let warnings = ctx.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(ctx.take_warnings().is_empty());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let ctx = OpContext::with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
