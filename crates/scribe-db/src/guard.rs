//! Per-save context: the recursion guard and the cancellation flag.
//!
//! A fresh [`SaveContext`] is created for every top-level save and passed
//! down explicitly. While the audit rows of a save are being committed the
//! context is suspended, and a nested pass through the save pipeline sees
//! that and skips change capture. The flag is cleared when the
//! [`RecursionGuard`] drops, so every exit path releases it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation request shared between a caller and an in-flight save.
///
/// Honored only before the original changes are committed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State owned by a single save invocation.
#[derive(Debug, Default)]
pub struct SaveContext {
    suspended: AtomicBool,
    cancel: Option<CancelFlag>,
}

impl SaveContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancel(cancel: CancelFlag) -> Self {
        Self {
            suspended: AtomicBool::new(false),
            cancel: Some(cancel),
        }
    }

    /// Whether change capture is currently suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Suspend change capture until the returned guard drops.
    #[must_use = "capture resumes as soon as the guard is dropped"]
    pub fn suspend(&self) -> RecursionGuard<'_> {
        self.suspended.store(true, Ordering::SeqCst);
        RecursionGuard { ctx: self }
    }
}

/// Clears the suspended flag of its context on drop.
#[derive(Debug)]
pub struct RecursionGuard<'a> {
    ctx: &'a SaveContext,
}

impl Drop for RecursionGuard<'_> {
    fn drop(&mut self) {
        self.ctx.suspended.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_on_drop() {
        let ctx = SaveContext::new();
        {
            let _guard = ctx.suspend();
            assert!(ctx.is_suspended());
        }
        assert!(!ctx.is_suspended());
    }

    #[test]
    fn guard_clears_on_early_return() {
        fn fails(ctx: &SaveContext) -> Result<(), &'static str> {
            let _guard = ctx.suspend();
            Err("audit commit failed")
        }

        let ctx = SaveContext::new();
        assert!(fails(&ctx).is_err());
        assert!(!ctx.is_suspended());
    }

    #[test]
    fn guard_clears_on_panic() {
        let ctx = SaveContext::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ctx.suspend();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!ctx.is_suspended());
    }

    #[test]
    fn contexts_are_independent() {
        let a = SaveContext::new();
        let b = SaveContext::new();
        let _guard = a.suspend();
        assert!(a.is_suspended());
        assert!(!b.is_suspended());
    }

    #[test]
    fn cancel_is_shared() {
        let flag = CancelFlag::new();
        let ctx = SaveContext::with_cancel(flag.clone());
        assert!(!ctx.is_cancelled());
        flag.cancel();
        assert!(ctx.is_cancelled());
        assert!(!SaveContext::new().is_cancelled());
    }
}
