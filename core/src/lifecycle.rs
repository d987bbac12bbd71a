//! View lifecycle tokens.
//!
//! A view takes a `ScopeGuard` before each request and checks it before
//! applying the response. Cancelling the scope (the view was torn down or
//! replaced) bumps its epoch, so guards taken earlier go stale and their late
//! responses are dropped instead of mutating a newer view's state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    epoch: Arc<AtomicU64>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> ScopeGuard {
        ScopeGuard {
            scope: self.clone(),
            epoch: self.epoch.load(Ordering::Acquire),
        }
    }

    /// Invalidate every outstanding guard.
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Debug)]
pub struct ScopeGuard {
    scope: ViewScope,
    epoch: u64,
}

impl ScopeGuard {
    pub fn is_current(&self) -> bool {
        self.scope.epoch.load(Ordering::Acquire) == self.epoch
    }

    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(ApiError::Cancelled)
        }
    }
}
