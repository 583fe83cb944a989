// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cancellation scope tied to a screen's lifetime.

use crate::error::AppError;
use std::future::Future;
use tokio::sync::watch;

/// Cancels every call run through it when cancelled or dropped.
pub struct ScreenScope {
    cancelled: watch::Sender<bool>,
}

/// Cloneable handle for running work in a [`ScreenScope`] from spawned tasks.
#[derive(Clone)]
pub struct ScopeToken {
    cancelled: watch::Receiver<bool>,
}

impl Default for ScreenScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenScope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { cancelled: tx }
    }

    pub fn token(&self) -> ScopeToken {
        ScopeToken {
            cancelled: self.cancelled.subscribe(),
        }
    }

    /// Run `fut` unless the scope is cancelled first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, AppError> {
        self.token().run(fut).await
    }

    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

impl Drop for ScreenScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl ScopeToken {
    /// Run `fut`, returning [`AppError::Cancelled`] if the scope ends first.
    pub async fn run<F: Future>(mut self, fut: F) -> Result<F::Output, AppError> {
        if *self.cancelled.borrow() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            // Err means the scope itself is gone, which also cancels
            _ = self.cancelled.wait_for(|c| *c) => Err(AppError::Cancelled),
            out = fut => Ok(out),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let scope = ScreenScope::new();
        assert_eq!(scope.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_call() {
        let scope = ScreenScope::new();
        let token = scope.token();
        let task = tokio::spawn(token.run(tokio::time::sleep(Duration::from_secs(30))));
        tokio::task::yield_now().await;
        scope.cancel();
        assert!(matches!(task.await.unwrap(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_drop_cancels_spawned_work() {
        let scope = ScreenScope::new();
        let token = scope.token();
        let task = tokio::spawn(token.run(std::future::pending::<()>()));
        drop(scope);
        assert!(matches!(task.await.unwrap(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_scope_rejects_new_work() {
        let scope = ScreenScope::new();
        scope.cancel();
        assert!(scope.is_cancelled());
        assert!(matches!(
            scope.run(async { 1 }).await,
            Err(AppError::Cancelled)
        ));
    }
}
