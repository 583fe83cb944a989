// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime ride subscription with scoped release.

use crate::models::Ride;
use tokio::sync::mpsc;

/// Something the backend reported about a watched ride.
#[derive(Debug, Clone, PartialEq)]
pub enum RideEvent {
    /// Full document after a change
    Snapshot(Ride),
    /// The document no longer exists
    Removed,
    /// The listener failed; no further events follow
    Error(String),
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Live listener on one ride document.
///
/// Dropping the value releases the backend listener, so every exit path
/// (terminal status, ride change, screen teardown, error) cleans up.
pub struct RideSubscription {
    ride_id: String,
    events: mpsc::UnboundedReceiver<RideEvent>,
    release: Option<ReleaseFn>,
}

impl RideSubscription {
    /// Wrap an event stream and the function that stops its producer.
    pub fn new(
        ride_id: impl Into<String>,
        events: mpsc::UnboundedReceiver<RideEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            ride_id: ride_id.into(),
            events,
            release: Some(Box::new(release)),
        }
    }

    pub fn ride_id(&self) -> &str {
        &self.ride_id
    }

    /// Next event, or `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<RideEvent> {
        self.events.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<RideEvent> {
        self.events.try_recv().ok()
    }

    /// Release the backend listener now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(ride_id = %self.ride_id, "Releasing ride listener");
            self.events.close();
            release();
        }
    }
}

impl Drop for RideSubscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for RideSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RideSubscription")
            .field("ride_id", &self.ride_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_subscription(
        count: &Arc<AtomicUsize>,
    ) -> (mpsc::UnboundedSender<RideEvent>, RideSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        let count = count.clone();
        let sub = RideSubscription::new("ride-1", rx, move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
        (tx, sub)
    }

    #[test]
    fn test_drop_releases_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_tx, sub) = counting_subscription(&count);
        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_release_does_not_double_release() {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, sub) = counting_subscription(&count);
        sub.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Producer sees the closed channel
        assert!(tx.send(RideEvent::Removed).is_err());
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, mut sub) = counting_subscription(&count);
        tx.send(RideEvent::Removed).unwrap();
        tx.send(RideEvent::Error("boom".to_string())).unwrap();
        assert_eq!(sub.next().await, Some(RideEvent::Removed));
        assert_eq!(sub.try_next(), Some(RideEvent::Error("boom".to_string())));
        assert_eq!(sub.try_next(), None);
    }
}
