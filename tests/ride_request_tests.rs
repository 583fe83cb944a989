// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Home screen controller tests with fake routing and backend.

use blu_maze::flows::ride_request::{
    CANCEL_FAILED, CREATE_FAILED, CURRENT_LOCATION, MISSING_LOCATIONS, ROUTE_FAILED,
};
use blu_maze::flows::{Alert, Effect, RidePhase, RideRequestFlow};
use blu_maze::models::{Address, PaymentMethod, RideStatus};
use std::sync::atomic::Ordering;
use std::sync::Arc;

mod common;
use common::{
    banjul, sample_driver, sample_quote, sample_ride, westfield, FakeBackend, FakeRoutes,
};

fn flow(routes: Arc<FakeRoutes>, backend: Arc<FakeBackend>) -> RideRequestFlow {
    RideRequestFlow::new(routes, backend, "user-1")
}

async fn previewed_flow(routes: Arc<FakeRoutes>, backend: Arc<FakeBackend>) -> RideRequestFlow {
    let mut flow = flow(routes, backend);
    flow.set_pickup(Address::new("Pickup", "Westfield Junction", westfield()));
    flow.set_destination("Albert Market, Banjul", banjul())
        .await
        .unwrap();
    assert_eq!(flow.phase(), RidePhase::Preview);
    flow
}

// ═══════════════════════════════════════════════════════════════════════════
// ROUTE PREVIEW
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_zero_results_raises_alert_and_stays_initial() {
    let routes = Arc::new(FakeRoutes::no_route());
    let mut flow = flow(routes.clone(), FakeBackend::new());
    flow.set_pickup(Address::new("Pickup", "Westfield Junction", westfield()));

    let alert = flow
        .set_destination("Albert Market, Banjul", banjul())
        .await
        .unwrap_err();

    assert_eq!(alert, Alert::error(ROUTE_FAILED));
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(flow.state().route.is_empty());
    assert_eq!(routes.calls(), 1);
}

#[tokio::test]
async fn test_successful_quote_enters_preview() {
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let flow = previewed_flow(routes, FakeBackend::new()).await;

    let state = flow.state();
    assert_eq!(state.distance, 12.0);
    assert_eq!(state.duration, 25.0);
    assert_eq!(state.price, 355.0);
    assert_eq!(state.route, vec![westfield(), banjul()]);
}

#[tokio::test]
async fn test_unchanged_destination_is_not_requoted() {
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes.clone(), FakeBackend::new()).await;

    // Different label, same coordinates
    flow.set_destination("Banjul", banjul()).await.unwrap();
    assert_eq!(routes.calls(), 1);

    flow.set_destination("Serrekunda Market", westfield())
        .await
        .unwrap();
    assert_eq!(routes.calls(), 2);
}

#[tokio::test]
async fn test_destination_without_pickup_waits() {
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = flow(routes.clone(), FakeBackend::new());

    flow.set_destination("Albert Market, Banjul", banjul())
        .await
        .unwrap();

    assert_eq!(routes.calls(), 0);
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(flow.state().destination.is_some());
}

#[tokio::test]
async fn test_locate_falls_back_to_current_location() {
    let mut flow = flow(Arc::new(FakeRoutes::no_route()), FakeBackend::new());
    flow.locate(westfield()).await;

    let pickup = flow.state().pickup.clone().unwrap();
    assert_eq!(pickup.address, CURRENT_LOCATION);
    assert_eq!(pickup.coords, westfield());
}

#[tokio::test]
async fn test_locate_uses_reverse_geocode() {
    let mut flow = flow(Arc::new(FakeRoutes::ok(sample_quote())), FakeBackend::new());
    flow.locate(westfield()).await;
    assert_eq!(
        flow.state().pickup.as_ref().unwrap().address,
        "Kairaba Avenue, Serrekunda"
    );
}

#[tokio::test]
async fn test_back_clears_trip() {
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, FakeBackend::new()).await;

    flow.back();
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(flow.state().destination.is_none());
    assert!(flow.state().route.is_empty());
    assert!(flow.state().pickup.is_some());
}

// ═══════════════════════════════════════════════════════════════════════════
// ORDERING AND LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_order_requires_both_locations() {
    let backend = FakeBackend::new();
    let mut flow = flow(Arc::new(FakeRoutes::ok(sample_quote())), backend.clone());
    flow.set_pickup(Address::new("Pickup", "Westfield Junction", westfield()));

    assert_eq!(
        flow.order_ride().await.unwrap_err(),
        Alert::error(MISSING_LOCATIONS)
    );
    assert!(!flow.is_observing());
}

#[tokio::test]
async fn test_order_then_lifecycle_to_rating() {
    let backend = FakeBackend::new();
    backend.insert_driver("driver-1", sample_driver());
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, backend.clone()).await;

    flow.order_ride().await.unwrap();
    assert_eq!(flow.phase(), RidePhase::Connecting);
    assert!(flow.is_observing());

    let ride_id = flow.state().current_ride_id.clone().unwrap();
    let stored = backend.ride(&ride_id).unwrap();
    assert_eq!(stored.status, RideStatus::Pending);
    assert_eq!(stored.payment_method, PaymentMethod::Cash);
    assert_eq!(stored.price, 355.0);

    backend.set_status(&ride_id, RideStatus::Accepted);
    assert_eq!(flow.next_update().await, Some(None));
    assert_eq!(flow.phase(), RidePhase::Active);
    assert_eq!(
        flow.state().driver.as_ref().map(|d| d.first_name.as_str()),
        Some("Lamin")
    );

    backend.set_status(&ride_id, RideStatus::Completed);
    let effect = flow.next_update().await.unwrap();
    assert_eq!(effect, Some(Effect::NavigateToRating { ride_id }));
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(flow.state().current_ride_id.is_none());
    assert!(flow.state().driver.is_none());
    assert!(!flow.is_observing());
    assert_eq!(backend.released(), 1);
}

#[tokio::test]
async fn test_create_failure_keeps_preview() {
    let backend = FakeBackend::new();
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, backend.clone()).await;

    backend.fail_writes.store(true, Ordering::SeqCst);
    assert_eq!(
        flow.order_ride().await.unwrap_err(),
        Alert::error(CREATE_FAILED)
    );
    assert_eq!(flow.phase(), RidePhase::Preview);
    assert!(flow.state().current_ride_id.is_none());
}

#[tokio::test]
async fn test_cancel_order_resets_and_releases() {
    let backend = FakeBackend::new();
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, backend.clone()).await;
    flow.order_ride().await.unwrap();
    let ride_id = flow.state().current_ride_id.clone().unwrap();

    flow.cancel_order().await.unwrap();

    assert_eq!(backend.ride(&ride_id).unwrap().status, RideStatus::Cancelled);
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(flow.state().destination.is_none());
    assert!(flow.state().route.is_empty());
    assert!(flow.state().current_ride_id.is_none());
    assert_eq!(backend.released(), 1);
}

#[tokio::test]
async fn test_cancel_failure_keeps_state() {
    let backend = FakeBackend::new();
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, backend.clone()).await;
    flow.order_ride().await.unwrap();

    backend.fail_writes.store(true, Ordering::SeqCst);
    assert_eq!(
        flow.cancel_order().await.unwrap_err(),
        Alert::error(CANCEL_FAILED)
    );
    assert_eq!(flow.phase(), RidePhase::Connecting);
    assert!(flow.state().current_ride_id.is_some());
    assert!(flow.is_observing());
}

#[tokio::test]
async fn test_cancel_without_ride_just_resets() {
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, FakeBackend::new()).await;

    flow.cancel_order().await.unwrap();
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(flow.state().destination.is_none());
}

#[tokio::test]
async fn test_restore_active_ride() {
    let backend = FakeBackend::new();
    backend.insert_driver("driver-1", sample_driver());
    backend.insert_ride(sample_ride("ride-9", "user-1", RideStatus::Accepted));
    backend.insert_ride(sample_ride("ride-old", "user-1", RideStatus::Completed));

    let mut flow = flow(Arc::new(FakeRoutes::ok(sample_quote())), backend.clone());
    assert!(flow.restore_active_ride().await);

    let state = flow.state();
    assert_eq!(state.phase, RidePhase::Active);
    assert_eq!(state.current_ride_id.as_deref(), Some("ride-9"));
    assert_eq!(state.pickup.as_ref().unwrap().coords, westfield());
    assert_eq!(state.destination.as_ref().unwrap().coords, banjul());
    assert_eq!(state.price, 355.0);
    assert!(state.driver.is_some());
    assert!(flow.is_observing());
}

#[tokio::test]
async fn test_restore_pending_ride_is_connecting() {
    let backend = FakeBackend::new();
    backend.insert_ride(sample_ride("ride-1", "user-1", RideStatus::Pending));

    let mut flow = flow(Arc::new(FakeRoutes::ok(sample_quote())), backend);
    assert!(flow.restore_active_ride().await);
    assert_eq!(flow.phase(), RidePhase::Connecting);
}

#[tokio::test]
async fn test_restore_without_active_ride() {
    let backend = FakeBackend::new();
    backend.insert_ride(sample_ride("ride-1", "user-1", RideStatus::Completed));
    backend.insert_ride(sample_ride("ride-2", "someone-else", RideStatus::Pending));

    let mut flow = flow(Arc::new(FakeRoutes::ok(sample_quote())), backend);
    assert!(!flow.restore_active_ride().await);
    assert_eq!(flow.phase(), RidePhase::Initial);
    assert!(!flow.is_observing());
}

#[tokio::test]
async fn test_dropping_flow_releases_listener() {
    let backend = FakeBackend::new();
    let routes = Arc::new(FakeRoutes::ok(sample_quote()));
    let mut flow = previewed_flow(routes, backend.clone()).await;
    flow.order_ride().await.unwrap();

    drop(flow);
    assert_eq!(backend.released(), 1);
}
