// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use blu_maze::db::{FirestoreDb, RideBackend, RideEvent, RideSubscription, UserDirectory};
use blu_maze::error::AppError;
use blu_maze::models::{
    Address, Coordinates, Driver, NewRide, PaymentMethod, RatingInput, Ride, RideStatus, RideType,
    User, Vehicle,
};
use blu_maze::services::maps::{MapsError, MapsStatus};
use blu_maze::services::phone_auth::{AuthErrorKind, PendingVerification, PhoneAuthProvider};
use blu_maze::services::{AuthSession, RouteError, RoutePlanner, RouteQuote};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new_emulator("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique suffix for test isolation.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

#[allow(dead_code)]
pub fn westfield() -> Coordinates {
    Coordinates::new(13.4432, -16.6776)
}

#[allow(dead_code)]
pub fn banjul() -> Coordinates {
    Coordinates::new(13.4549, -16.5790)
}

#[allow(dead_code)]
pub fn sample_quote() -> RouteQuote {
    RouteQuote {
        distance: 12.0,
        duration: 25.0,
        route: vec![westfield(), banjul()],
        price: 355.0,
    }
}

#[allow(dead_code)]
pub fn sample_request() -> NewRide {
    NewRide {
        pickup: Address::new("Pickup", "Westfield Junction", westfield()),
        destination: Address::new("Destination", "Albert Market, Banjul", banjul()),
        distance: 12.0,
        duration: 25.0,
        price: 355.0,
        ride_type: RideType::Instant,
        scheduled_time: None,
        payment_method: Some(PaymentMethod::Cash),
    }
}

/// A ride owned by `user_id` in `status`.
#[allow(dead_code)]
pub fn sample_ride(ride_id: &str, user_id: &str, status: RideStatus) -> Ride {
    let mut ride = sample_request().into_ride(
        ride_id.to_string(),
        user_id.to_string(),
        "2026-03-01T08:00:00Z",
    );
    ride.status = status;
    if status != RideStatus::Pending {
        ride.driver_id = Some("driver-1".to_string());
    }
    ride
}

#[allow(dead_code)]
pub fn sample_driver() -> Driver {
    Driver {
        first_name: "Lamin".to_string(),
        last_name: "Jallow".to_string(),
        profile_photo: None,
        rating: 4.8,
        total_rides: 312,
        is_online: true,
        current_location: Some(westfield()),
        vehicle: Vehicle {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: Some(2015),
            color: "Yellow".to_string(),
            license_plate: "BJL 1234 A".to_string(),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FAKE ROUTE PLANNER
// ═══════════════════════════════════════════════════════════════════════════

/// Route planner that returns a fixed quote, or `ZERO_RESULTS`.
#[allow(dead_code)]
pub struct FakeRoutes {
    quote: Option<RouteQuote>,
    address: Option<String>,
    pub quote_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeRoutes {
    pub fn ok(quote: RouteQuote) -> Self {
        Self {
            quote: Some(quote),
            address: Some("Kairaba Avenue, Serrekunda".to_string()),
            quote_calls: AtomicUsize::new(0),
        }
    }

    pub fn no_route() -> Self {
        Self {
            quote: None,
            address: None,
            quote_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }
}

fn zero_results() -> RouteError {
    RouteError::Maps(MapsError::Status {
        status: MapsStatus::ZeroResults,
        message: None,
    })
}

#[async_trait]
impl RoutePlanner for FakeRoutes {
    async fn quote(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<RouteQuote, RouteError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.quote.clone().ok_or_else(zero_results)
    }

    async fn reverse_geocode(&self, _coords: Coordinates) -> Result<String, RouteError> {
        self.address.clone().ok_or_else(zero_results)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FAKE BACKEND
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory rides, drivers and users with test-driven listeners.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeBackend {
    rides: Mutex<HashMap<String, Ride>>,
    users: Mutex<HashMap<String, User>>,
    drivers: Mutex<HashMap<String, Driver>>,
    listeners: Mutex<HashMap<String, mpsc::UnboundedSender<RideEvent>>>,
    released: Arc<AtomicUsize>,
    next_id: AtomicUsize,
    pub fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_ride(&self, ride: Ride) {
        self.rides.lock().unwrap().insert(ride.ride_id.clone(), ride);
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn insert_driver(&self, driver_id: &str, driver: Driver) {
        self.drivers
            .lock()
            .unwrap()
            .insert(driver_id.to_string(), driver);
    }

    pub fn ride(&self, ride_id: &str) -> Option<Ride> {
        self.rides.lock().unwrap().get(ride_id).cloned()
    }

    pub fn user(&self, uid: &str) -> Option<User> {
        self.users.lock().unwrap().get(uid).cloned()
    }

    /// Deliver an event to the listener on `ride_id`. Returns `false` when
    /// nobody is listening anymore.
    pub fn push(&self, ride_id: &str, event: RideEvent) -> bool {
        match self.listeners.lock().unwrap().get(ride_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Change the stored ride's status and deliver the snapshot.
    pub fn set_status(&self, ride_id: &str, status: RideStatus) -> bool {
        let ride = {
            let mut rides = self.rides.lock().unwrap();
            let Some(ride) = rides.get_mut(ride_id) else {
                return false;
            };
            ride.status = status;
            if status != RideStatus::Pending && ride.driver_id.is_none() {
                ride.driver_id = Some("driver-1".to_string());
            }
            ride.clone()
        };
        self.push(ride_id, RideEvent::Snapshot(ride))
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn check_writes(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RideBackend for FakeBackend {
    async fn create_ride(&self, user_id: &str, ride: NewRide) -> Result<Ride, AppError> {
        self.check_writes()?;
        let id = format!("ride-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let ride = ride.into_ride(id, user_id.to_string(), "2026-03-01T08:00:00Z");
        self.insert_ride(ride.clone());
        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        Ok(self.ride(ride_id))
    }

    async fn get_active_ride(&self, user_id: &str) -> Result<Option<Ride>, AppError> {
        let rides = self.rides.lock().unwrap();
        Ok(rides
            .values()
            .filter(|r| r.user_id == user_id && r.status.is_active())
            .max_by(|a, b| a.timestamps.created.cmp(&b.timestamps.created))
            .cloned())
    }

    async fn ride_history(&self, user_id: &str, limit: u32) -> Result<Vec<Ride>, AppError> {
        let rides = self.rides.lock().unwrap();
        let mut history: Vec<Ride> = rides
            .values()
            .filter(|r| r.user_id == user_id && r.status.is_terminal())
            .cloned()
            .collect();
        history.sort_by(|a, b| b.timestamps.created.cmp(&a.timestamps.created));
        history.truncate(limit as usize);
        Ok(history)
    }

    async fn cancel_ride(&self, ride_id: &str) -> Result<(), AppError> {
        self.check_writes()?;
        let mut rides = self.rides.lock().unwrap();
        let ride = rides
            .get_mut(ride_id)
            .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))?;
        ride.status = RideStatus::Cancelled;
        Ok(())
    }

    async fn rate_ride(&self, ride_id: &str, rating: &RatingInput) -> Result<(), AppError> {
        self.check_writes()?;
        let mut rides = self.rides.lock().unwrap();
        let ride = rides
            .get_mut(ride_id)
            .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))?;
        let ratings = ride.ratings.get_or_insert_with(Default::default);
        ratings.passenger_rating = Some(rating.stars);
        ratings.passenger_comment = rating.comment.clone();
        Ok(())
    }

    async fn get_driver(&self, driver_id: &str) -> Result<Option<Driver>, AppError> {
        Ok(self.drivers.lock().unwrap().get(driver_id).cloned())
    }

    async fn listen_to_ride(&self, ride_id: &str) -> Result<RideSubscription, AppError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .unwrap()
            .insert(ride_id.to_string(), tx);
        let released = self.released.clone();
        Ok(RideSubscription::new(ride_id, rx, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

#[async_trait]
impl UserDirectory for FakeBackend {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Ok(self.user(uid))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.check_writes()?;
        self.insert_user(user.clone());
        Ok(())
    }

    async fn set_pin_hash(&self, uid: &str, pin_hash: &str) -> Result<(), AppError> {
        self.check_writes()?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("User {}", uid)))?;
        user.pin = Some(pin_hash.to_string());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FAKE PHONE AUTH
// ═══════════════════════════════════════════════════════════════════════════

/// Phone auth that accepts one fixed code.
#[allow(dead_code)]
pub struct FakePhoneAuth {
    valid_code: String,
    uid: String,
    send_error: Mutex<Option<AuthErrorKind>>,
    confirm_error: Mutex<Option<AuthErrorKind>>,
    pub sent_to: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakePhoneAuth {
    pub fn new(valid_code: &str, uid: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_code: valid_code.to_string(),
            uid: uid.to_string(),
            send_error: Mutex::new(None),
            confirm_error: Mutex::new(None),
            sent_to: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_send_with(&self, kind: AuthErrorKind) {
        *self.send_error.lock().unwrap() = Some(kind);
    }

    pub fn fail_confirm_with(&self, kind: AuthErrorKind) {
        *self.confirm_error.lock().unwrap() = Some(kind);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent_to.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhoneAuthProvider for FakePhoneAuth {
    async fn send_code(&self, phone_number: &str) -> Result<PendingVerification, AuthErrorKind> {
        if let Some(kind) = *self.send_error.lock().unwrap() {
            return Err(kind);
        }
        let mut sent = self.sent_to.lock().unwrap();
        sent.push(phone_number.to_string());
        Ok(PendingVerification {
            session_info: format!("session-{}", sent.len()),
            phone_number: phone_number.to_string(),
        })
    }

    async fn confirm_code(
        &self,
        pending: &PendingVerification,
        code: &str,
    ) -> Result<AuthSession, AuthErrorKind> {
        if let Some(kind) = *self.confirm_error.lock().unwrap() {
            return Err(kind);
        }
        if code != self.valid_code {
            return Err(AuthErrorKind::InvalidVerificationCode);
        }
        Ok(AuthSession::from_tokens(
            "emulator-id-token".to_string(),
            "emulator-refresh-token".to_string(),
            3600,
            self.uid.clone(),
            pending.phone_number.clone(),
            true,
        ))
    }

    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession, AuthErrorKind> {
        Ok(session.clone())
    }
}
