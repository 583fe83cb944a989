// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile documents, PIN digest)
//! - Rides (creation, active ride lookup, history, cancellation, rating)
//! - Drivers (read-only profiles)
//! - Realtime listeners on a single ride
//!
//! Status and rating writes use field masks so they never clobber fields the
//! driver side writes concurrently. Creation and phase timestamps are set by
//! the server (request time), never by the device clock.

use crate::db::collections;
use crate::db::{RideBackend, RideEvent, RideSubscription, UserDirectory};
use crate::error::AppError;
use crate::models::{Driver, NewRide, RatingInput, Ride, RideRatings, RideStatus, User};
use crate::services::phone_auth::PhoneAuthProvider;
use crate::services::session::SessionHandle;
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::{
    FirestoreListenEvent, FirestoreListenerTarget, FirestoreMemListenStateStorage,
    FirestoreResult, FirestoreTransactionResponse, FirestoreTransformServerValue,
    FirestoreWritePrecondition,
};
use gcloud_sdk::google::firestore::v1::{value::ValueType, Document};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use validator::Validate;

/// Listener target IDs must be unique per client.
static NEXT_LISTENER_TARGET: AtomicU32 = AtomicU32::new(1);

/// Reads before giving up on a cancel that keeps racing a driver update.
const CANCEL_ATTEMPTS: u32 = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Partial ride document for status changes. The phase timestamp is a
/// server transform.
#[derive(Serialize, Deserialize)]
struct StatusPatch {
    status: RideStatus,
}

/// Partial ride document for the passenger's rating.
#[derive(Serialize, Deserialize)]
struct RatingPatch {
    ratings: RideRatings,
}

/// `updatedAt` comes from a server transform.
#[derive(Serialize, Deserialize)]
struct PinPatch {
    pin: String,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Decode a ride document. Documents written without `rideId` take it from
/// the document name.
fn ride_from_doc(doc: &Document) -> Result<Ride, AppError> {
    let mut ride: Ride = firestore::FirestoreDb::deserialize_doc_to(doc).map_err(db_err)?;
    if ride.ride_id.is_empty() {
        ride.ride_id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
    }
    Ok(ride)
}

/// Another writer got there first: the precondition no longer holds or the
/// transaction was aborted.
fn is_write_conflict(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DatabaseError(e)
        if e.public.code == "FailedPrecondition" || e.public.code == "Aborted")
}

/// Server time of the first transform in a commit, else the commit time.
fn stamped_time(response: &FirestoreTransactionResponse) -> Option<DateTime<Utc>> {
    let transformed = response
        .write_results
        .first()
        .and_then(|r| r.transform_results.first())
        .and_then(|v| match &v.value.value_type {
            Some(ValueType::TimestampValue(ts)) => {
                firestore::timestamp_utils::from_timestamp(ts.clone()).ok()
            }
            _ => None,
        });
    transformed.or(response.commit_time)
}

/// Write `status` and stamp its phase timestamp with the server time.
async fn commit_status(
    client: &firestore::FirestoreDb,
    ride_id: &str,
    status: RideStatus,
    precondition: Option<FirestoreWritePrecondition>,
) -> FirestoreResult<FirestoreTransactionResponse> {
    let patch = StatusPatch { status };
    let mut transaction = client.begin_transaction().await?;

    let update = client
        .fluent()
        .update()
        .fields(["status"])
        .in_col(collections::RIDES);
    let update = match precondition {
        Some(precondition) => update.precondition(precondition),
        None => update,
    };
    update
        .transforms(move |t| {
            t.fields([status.timestamp_field().and_then(|path| {
                t.field(path)
                    .server_value(FirestoreTransformServerValue::RequestTime)
            })])
        })
        .document_id(ride_id)
        .object(&patch)
        .add_to_transaction(&mut transaction)?;

    transaction.commit().await
}

impl FirestoreDb {
    /// Connect as the signed-in user.
    ///
    /// Every request carries the user's Firebase ID token, refreshed through
    /// `auth` when close to expiry. For local development with the emulator,
    /// set FIRESTORE_EMULATOR_HOST.
    pub async fn new(
        project_id: &str,
        session: &SessionHandle,
        auth: Arc<dyn PhoneAuthProvider>,
    ) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::new_emulator(project_id).await;
        }

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());
        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            session.token_source(auth),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    pub async fn new_emulator(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Query rides of a user in any of `statuses`, newest first.
    async fn query_rides(
        &self,
        user_id: &str,
        statuses: &[RideStatus],
        limit: u32,
    ) -> Result<Vec<Ride>, AppError> {
        let user_id = user_id.to_string();
        let statuses: Vec<&'static str> = statuses.iter().map(RideStatus::as_str).collect();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::RIDES)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id.clone()),
                    q.field("status").is_in(statuses.clone()),
                ])
            })
            .order_by([(
                "timestamps.created",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .query()
            .await
            .map_err(db_err)?
            .iter()
            .map(ride_from_doc)
            .collect()
    }

    /// Write `status` and its phase timestamp, leaving other fields alone.
    pub async fn update_ride_status(
        &self,
        ride_id: &str,
        status: RideStatus,
    ) -> Result<(), AppError> {
        commit_status(self.get_client()?, ride_id, status, None)
            .await
            .map_err(db_err)?;

        tracing::info!(ride_id, status = %status, "Ride status updated");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for FirestoreDb {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(db_err)
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_pin_hash(&self, uid: &str, pin_hash: &str) -> Result<(), AppError> {
        let client = self.get_client()?;
        let patch = PinPatch {
            pin: pin_hash.to_string(),
        };

        let mut transaction = client.begin_transaction().await.map_err(db_err)?;
        client
            .fluent()
            .update()
            .fields(["pin"])
            .in_col(collections::USERS)
            .transforms(|t| {
                t.fields([t
                    .field("updatedAt")
                    .server_value(FirestoreTransformServerValue::RequestTime)])
            })
            .document_id(uid)
            .object(&patch)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;
        transaction.commit().await.map_err(db_err)?;

        tracing::info!(uid, "PIN updated");
        Ok(())
    }
}

#[async_trait]
impl RideBackend for FirestoreDb {
    async fn create_ride(&self, user_id: &str, ride: NewRide) -> Result<Ride, AppError> {
        ride.validate()?;

        let client = self.get_client()?;
        let ride_id = uuid::Uuid::new_v4().simple().to_string();
        // `timestamps.created` is left empty here and stamped by the server
        let mut ride = ride.into_ride(ride_id, user_id.to_string(), "");

        let mut transaction = client.begin_transaction().await.map_err(db_err)?;
        client
            .fluent()
            .update()
            .in_col(collections::RIDES)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .transforms(|t| {
                t.fields([t
                    .field("timestamps.created")
                    .server_value(FirestoreTransformServerValue::RequestTime)])
            })
            .document_id(&ride.ride_id)
            .object(&ride)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;
        let response = transaction.commit().await.map_err(db_err)?;

        ride.timestamps.created = stamped_time(&response)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(now_rfc3339);

        tracing::info!(
            ride_id = %ride.ride_id,
            user_id,
            price = ride.price,
            distance_km = ride.distance,
            "Ride created"
        );
        Ok(ride)
    }

    async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::RIDES)
            .one(ride_id)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(ride_from_doc)
            .transpose()
    }

    async fn get_active_ride(&self, user_id: &str) -> Result<Option<Ride>, AppError> {
        let rides = self.query_rides(user_id, &RideStatus::ACTIVE, 1).await?;
        Ok(rides.into_iter().next())
    }

    async fn ride_history(&self, user_id: &str, limit: u32) -> Result<Vec<Ride>, AppError> {
        self.query_rides(
            user_id,
            &[RideStatus::Completed, RideStatus::Cancelled],
            limit,
        )
        .await
    }

    /// Cancel only if the ride is unchanged since it was read, so a driver
    /// completing the ride at the same moment is never overwritten.
    async fn cancel_ride(&self, ride_id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;

        for attempt in 1..=CANCEL_ATTEMPTS {
            let doc = client
                .fluent()
                .select()
                .by_id_in(collections::RIDES)
                .one(ride_id)
                .await
                .map_err(db_err)?
                .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))?;
            let ride = ride_from_doc(&doc)?;

            if ride.status == RideStatus::Cancelled {
                tracing::debug!(ride_id, "Ride already cancelled");
                return Ok(());
            }
            if !ride.status.can_transition_to(RideStatus::Cancelled) {
                return Err(AppError::BadRequest(format!(
                    "Ride is {} and can no longer be cancelled",
                    ride.status
                )));
            }

            let precondition = match doc.update_time.clone() {
                Some(ts) => FirestoreWritePrecondition::UpdateTime(
                    firestore::timestamp_utils::from_timestamp(ts).map_err(db_err)?,
                ),
                None => FirestoreWritePrecondition::Exists(true),
            };

            match commit_status(client, ride_id, RideStatus::Cancelled, Some(precondition)).await {
                Ok(_) => {
                    tracing::info!(ride_id, from = %ride.status, "Ride cancelled");
                    return Ok(());
                }
                Err(e) if is_write_conflict(&e) => {
                    tracing::debug!(ride_id, attempt, "Ride changed while cancelling; re-reading");
                }
                Err(e) => return Err(db_err(e)),
            }
        }

        Err(AppError::Database(format!(
            "Ride {} kept changing; cancel not applied",
            ride_id
        )))
    }

    async fn rate_ride(&self, ride_id: &str, rating: &RatingInput) -> Result<(), AppError> {
        rating.validate()?;

        let comment = rating
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let mut fields = vec!["ratings.passengerRating"];
        if comment.is_some() {
            fields.push("ratings.passengerComment");
        }
        let patch = RatingPatch {
            ratings: RideRatings {
                passenger_rating: Some(rating.stars),
                passenger_comment: comment,
                ..Default::default()
            },
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::RIDES)
            .document_id(ride_id)
            .object(&patch)
            .execute()
            .await
            .map_err(db_err)?;

        tracing::info!(ride_id, stars = rating.stars, "Ride rated");
        Ok(())
    }

    async fn get_driver(&self, driver_id: &str) -> Result<Option<Driver>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DRIVERS)
            .obj()
            .one(driver_id)
            .await
            .map_err(db_err)
    }

    async fn listen_to_ride(&self, ride_id: &str) -> Result<RideSubscription, AppError> {
        let client = self.get_client()?;

        let mut listener = client
            .create_listener(FirestoreMemListenStateStorage::new())
            .await
            .map_err(db_err)?;

        let target = FirestoreListenerTarget::new(NEXT_LISTENER_TARGET.fetch_add(1, Ordering::Relaxed));
        client
            .fluent()
            .select()
            .by_id_in(collections::RIDES)
            .batch_listen([ride_id.to_string()])
            .add_target(target, &mut listener)
            .map_err(db_err)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let watched = ride_id.to_string();

        listener
            .start(move |event| {
                let tx = tx.clone();
                let watched = watched.clone();
                async move {
                    match event {
                        FirestoreListenEvent::DocumentChange(ref change) => {
                            if let Some(doc) = &change.document {
                                let event = match ride_from_doc(doc) {
                                    Ok(ride) => RideEvent::Snapshot(ride),
                                    Err(e) => {
                                        tracing::warn!(ride_id = %watched, error = %e, "Unreadable ride snapshot");
                                        RideEvent::Error(e.to_string())
                                    }
                                };
                                let _ = tx.send(event);
                            }
                        }
                        FirestoreListenEvent::DocumentDelete(_)
                        | FirestoreListenEvent::DocumentRemove(_) => {
                            let _ = tx.send(RideEvent::Removed);
                        }
                        _ => {}
                    }
                    Ok(())
                }
            })
            .await
            .map_err(db_err)?;

        tracing::debug!(ride_id, "Ride listener started");

        let release_id = ride_id.to_string();
        let release = move || match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = listener.shutdown().await {
                        tracing::warn!(ride_id = %release_id, error = %e, "Ride listener shutdown failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(ride_id = %release_id, "No runtime to shut down ride listener");
            }
        };

        Ok(RideSubscription::new(ride_id, rx, release))
    }
}
