// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Blu Maze: rider-side core of a ride-hailing app for The Gambia and Senegal
//!
//! This crate quotes routes and fares, creates and watches rides in
//! Firestore, signs riders in by phone number, and holds the client store
//! the UI shell renders from.

pub mod config;
pub mod db;
pub mod error;
pub mod flows;
pub mod format;
pub mod models;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use db::{FirestoreDb, RideBackend, UserDirectory};
use flows::{
    AccountSetup, AuthStateObserver, CodeVerification, PhoneSignIn, RideHistory, RideRating,
    RideRequestFlow,
};
use services::{
    phone_auth::Country, IdentityToolkitClient, MapsClient, PhoneAuthProvider, RoutePlanner,
    RouteService, SessionHandle,
};
use std::sync::Arc;
use store::AppStore;

/// Shared application context.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<AppStore>,
    pub session: SessionHandle,
    pub auth: Arc<dyn PhoneAuthProvider>,
    pub routes: Arc<dyn RoutePlanner>,
    pub rides: Arc<dyn RideBackend>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppContext {
    /// Wire the production clients from `config`.
    pub async fn new(config: Config) -> error::Result<Self> {
        let store = Arc::new(AppStore::open(config.store_path()));
        let session = SessionHandle::persisted(store.clone());
        let auth: Arc<dyn PhoneAuthProvider> =
            Arc::new(IdentityToolkitClient::from_config(&config));
        let routes: Arc<dyn RoutePlanner> = Arc::new(RouteService::new(
            MapsClient::from_config(&config),
            config.fare,
        ));

        let db = Arc::new(FirestoreDb::new(&config.gcp_project_id, &session, auth.clone()).await?);
        tracing::info!(project = %config.gcp_project_id, "App context ready");

        Ok(Self {
            config,
            store,
            session,
            auth,
            routes,
            rides: db.clone(),
            users: db,
        })
    }

    /// Country preselected on the phone entry screen.
    pub fn default_country(&self) -> Country {
        Country::by_code(&self.config.default_country_code).unwrap_or_default()
    }

    pub fn phone_sign_in(&self) -> PhoneSignIn {
        PhoneSignIn::new(self.auth.clone(), self.store.clone()).with_country(self.default_country())
    }

    pub fn code_verification(&self) -> CodeVerification {
        CodeVerification::new(
            self.auth.clone(),
            self.users.clone(),
            self.store.clone(),
            self.session.clone(),
        )
    }

    pub fn auth_observer(&self) -> AuthStateObserver {
        AuthStateObserver::new(self.users.clone(), self.store.clone(), self.session.clone())
    }

    pub fn ride_request(&self, user_id: impl Into<String>) -> RideRequestFlow {
        RideRequestFlow::new(self.routes.clone(), self.rides.clone(), user_id)
    }

    pub fn account_setup(&self) -> AccountSetup {
        AccountSetup::new(self.users.clone(), self.store.clone())
    }

    pub fn ride_history(&self, user_id: impl Into<String>) -> RideHistory {
        RideHistory::new(self.rides.clone(), user_id)
    }

    pub fn ride_rating(&self, ride_id: impl Into<String>) -> RideRating {
        RideRating::new(self.rides.clone(), ride_id)
    }
}
