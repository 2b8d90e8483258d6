// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Real Friends: client core for a phone-number based friends app
//!
//! This crate owns the session, onboarding flow, permission tracking and
//! friends data of the app, talking to an OTP identity provider and a
//! profile/friend REST backend.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use config::Config;
use db::{KeyValueStore, RedbStore};
use error::Result;
use services::{
    AuthStatus, ContactSource, FileContactSource, FriendApi, FriendGraphClient,
    FriendsSyncController, GoTrueAuthClient, HttpPolicy, NoContacts, OnboardingStateMachine,
    PermissionProvider, PermissionState, PermissionStatus, PushTokenRegistrar, SessionStore,
    StaticPermission,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Application services, constructed once at process start.
pub struct App {
    pub store: Arc<dyn KeyValueStore>,
    pub sessions: Arc<SessionStore>,
    pub permissions: Arc<PermissionState>,
    pub api: Arc<dyn FriendApi>,
    pub onboarding: Arc<OnboardingStateMachine>,
    pub friends: Arc<FriendsSyncController>,
    pub push: PushTokenRegistrar,
}

impl App {
    /// Wire services from already-built backends.
    pub fn assemble(
        store: Arc<dyn KeyValueStore>,
        sessions: Arc<SessionStore>,
        api: Arc<dyn FriendApi>,
        permissions: Arc<PermissionState>,
        contact_source: Arc<dyn ContactSource>,
    ) -> Self {
        let onboarding = Arc::new(OnboardingStateMachine::new(
            Arc::clone(&store),
            Arc::clone(&sessions),
            Arc::clone(&permissions),
            Arc::clone(&api),
        ));
        let friends = Arc::new(FriendsSyncController::new(
            Arc::clone(&api),
            Arc::clone(&sessions),
            Arc::clone(&permissions),
            contact_source,
        ));
        let push = PushTokenRegistrar::new(Arc::clone(&api), Arc::clone(&sessions));

        Self {
            store,
            sessions,
            permissions,
            api,
            onboarding,
            friends,
            push,
        }
    }

    /// Build the real backends described by `config`.
    ///
    /// Without a platform permission prompt, notifications count as granted
    /// only when a push token is configured and contacts only when a contacts
    /// file is.
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = HttpPolicy::from_config(config);
        let store: Arc<dyn KeyValueStore> = Arc::new(RedbStore::open(&config.state_path)?);

        let auth = Arc::new(GoTrueAuthClient::new(
            &config.auth_url,
            &config.auth_api_key,
            policy.clone(),
        )?);
        let sessions = Arc::new(SessionStore::new(auth, Arc::clone(&store)));
        let api: Arc<dyn FriendApi> = Arc::new(FriendGraphClient::new(
            &config.api_base_url,
            Arc::clone(&sessions),
            policy,
        )?);

        let notifications: Arc<dyn PermissionProvider> =
            Arc::new(StaticPermission(granted_if(config.push_token.is_some())));
        let contacts: Arc<dyn PermissionProvider> =
            Arc::new(StaticPermission(granted_if(config.contacts_file.is_some())));
        let permissions = Arc::new(PermissionState::new(notifications, contacts));

        let contact_source: Arc<dyn ContactSource> = match &config.contacts_file {
            Some(path) => Arc::new(FileContactSource::new(path)),
            None => Arc::new(NoContacts),
        };

        Ok(Self::assemble(store, sessions, api, permissions, contact_source))
    }

    /// Start the resync listener and the session watcher.
    pub fn spawn_background(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.friends.spawn_resync_listener(),
            self.spawn_session_watcher(),
        ]
    }

    /// Force a logout in onboarding and drop friends data whenever the
    /// session store reports `LoggedOut`.
    fn spawn_session_watcher(&self) -> JoinHandle<()> {
        let onboarding = Arc::clone(&self.onboarding);
        let friends = Arc::clone(&self.friends);
        let mut status = self.sessions.subscribe();

        tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let logged_out = *status.borrow_and_update() == AuthStatus::LoggedOut;
                if logged_out {
                    onboarding.handle_session_lost();
                    friends.reset();
                }
            }
        })
    }
}

fn granted_if(granted: bool) -> PermissionStatus {
    if granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    }
}
