// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding state machine: which top-level screen is shown.
//!
//! The current screen is stored explicitly and persisted on every change so
//! a relaunch resumes where the user left off. Transitions are computed by
//! the pure [`next_screen`] function from the current screen, what just
//! happened, and the tracked facts (logged in, username, permissions).

use crate::db::{keys, KeyValueStore};
use crate::error::Result;
use crate::models::AppScreen;
use crate::services::api::{FriendApi, UpdateProfileRequest};
use crate::services::permissions::{PermissionFlags, PermissionState};
use crate::services::session::SessionStore;
use std::sync::Arc;
use tokio::sync::watch;

/// What just happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A session was restored or created.
    LoggedIn,
    /// The session ended (sign-out or forced logout).
    LoggedOut,
    /// The user picked a username.
    UsernameSet,
    /// Explicit "next" from the current screen.
    Next,
    /// A permission status check completed.
    PermissionsChecked,
}

/// Inputs the transition depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub logged_in: bool,
    pub has_username: bool,
    pub has_permissions: bool,
}

/// Where a freshly logged-in user goes.
fn after_login(facts: Facts) -> AppScreen {
    if !facts.has_username {
        AppScreen::Username
    } else {
        after_username(facts)
    }
}

fn after_username(facts: Facts) -> AppScreen {
    if facts.has_permissions {
        AppScreen::Main
    } else {
        AppScreen::Permissions
    }
}

/// Transition function. Deterministic; `main`/`complete` only leave on logout.
pub fn next_screen(current: AppScreen, trigger: Trigger, facts: Facts) -> AppScreen {
    if !facts.logged_in || trigger == Trigger::LoggedOut {
        return AppScreen::Login;
    }

    match (current, trigger) {
        (AppScreen::Login, Trigger::LoggedIn | Trigger::Next) => after_login(facts),
        (AppScreen::Username, Trigger::UsernameSet | Trigger::Next) if facts.has_username => {
            after_username(facts)
        }
        (AppScreen::Notifications, Trigger::Next) => AppScreen::Contacts,
        (AppScreen::Contacts | AppScreen::Permissions, Trigger::Next | Trigger::PermissionsChecked) => {
            after_username(facts)
        }
        (current, _) => current,
    }
}

/// Observable onboarding state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OnboardingSnapshot {
    pub screen: AppScreen,
    pub is_logged_in: bool,
    pub username: String,
}

pub struct OnboardingStateMachine {
    store: Arc<dyn KeyValueStore>,
    sessions: Arc<SessionStore>,
    permissions: Arc<PermissionState>,
    api: Arc<dyn FriendApi>,
    state: watch::Sender<OnboardingSnapshot>,
}

impl OnboardingStateMachine {
    /// Create the state machine from the persisted screen, login flag and
    /// username. Call [`Self::bootstrap`] before use.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        sessions: Arc<SessionStore>,
        permissions: Arc<PermissionState>,
        api: Arc<dyn FriendApi>,
    ) -> Self {
        let persisted = load_persisted(store.as_ref());
        tracing::debug!(
            screen = %persisted.screen,
            is_logged_in = persisted.is_logged_in,
            "Loaded persisted onboarding state"
        );

        let (state, _) = watch::channel(persisted);
        Self {
            store,
            sessions,
            permissions,
            api,
            state,
        }
    }

    pub fn snapshot(&self) -> OnboardingSnapshot {
        self.state.borrow().clone()
    }

    pub fn current_screen(&self) -> AppScreen {
        self.state.borrow().screen
    }

    pub fn subscribe(&self) -> watch::Receiver<OnboardingSnapshot> {
        self.state.subscribe()
    }

    /// Mutate, transition and persist as one observable step.
    fn apply(&self, trigger: Trigger, update: impl FnOnce(&mut OnboardingSnapshot)) -> AppScreen {
        let has_permissions = self.permissions.has_permissions();

        self.state.send_modify(|s| {
            update(s);
            let facts = Facts {
                logged_in: s.is_logged_in,
                has_username: !s.username.trim().is_empty(),
                has_permissions,
            };
            let from = s.screen;
            s.screen = next_screen(from, trigger, facts);
            if from != s.screen {
                tracing::info!(from = %from, to = %s.screen, ?trigger, "Screen changed");
            }
        });

        let snapshot = self.snapshot();
        self.persist(&snapshot);
        snapshot.screen
    }

    fn persist(&self, snapshot: &OnboardingSnapshot) {
        let result = self
            .store
            .set_string(keys::CURRENT_SCREEN, snapshot.screen.as_str())
            .and_then(|_| self.store.set_bool(keys::IS_LOGGED_IN, snapshot.is_logged_in))
            .and_then(|_| {
                if snapshot.username.is_empty() {
                    self.store.delete(keys::USERNAME)
                } else {
                    self.store.set_string(keys::USERNAME, &snapshot.username)
                }
            });

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist onboarding state");
        }
    }

    // ─── Launch ──────────────────────────────────────────────────────────────

    /// Restore the session, check permissions and pick the launch screen.
    ///
    /// Without a session the app starts at login. With one, a persisted
    /// login screen is re-derived; any other persisted screen is resumed.
    pub async fn bootstrap(&self) -> AppScreen {
        let session = self.sessions.restore().await;
        self.permissions.current_status().await;

        match session {
            None => self.apply(Trigger::LoggedOut, |s| {
                s.is_logged_in = false;
                s.username.clear();
            }),
            Some(_) => {
                self.apply(Trigger::LoggedIn, |s| s.is_logged_in = true);
                self.apply(Trigger::PermissionsChecked, |_| {})
            }
        }
    }

    // ─── Public transitions ──────────────────────────────────────────────────

    pub fn set_logged_in(&self, value: bool) -> AppScreen {
        let trigger = if value {
            Trigger::LoggedIn
        } else {
            Trigger::LoggedOut
        };
        self.apply(trigger, |s| {
            s.is_logged_in = value;
            if !value {
                s.username.clear();
            }
        })
    }

    pub fn set_username(&self, username: &str) -> AppScreen {
        let username = username.trim().to_string();
        self.apply(Trigger::UsernameSet, |s| s.username = username)
    }

    /// Explicit "next". A no-op on terminal screens.
    pub async fn move_to_next_screen(&self) -> AppScreen {
        let current = self.current_screen();
        if current.is_terminal() {
            tracing::debug!(screen = %current, "Already on a terminal screen");
            return current;
        }
        if matches!(current, AppScreen::Contacts | AppScreen::Permissions) {
            self.permissions.current_status().await;
        }
        self.apply(Trigger::Next, |_| {})
    }

    /// Re-query permissions and advance the permission screens if granted.
    pub async fn check_permission_states(&self) -> PermissionFlags {
        let flags = self.permissions.current_status().await;
        self.apply(Trigger::PermissionsChecked, |_| {});
        flags
    }

    /// Sign out remotely, then reset screen, login flag and username in one
    /// step. The local reset happens even if the remote call fails; that
    /// error is returned afterwards.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.sessions.sign_out().await;
        self.reset_logged_out();
        result
    }

    /// Forced logout after the session store gave up on the session.
    pub fn handle_session_lost(&self) {
        if self.state.borrow().is_logged_in {
            tracing::warn!("Session lost, returning to login");
            self.reset_logged_out();
        }
    }

    fn reset_logged_out(&self) {
        self.apply(Trigger::LoggedOut, |s| {
            s.is_logged_in = false;
            s.username.clear();
        });
    }

    // ─── Sign-in flow ────────────────────────────────────────────────────────

    pub async fn request_otp(&self, phone_number: &str) -> Result<()> {
        self.sessions.sign_in_with_phone(phone_number).await
    }

    /// Verify the code, seed the username from the server profile, then
    /// enter the logged-in flow.
    ///
    /// A failed profile fetch is treated as "no username yet".
    pub async fn complete_sign_in(&self, phone_number: &str, code: &str) -> Result<AppScreen> {
        let session = self.sessions.verify_otp(phone_number, code).await?;

        let username = match self.api.fetch_profile().await {
            Ok(profile) => profile.username().map(str::to_string).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Profile fetch failed after sign-in");
                String::new()
            }
        };

        self.permissions.current_status().await;

        Ok(self.apply(Trigger::LoggedIn, |s| {
            s.screen = AppScreen::Login;
            s.is_logged_in = true;
            s.username = username;
        }))
    }

    /// Save a username on the server, then record it locally.
    pub async fn choose_username(&self, username: &str) -> Result<AppScreen> {
        let request = UpdateProfileRequest::new(username)?;
        let profile = self.api.update_profile(&request.username).await?;
        let saved = profile.username().unwrap_or(&request.username).to_string();
        Ok(self.set_username(&saved))
    }

    pub async fn request_notifications(&self) -> bool {
        let granted = self.permissions.request_notifications().await;
        self.check_permission_states().await;
        granted
    }

    pub async fn request_contacts(&self) -> bool {
        let granted = self.permissions.request_contacts().await;
        self.check_permission_states().await;
        granted
    }
}

fn load_persisted(store: &dyn KeyValueStore) -> OnboardingSnapshot {
    let screen = match store.get_string(keys::CURRENT_SCREEN) {
        Ok(Some(tag)) => tag.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unknown persisted screen");
            AppScreen::Login
        }),
        Ok(None) => AppScreen::Login,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted screen");
            AppScreen::Login
        }
    };

    OnboardingSnapshot {
        screen,
        is_logged_in: store.get_bool(keys::IS_LOGGED_IN).unwrap_or(false),
        username: store
            .get_string(keys::USERNAME)
            .ok()
            .flatten()
            .unwrap_or_default(),
    }
}
