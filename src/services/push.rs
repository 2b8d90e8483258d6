// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Forwards push messaging tokens to the backend when they change.

use crate::error::Result;
use crate::services::api::FriendApi;
use crate::services::session::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTokenOutcome {
    Saved,
    Unchanged,
    NotLoggedIn,
}

pub struct PushTokenRegistrar {
    api: Arc<dyn FriendApi>,
    sessions: Arc<SessionStore>,
    /// Last token the backend accepted, per user.
    last_saved: Mutex<Option<(String, String)>>,
}

impl PushTokenRegistrar {
    pub fn new(api: Arc<dyn FriendApi>, sessions: Arc<SessionStore>) -> Self {
        Self {
            api,
            sessions,
            last_saved: Mutex::new(None),
        }
    }

    /// Send `token` unless logged out or already saved for this user.
    ///
    /// The lock is held across the request so two concurrent calls with the
    /// same token produce one update.
    pub async fn save_token_if_needed(&self, token: &str) -> Result<PushTokenOutcome> {
        let Some(user_id) = self.sessions.current_user_id().await else {
            tracing::debug!("No session, deferring push token registration");
            return Ok(PushTokenOutcome::NotLoggedIn);
        };

        let mut last_saved = self.last_saved.lock().await;
        if let Some((saved_user, saved_token)) = last_saved.as_ref() {
            if *saved_user == user_id && saved_token == token {
                return Ok(PushTokenOutcome::Unchanged);
            }
        }

        if let Err(e) = self.api.update_push_token(&user_id, token).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to save push token");
            return Err(e);
        }

        tracing::info!(user_id = %user_id, "Push token saved");
        *last_saved = Some((user_id, token.to_string()));
        Ok(PushTokenOutcome::Saved)
    }
}
