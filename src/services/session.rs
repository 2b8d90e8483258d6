// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session ownership: persistence, restore, refresh and sign-out.
//!
//! Handles:
//! - Restoring the persisted session on launch (corrupt bytes are dropped)
//! - OTP sign-in and verification
//! - Proactive token refresh before expiry, one refresh at a time
//! - Sign-out that always clears local state

use crate::db::{keys, KeyValueStore};
use crate::error::{AppError, Result};
use crate::models::Session;
use crate::services::auth::AuthBackend;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Login state as seen by consumers of [`SessionStore::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    LoggedOut,
    LoggedIn { user_id: String },
}

/// Owns the single active session of the process.
pub struct SessionStore {
    auth: Arc<dyn AuthBackend>,
    store: Arc<dyn KeyValueStore>,
    session: RwLock<Option<Session>>,
    /// Serializes refresh operations so concurrent callers share one refresh.
    refresh_lock: Mutex<()>,
    status: watch::Sender<AuthStatus>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        let (status, _) = watch::channel(AuthStatus::LoggedOut);
        Self {
            auth,
            store,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            status,
        }
    }

    /// Watch login state changes (sign-in, sign-out, forced logout).
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn current_user_id(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.user_id.clone())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    // ─── Persistence ─────────────────────────────────────────────────────────

    /// Load the persisted session, if any.
    ///
    /// Bytes that fail to decode are treated as no session and deleted, so a
    /// corrupt blob is never retried on the next launch.
    pub async fn restore(&self) -> Option<Session> {
        let bytes = match self.store.get(keys::SESSION) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, "Restored saved session");
                self.install(session.clone()).await;
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted session is corrupt, discarding");
                if let Err(e) = self.store.delete(keys::SESSION) {
                    tracing::warn!(error = %e, "Failed to delete corrupt session");
                }
                None
            }
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        let bytes = serde_json::to_vec(session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode session: {}", e)))?;
        self.store.set(keys::SESSION, &bytes)?;
        Ok(())
    }

    async fn install(&self, session: Session) {
        let user_id = session.user_id.clone();
        *self.session.write().await = Some(session);
        self.status.send_replace(AuthStatus::LoggedIn { user_id });
    }

    /// Drop the session from memory and disk and tell subscribers.
    async fn clear(&self) -> Option<Session> {
        let previous = self.session.write().await.take();
        if let Err(e) = self.store.delete(keys::SESSION) {
            tracing::warn!(error = %e, "Failed to delete persisted session");
        }
        self.status.send_replace(AuthStatus::LoggedOut);
        previous
    }

    // ─── Sign-in ─────────────────────────────────────────────────────────────

    /// Ask the identity provider to text a one-time code. No local state changes.
    pub async fn sign_in_with_phone(&self, phone_number: &str) -> Result<()> {
        let phone = phone_number.trim();
        if phone.is_empty() {
            return Err(AppError::BadRequest("Phone number is required".to_string()));
        }
        self.auth.sign_in_with_otp(phone).await
    }

    /// Exchange an SMS code for a session, persisting it on success.
    pub async fn verify_otp(&self, phone_number: &str, code: &str) -> Result<Session> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest("Verification code is required".to_string()));
        }

        let session = self.auth.verify_otp(phone_number.trim(), code).await?;
        self.persist(&session)?;
        self.install(session.clone()).await;

        tracing::info!(user_id = %session.user_id, "OTP verified, session stored");
        Ok(session)
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Exchange the refresh token of `session` for a new session.
    ///
    /// A rejected refresh token ends the session: persisted bytes are
    /// cleared, subscribers see `LoggedOut`, and `SessionInvalid` is
    /// returned. Transient failures (network, 5xx) leave the session alone.
    pub async fn refresh(&self, session: &Session) -> Result<Session> {
        match self.auth.refresh_session(&session.refresh_token).await {
            Ok(new_session) => {
                self.persist(&new_session)?;
                self.install(new_session.clone()).await;
                tracing::info!(user_id = %new_session.user_id, "Session refreshed");
                Ok(new_session)
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "Session refresh failed transiently");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %session.user_id,
                    error = %e,
                    "Session refresh rejected, signing out locally"
                );
                self.clear().await;
                Err(AppError::SessionInvalid(e.to_string()))
            }
        }
    }

    /// Get a non-expiring access token, refreshing first if needed.
    ///
    /// 1. Fast path: current token is valid beyond the margin
    /// 2. Acquire the refresh lock
    /// 3. Re-check: another task may have refreshed while we waited
    /// 4. Refresh
    pub async fn access_token(&self) -> Result<String> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        {
            let guard = self.session.read().await;
            let session = guard.as_ref().ok_or(AppError::NotLoggedIn)?;
            if !session.expires_within(Utc::now(), margin) {
                return Ok(session.access_token.clone());
            }
        }

        let _guard = self.refresh_lock.lock().await;

        let session = self.current().await.ok_or(AppError::NotLoggedIn)?;
        if !session.expires_within(Utc::now(), margin) {
            return Ok(session.access_token);
        }

        tracing::info!(user_id = %session.user_id, "Access token expiring, refreshing");
        let refreshed = self.refresh(&session).await?;
        Ok(refreshed.access_token)
    }

    // ─── Sign-out ────────────────────────────────────────────────────────────

    /// Revoke the session server-side and clear it locally.
    ///
    /// Local state is cleared even when the revoke call fails; the revoke
    /// error is still returned so the caller can report it.
    pub async fn sign_out(&self) -> Result<()> {
        let session = self.current().await;

        let revoke = match &session {
            Some(s) => self.auth.sign_out(&s.access_token).await,
            None => Ok(()),
        };

        self.clear().await;

        match revoke {
            Ok(()) => {
                tracing::info!("Signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote sign-out failed; local session cleared");
                Err(e)
            }
        }
    }
}
