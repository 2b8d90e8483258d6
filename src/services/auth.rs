// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone OTP identity provider client.
//!
//! Speaks the GoTrue-style REST dialect used by Supabase Auth:
//! - `POST /otp` sends the SMS code
//! - `POST /verify` exchanges the code for a session
//! - `POST /token?grant_type=refresh_token` refreshes a session
//! - `POST /logout` revokes the session

use crate::error::{AppError, Result};
use crate::models::Session;
use crate::services::http::{decode_json, execute, HttpPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Boundary to the identity provider.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Ask the provider to text a one-time code to `phone`.
    async fn sign_in_with_otp(&self, phone: &str) -> Result<()>;

    /// Exchange an SMS code for a session.
    async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Revoke the session identified by `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// reqwest-backed [`AuthBackend`].
#[derive(Clone)]
pub struct GoTrueAuthClient {
    http: reqwest::Client,
    policy: HttpPolicy,
    base_url: String,
    api_key: String,
}

impl GoTrueAuthClient {
    pub fn new(base_url: &str, api_key: &str, policy: HttpPolicy) -> Result<Self> {
        Ok(Self {
            http: policy.build_client()?,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
    }

    async fn session_from(&self, response: reqwest::Response) -> Result<Session> {
        let body: GoTrueSessionResponse = decode_json(response).await?;
        body.into_session(Utc::now())
    }
}

#[async_trait]
impl AuthBackend for GoTrueAuthClient {
    async fn sign_in_with_otp(&self, phone: &str) -> Result<()> {
        let body = serde_json::json!({
            "phone": phone,
            "create_user": true
        });

        // Not retried: a retry could text the user a second code.
        execute(&self.policy, false, "auth.otp", || {
            self.post("/otp").json(&body)
        })
        .await
        .map_err(auth_error)?;

        tracing::info!("OTP requested");
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session> {
        let body = serde_json::json!({
            "phone": phone,
            "token": code,
            "type": "sms"
        });

        let response = execute(&self.policy, false, "auth.verify", || {
            self.post("/verify").json(&body)
        })
        .await
        .map_err(auth_error)?;

        self.session_from(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let body = serde_json::json!({ "refresh_token": refresh_token });

        let response = execute(&self.policy, false, "auth.refresh", || {
            self.post("/token")
                .query(&[("grant_type", "refresh_token")])
                .json(&body)
        })
        .await
        .map_err(|e| match e {
            AppError::Unauthorized | AppError::BadStatus { status: 400, .. } => {
                AppError::SessionInvalid("refresh token rejected".to_string())
            }
            other => other,
        })?;

        self.session_from(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        execute(&self.policy, false, "auth.logout", || {
            self.post("/logout").bearer_auth(access_token)
        })
        .await?;
        Ok(())
    }
}

/// Rejected codes come back as 4xx with a JSON message; surface them as
/// `Auth` so the login screen can show them inline.
fn auth_error(err: AppError) -> AppError {
    match err {
        AppError::BadStatus { status, body } if (400..500).contains(&status) => {
            let message = serde_json::from_str::<GoTrueErrorBody>(&body)
                .ok()
                .and_then(|b| b.msg.or(b.error_description).or(b.message))
                .unwrap_or(body);
            AppError::Auth(message)
        }
        AppError::Unauthorized => AppError::Auth("Invalid or expired code".to_string()),
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

/// Session payload returned by `/verify` and `/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct GoTrueSessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Absolute expiry (Unix seconds); newer servers send it
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: GoTrueUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoTrueUser {
    pub id: String,
}

impl GoTrueSessionResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Result<Session> {
        let expires_at = match self.expires_at {
            Some(ts) => DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| AppError::Decode(format!("Invalid expires_at: {}", ts)))?,
            None => now + Duration::seconds(self.expires_in),
        };

        Ok(Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            expires_at,
        })
    }
}
