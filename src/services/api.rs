// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend graph REST client.
//!
//! Handles:
//! - Bearer auth on every call (token fetched fresh from the session store)
//! - Profile fetch/update
//! - Contact matching in batches of at most 100 numbers
//! - Friend requests and friendships

use crate::error::{AppError, Result};
use crate::models::{ContactMatch, FriendRequest, Friendship, Profile};
use crate::services::http::{decode_json, execute, HttpPolicy};
use crate::services::session::SessionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use validator::{Validate, ValidationError};

/// Maximum phone numbers per contact-match request.
pub const MATCH_BATCH_SIZE: usize = 100;

/// Typed boundary to the profile/friend backend.
#[async_trait]
pub trait FriendApi: Send + Sync {
    /// `GET /users/me/profile`
    async fn fetch_profile(&self) -> Result<Profile>;

    /// `PATCH /users/me/profile`
    async fn update_profile(&self, username: &str) -> Result<Profile>;

    /// `POST /friends/contacts/match`, split into batches of [`MATCH_BATCH_SIZE`].
    async fn match_contacts(&self, phone_numbers: &[String]) -> Result<Vec<ContactMatch>>;

    /// `POST /friends/request/{to_user_id}`
    async fn send_friend_request(&self, to_user_id: &str) -> Result<()>;

    /// `GET /friends/requests/pending` (both directions)
    async fn get_pending_friend_requests(&self) -> Result<Vec<FriendRequest>>;

    /// `POST /friends/request/{request_id}/respond`
    async fn respond_to_friend_request(&self, request_id: &str, accept: bool) -> Result<()>;

    /// `GET /friends`
    async fn get_friends(&self) -> Result<Vec<Friendship>>;

    /// `PATCH /users/{user_id}/fcm-token`
    async fn update_push_token(&self, user_id: &str, token: &str) -> Result<()>;
}

/// Body of `PATCH /users/me/profile`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 3, max = 30, message = "must be 3-30 characters"),
        custom(function = "validate_username_chars")
    )]
    pub username: String,
}

impl UpdateProfileRequest {
    /// Trim and validate a username.
    pub fn new(username: &str) -> Result<Self> {
        let request = Self {
            username: username.trim().to_string(),
        };
        request
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Invalid username: {}", e)))?;
        Ok(request)
    }
}

fn validate_username_chars(username: &str) -> std::result::Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_chars")
            .with_message("only letters, digits, '_' and '.' are allowed".into()))
    }
}

#[derive(Serialize)]
struct MatchContactsBody<'a> {
    #[serde(rename = "phoneNumbers")]
    phone_numbers: &'a [String],
}

#[derive(Serialize)]
struct RespondBody {
    accept: bool,
}

#[derive(Serialize)]
struct PushTokenBody<'a> {
    fcm_token: &'a str,
}

/// Run `match_batch` over `phone_numbers` in order, at most
/// [`MATCH_BATCH_SIZE`] numbers at a time, concatenating the results.
///
/// The first failing batch fails the whole match.
pub async fn match_in_batches<F, Fut>(
    phone_numbers: &[String],
    mut match_batch: F,
) -> Result<Vec<ContactMatch>>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<ContactMatch>>>,
{
    let mut all_matches = Vec::new();
    for batch in phone_numbers.chunks(MATCH_BATCH_SIZE) {
        let matches = match_batch(batch.to_vec()).await?;
        all_matches.extend(matches);
    }
    Ok(all_matches)
}

/// reqwest-backed [`FriendApi`].
#[derive(Clone)]
pub struct FriendGraphClient {
    http: reqwest::Client,
    policy: HttpPolicy,
    base_url: String,
    sessions: Arc<SessionStore>,
}

impl FriendGraphClient {
    pub fn new(base_url: &str, sessions: Arc<SessionStore>, policy: HttpPolicy) -> Result<Self> {
        Ok(Self {
            http: policy.build_client()?,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        label: &'static str,
    ) -> Result<T> {
        let token = self.sessions.access_token().await?;
        let url = self.url(path);
        let response = execute(&self.policy, true, label, || {
            self.http.get(&url).bearer_auth(&token)
        })
        .await?;
        decode_json(response).await
    }

    async fn match_batch(&self, batch: Vec<String>) -> Result<Vec<ContactMatch>> {
        let token = self.sessions.access_token().await?;
        let url = self.url("/friends/contacts/match");
        let body = MatchContactsBody {
            phone_numbers: &batch,
        };

        // Matching is a read; safe to retry.
        let response = execute(&self.policy, true, "friends.match_contacts", || {
            self.http.post(&url).bearer_auth(&token).json(&body)
        })
        .await?;
        decode_json(response).await
    }
}

#[async_trait]
impl FriendApi for FriendGraphClient {
    async fn fetch_profile(&self) -> Result<Profile> {
        self.get_json("/users/me/profile", "profile.fetch").await
    }

    async fn update_profile(&self, username: &str) -> Result<Profile> {
        let body = UpdateProfileRequest::new(username)?;
        let token = self.sessions.access_token().await?;
        let url = self.url("/users/me/profile");

        tracing::info!(username = %body.username, "Updating profile");

        let response = execute(&self.policy, true, "profile.update", || {
            self.http.patch(&url).bearer_auth(&token).json(&body)
        })
        .await?;
        decode_json(response).await
    }

    async fn match_contacts(&self, phone_numbers: &[String]) -> Result<Vec<ContactMatch>> {
        let matches = match_in_batches(phone_numbers, |batch| self.match_batch(batch)).await?;
        tracing::debug!(
            numbers = phone_numbers.len(),
            matches = matches.len(),
            "Contacts matched"
        );
        Ok(matches)
    }

    async fn send_friend_request(&self, to_user_id: &str) -> Result<()> {
        let token = self.sessions.access_token().await?;
        let url = self.url(&format!(
            "/friends/request/{}",
            urlencoding::encode(to_user_id)
        ));

        execute(&self.policy, false, "friends.send_request", || {
            self.http.post(&url).bearer_auth(&token)
        })
        .await?;

        tracing::info!(to_user_id, "Friend request sent");
        Ok(())
    }

    async fn get_pending_friend_requests(&self) -> Result<Vec<FriendRequest>> {
        let requests: Vec<FriendRequest> = self
            .get_json("/friends/requests/pending", "friends.pending_requests")
            .await?;
        tracing::debug!(count = requests.len(), "Fetched pending friend requests");
        Ok(requests)
    }

    async fn respond_to_friend_request(&self, request_id: &str, accept: bool) -> Result<()> {
        let token = self.sessions.access_token().await?;
        let url = self.url(&format!(
            "/friends/request/{}/respond",
            urlencoding::encode(request_id)
        ));
        let body = RespondBody { accept };

        execute(&self.policy, false, "friends.respond", || {
            self.http.post(&url).bearer_auth(&token).json(&body)
        })
        .await?;

        tracing::info!(request_id, accept, "Responded to friend request");
        Ok(())
    }

    async fn get_friends(&self) -> Result<Vec<Friendship>> {
        let friends: Vec<Friendship> = self.get_json("/friends", "friends.list").await?;
        tracing::debug!(count = friends.len(), "Fetched friends");
        Ok(friends)
    }

    async fn update_push_token(&self, user_id: &str, token: &str) -> Result<()> {
        let access_token = self.sessions.access_token().await?;
        let url = self.url(&format!("/users/{}/fcm-token", urlencoding::encode(user_id)));
        let body = PushTokenBody { fcm_token: token };

        execute(&self.policy, true, "users.push_token", || {
            self.http.patch(&url).bearer_auth(&access_token).json(&body)
        })
        .await?;
        Ok(())
    }
}
