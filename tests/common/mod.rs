// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stub backends and a test harness shared by the integration tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use real_friends::db::{KeyValueStore, MemoryStore};
use real_friends::error::{AppError, Result};
use real_friends::models::{
    ContactMatch, FriendRequest, FriendRequestStatus, Friendship, Profile, Session,
};
use real_friends::services::api::match_in_batches;
use real_friends::services::{
    AuthBackend, ContactSource, FriendApi, LocalContact, PermissionProvider, PermissionState,
    PermissionStatus, SessionStore,
};
use real_friends::App;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Id of the signed-in user in every stub.
#[allow(dead_code)]
pub const ME: &str = "user-me";

/// The only code [`StubAuth`] accepts.
#[allow(dead_code)]
pub const VALID_CODE: &str = "123456";

#[allow(dead_code)]
pub const PHONE: &str = "+15555550100";

// ─── Auth ────────────────────────────────────────────────────────────────────

/// How [`StubAuth`] answers a refresh.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Succeed,
    Reject,
    Transient,
}

pub struct StubAuth {
    pub otp_requests: Mutex<Vec<String>>,
    pub refreshes: AtomicUsize,
    pub sign_outs: AtomicUsize,
    pub fail_sign_out: AtomicBool,
    refresh_mode: Mutex<RefreshMode>,
    session_ttl: Mutex<Duration>,
}

#[allow(dead_code)]
impl StubAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            otp_requests: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
            sign_outs: AtomicUsize::new(0),
            fail_sign_out: AtomicBool::new(false),
            refresh_mode: Mutex::new(RefreshMode::Succeed),
            session_ttl: Mutex::new(Duration::hours(1)),
        })
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock().unwrap() = mode;
    }

    /// Lifetime of sessions issued by `verify_otp`.
    pub fn set_session_ttl(&self, ttl: Duration) {
        *self.session_ttl.lock().unwrap() = ttl;
    }
}

#[async_trait]
impl AuthBackend for StubAuth {
    async fn sign_in_with_otp(&self, phone: &str) -> Result<()> {
        self.otp_requests.lock().unwrap().push(phone.to_string());
        Ok(())
    }

    async fn verify_otp(&self, _phone: &str, code: &str) -> Result<Session> {
        if code != VALID_CODE {
            return Err(AppError::Auth("Invalid or expired code".to_string()));
        }
        let ttl = *self.session_ttl.lock().unwrap();
        Ok(session("access-1", "refresh-1", ttl))
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<Session> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        // Give concurrent callers a chance to pile up on the refresh lock.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let mode = *self.refresh_mode.lock().unwrap();
        match mode {
            RefreshMode::Succeed => Ok(session(
                &format!("access-{}", n + 1),
                &format!("refresh-{}", n + 1),
                Duration::hours(1),
            )),
            RefreshMode::Reject => Err(AppError::SessionInvalid(
                "refresh token rejected".to_string(),
            )),
            RefreshMode::Transient => Err(AppError::Network("connection reset".to_string())),
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AppError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

// ─── Friend API ──────────────────────────────────────────────────────────────

/// In-memory friend backend that records every call.
pub struct StubFriendApi {
    pub profile: Mutex<Profile>,
    pub fail_profile: AtomicBool,
    pub friendships: Mutex<Vec<Friendship>>,
    pub fail_friends: AtomicBool,
    pub pending: Mutex<Vec<FriendRequest>>,
    pub fail_pending: AtomicBool,
    /// Users the contact matcher knows, as `(phone, user id, username)`.
    pub registered: Mutex<Vec<(String, String, Option<String>)>>,
    pub fail_match: AtomicBool,
    pub match_batches: Mutex<Vec<usize>>,
    pub sent_requests: Mutex<Vec<String>>,
    pub responses: Mutex<Vec<(String, bool)>>,
    /// Delay applied to `respond_to_friend_request`.
    pub respond_delay_ms: AtomicUsize,
    pub push_tokens: Mutex<Vec<(String, String)>>,
    pub fail_push: AtomicBool,
}

#[allow(dead_code)]
impl StubFriendApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            profile: Mutex::new(profile(ME, None)),
            fail_profile: AtomicBool::new(false),
            friendships: Mutex::new(Vec::new()),
            fail_friends: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            fail_pending: AtomicBool::new(false),
            registered: Mutex::new(Vec::new()),
            fail_match: AtomicBool::new(false),
            match_batches: Mutex::new(Vec::new()),
            sent_requests: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            respond_delay_ms: AtomicUsize::new(0),
            push_tokens: Mutex::new(Vec::new()),
            fail_push: AtomicBool::new(false),
        })
    }

    pub fn set_username(&self, username: Option<&str>) {
        self.profile.lock().unwrap().username = username.map(str::to_string);
    }

    pub fn register(&self, phone: &str, user_id: &str, username: Option<&str>) {
        self.registered.lock().unwrap().push((
            phone.to_string(),
            user_id.to_string(),
            username.map(str::to_string),
        ));
    }
}

fn unavailable() -> AppError {
    AppError::BadStatus {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl FriendApi for StubFriendApi {
    async fn fetch_profile(&self) -> Result<Profile> {
        if self.fail_profile.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn update_profile(&self, username: &str) -> Result<Profile> {
        let mut profile = self.profile.lock().unwrap();
        profile.username = Some(username.to_string());
        Ok(profile.clone())
    }

    async fn match_contacts(&self, phone_numbers: &[String]) -> Result<Vec<ContactMatch>> {
        if self.fail_match.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        match_in_batches(phone_numbers, |batch| {
            self.match_batches.lock().unwrap().push(batch.len());
            let registered = self.registered.lock().unwrap();
            let found: Vec<ContactMatch> = batch
                .iter()
                .filter_map(|number| {
                    registered
                        .iter()
                        .find(|(phone, _, _)| phone == number)
                        .map(|(phone, id, username)| ContactMatch {
                            id: id.clone(),
                            username: username.clone(),
                            phone_number: Some(phone.clone()),
                        })
                })
                .collect();
            async move { Ok(found) }
        })
        .await
    }

    async fn send_friend_request(&self, to_user_id: &str) -> Result<()> {
        self.sent_requests
            .lock()
            .unwrap()
            .push(to_user_id.to_string());
        Ok(())
    }

    async fn get_pending_friend_requests(&self) -> Result<Vec<FriendRequest>> {
        if self.fail_pending.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn respond_to_friend_request(&self, request_id: &str, accept: bool) -> Result<()> {
        let delay = self.respond_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        self.responses
            .lock()
            .unwrap()
            .push((request_id.to_string(), accept));

        let removed = {
            let mut pending = self.pending.lock().unwrap();
            let index = pending.iter().position(|r| r.id == request_id);
            index.map(|i| pending.remove(i))
        };
        if let (Some(request), true) = (removed, accept) {
            self.friendships.lock().unwrap().push(friendship(
                &format!("f-{}", request.id),
                &request.from_user_id,
                &request.to_user_id,
            ));
        }
        Ok(())
    }

    async fn get_friends(&self) -> Result<Vec<Friendship>> {
        if self.fail_friends.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.friendships.lock().unwrap().clone())
    }

    async fn update_push_token(&self, user_id: &str, token: &str) -> Result<()> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.push_tokens
            .lock()
            .unwrap()
            .push((user_id.to_string(), token.to_string()));
        Ok(())
    }
}

// ─── Platform capabilities ───────────────────────────────────────────────────

/// Permission provider whose status can be changed mid-test.
pub struct TestPermission {
    status: Mutex<PermissionStatus>,
    /// Status the OS prompt resolves to.
    answer: PermissionStatus,
    pub prompts: AtomicUsize,
}

#[allow(dead_code)]
impl TestPermission {
    pub fn new(initial: PermissionStatus, answer: PermissionStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(initial),
            answer,
            prompts: AtomicUsize::new(0),
        })
    }

    /// Simulate the user flipping the switch in system settings.
    pub fn set(&self, status: PermissionStatus) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl PermissionProvider for TestPermission {
    async fn status(&self) -> Result<PermissionStatus> {
        Ok(*self.status.lock().unwrap())
    }

    async fn request(&self) -> Result<PermissionStatus> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap() = self.answer;
        Ok(self.answer)
    }
}

pub struct StubContacts(pub Mutex<Vec<LocalContact>>);

#[async_trait]
impl ContactSource for StubContacts {
    async fn enumerate(&self) -> Result<Vec<LocalContact>> {
        Ok(self.0.lock().unwrap().clone())
    }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub fn session(access: &str, refresh: &str, ttl: Duration) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        user_id: ME.to_string(),
        expires_at: Utc::now() + ttl,
    }
}

pub fn profile(id: &str, username: Option<&str>) -> Profile {
    Profile {
        id: id.to_string(),
        username: username.map(str::to_string),
        phone_number: None,
        avatar_url: None,
        created_at: None,
        updated_at: None,
    }
}

#[allow(dead_code)]
pub fn request(id: &str, from: &str, to: &str) -> FriendRequest {
    FriendRequest {
        id: id.to_string(),
        from_user_id: from.to_string(),
        to_user_id: to.to_string(),
        status: FriendRequestStatus::Pending,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
        from_user: Some(profile(from, Some(from))),
        to_user: Some(profile(to, Some(to))),
        direction: None,
    }
}

pub fn friendship(id: &str, user1: &str, user2: &str) -> Friendship {
    Friendship {
        id: id.to_string(),
        user1_id: user1.to_string(),
        user2_id: user2.to_string(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
        friend: None,
        user1: Some(profile(user1, Some(user1))),
        user2: Some(profile(user2, Some(user2))),
    }
}

#[allow(dead_code)]
pub fn local_contact(name: &str, phones: &[&str]) -> LocalContact {
    LocalContact {
        name: name.to_string(),
        phone_numbers: phones.iter().map(|p| p.to_string()).collect(),
    }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

/// A fully wired [`App`] over stub backends.
#[allow(dead_code)]
pub struct Harness {
    pub app: App,
    pub store: Arc<dyn KeyValueStore>,
    pub auth: Arc<StubAuth>,
    pub api: Arc<StubFriendApi>,
    pub notifications: Arc<TestPermission>,
    pub contacts: Arc<TestPermission>,
    pub address_book: Arc<StubContacts>,
}

pub struct HarnessBuilder {
    store: Arc<dyn KeyValueStore>,
    auth: Arc<StubAuth>,
    api: Arc<StubFriendApi>,
    notifications: Arc<TestPermission>,
    contacts: Arc<TestPermission>,
    address_book: Vec<LocalContact>,
}

#[allow(dead_code)]
impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            auth: StubAuth::new(),
            api: StubFriendApi::new(),
            notifications: TestPermission::new(
                PermissionStatus::Granted,
                PermissionStatus::Granted,
            ),
            contacts: TestPermission::new(PermissionStatus::Granted, PermissionStatus::Granted),
            address_book: Vec::new(),
        }
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    pub fn api(mut self, api: Arc<StubFriendApi>) -> Self {
        self.api = api;
        self
    }

    pub fn permissions(
        mut self,
        notifications: Arc<TestPermission>,
        contacts: Arc<TestPermission>,
    ) -> Self {
        self.notifications = notifications;
        self.contacts = contacts;
        self
    }

    pub fn address_book(mut self, contacts: Vec<LocalContact>) -> Self {
        self.address_book = contacts;
        self
    }

    pub fn build(self) -> Harness {
        let sessions = Arc::new(SessionStore::new(
            self.auth.clone(),
            Arc::clone(&self.store),
        ));
        let permissions = Arc::new(PermissionState::new(
            self.notifications.clone(),
            self.contacts.clone(),
        ));
        let address_book = Arc::new(StubContacts(Mutex::new(self.address_book)));

        let app = App::assemble(
            Arc::clone(&self.store),
            sessions,
            self.api.clone(),
            permissions,
            address_book.clone(),
        );

        Harness {
            app,
            store: self.store,
            auth: self.auth,
            api: self.api,
            notifications: self.notifications,
            contacts: self.contacts,
            address_book,
        }
    }
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        HarnessBuilder::new().build()
    }

    /// Bootstrap, then sign in with the valid code.
    pub async fn signed_in(&self) -> Result<real_friends::models::AppScreen> {
        self.app.onboarding.bootstrap().await;
        self.app.onboarding.complete_sign_in(PHONE, VALID_CODE).await
    }
}
