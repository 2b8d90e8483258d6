// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friends screen data: friendships, pending requests and contact matches.
//!
//! The core workflow:
//! 1. `refresh()` loads the three lists concurrently; each list owns its
//!    loading and error flags and is replaced wholesale
//! 2. Row actions (accept, reject, send) run behind a per-item guard
//! 3. A successful action updates the list optimistically and publishes a
//!    [`FriendEvent`]; the resync listener answers with a full refresh

use crate::error::{AppError, Result};
use crate::models::{Contact, FriendRequest, Friendship};
use crate::services::api::FriendApi;
use crate::services::contacts::{ContactSource, PhoneIndex};
use crate::services::permissions::PermissionState;
use crate::services::session::SessionStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Capacity of the mutation event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Mutation that invalidates the friends lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendEvent {
    RequestSent { contact_id: String },
    RequestResponded { request_id: String, accepted: bool },
}

/// The three lists shown on the friends screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendList {
    Friends,
    Requests,
    Contacts,
}

/// Everything the friends screen renders.
#[derive(Debug, Clone, Default)]
pub struct FriendsState {
    pub friendships: Vec<Friendship>,
    pub friend_requests: Vec<FriendRequest>,
    pub contacts: Vec<Contact>,
    pub is_loading_friends: bool,
    pub is_loading_requests: bool,
    pub is_loading_contacts: bool,
    pub friends_error: Option<String>,
    pub friend_requests_error: Option<String>,
    pub contacts_error: Option<String>,
}

/// Result of a row action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Completed,
    /// The same item already had an action in flight; nothing was sent.
    AlreadyInFlight,
}

/// Removes its key from the processing set when dropped.
struct ProcessingGuard<'a> {
    processing: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.processing.remove(&self.key);
    }
}

pub struct FriendsSyncController {
    api: Arc<dyn FriendApi>,
    sessions: Arc<SessionStore>,
    permissions: Arc<PermissionState>,
    contact_source: Arc<dyn ContactSource>,
    state: watch::Sender<FriendsState>,
    processing: DashMap<String, ()>,
    events: broadcast::Sender<FriendEvent>,
}

impl FriendsSyncController {
    pub fn new(
        api: Arc<dyn FriendApi>,
        sessions: Arc<SessionStore>,
        permissions: Arc<PermissionState>,
        contact_source: Arc<dyn ContactSource>,
    ) -> Self {
        let (state, _) = watch::channel(FriendsState::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            sessions,
            permissions,
            contact_source,
            state,
            processing: DashMap::new(),
            events,
        }
    }

    pub fn snapshot(&self) -> FriendsState {
        self.state.borrow().clone()
    }

    /// Watch the friends screen state.
    pub fn watch(&self) -> watch::Receiver<FriendsState> {
        self.state.subscribe()
    }

    /// Receive mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<FriendEvent> {
        self.events.subscribe()
    }

    pub fn dismiss_error(&self, list: FriendList) {
        self.state.send_modify(|s| match list {
            FriendList::Friends => s.friends_error = None,
            FriendList::Requests => s.friend_requests_error = None,
            FriendList::Contacts => s.contacts_error = None,
        });
    }

    /// Drop all loaded data (e.g. on sign-out).
    pub fn reset(&self) {
        self.state.send_replace(FriendsState::default());
    }

    // ─── Refresh ─────────────────────────────────────────────────────────────

    /// Reload all three lists concurrently.
    ///
    /// A failure in one load is recorded in that list's error flag and
    /// does not affect the others.
    pub async fn refresh(&self) {
        tracing::info!("Refreshing friends data");
        tokio::join!(
            self.load_friends(),
            self.load_pending_requests(),
            self.load_contacts()
        );
    }

    async fn load_friends(&self) {
        self.state.send_modify(|s| {
            s.is_loading_friends = true;
            s.friends_error = None;
        });

        let result = self.fetch_friends().await;

        self.state.send_modify(|s| {
            match result {
                Ok(friendships) => {
                    tracing::info!(count = friendships.len(), "Loaded friends");
                    s.friendships = friendships;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load friends");
                    s.friendships = Vec::new();
                    s.friends_error = Some(e.to_string());
                }
            }
            s.is_loading_friends = false;
        });
    }

    async fn load_pending_requests(&self) {
        self.state.send_modify(|s| {
            s.is_loading_requests = true;
            s.friend_requests_error = None;
        });

        let result = self.fetch_pending_requests().await;

        self.state.send_modify(|s| {
            match result {
                Ok(requests) => {
                    tracing::info!(count = requests.len(), "Loaded friend requests");
                    s.friend_requests = requests;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load friend requests");
                    s.friend_requests = Vec::new();
                    s.friend_requests_error = Some(e.to_string());
                }
            }
            s.is_loading_requests = false;
        });
    }

    async fn load_contacts(&self) {
        self.state.send_modify(|s| {
            s.is_loading_contacts = true;
            s.contacts_error = None;
        });

        let result = self.fetch_contacts().await;

        self.state.send_modify(|s| {
            match result {
                Ok(contacts) => {
                    tracing::info!(count = contacts.len(), "Loaded matched contacts");
                    s.contacts = contacts;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load contacts");
                    s.contacts = Vec::new();
                    s.contacts_error = Some(e.to_string());
                }
            }
            s.is_loading_contacts = false;
        });
    }

    async fn current_user_id(&self) -> Result<String> {
        self.sessions
            .current_user_id()
            .await
            .ok_or(AppError::NotLoggedIn)
    }

    async fn fetch_friends(&self) -> Result<Vec<Friendship>> {
        let me = self.current_user_id().await?;
        let friendships = self.api.get_friends().await?;

        Ok(friendships
            .into_iter()
            .filter_map(|mut f| {
                if f.resolve_for(&me) {
                    Some(f)
                } else {
                    tracing::warn!(
                        friendship_id = %f.id,
                        "Dropping friendship that does not include current user"
                    );
                    None
                }
            })
            .collect())
    }

    async fn fetch_pending_requests(&self) -> Result<Vec<FriendRequest>> {
        let me = self.current_user_id().await?;
        let requests = self.api.get_pending_friend_requests().await?;
        Ok(requests
            .into_iter()
            .map(|r| r.with_direction(&me))
            .collect())
    }

    /// Enumerate → normalize/dedupe → match in batches → map → sort by name.
    async fn fetch_contacts(&self) -> Result<Vec<Contact>> {
        if !self.permissions.current_status().await.contacts {
            tracing::debug!("Contacts not authorized, skipping contact matching");
            return Ok(Vec::new());
        }

        let local = self.contact_source.enumerate().await?;
        let index = PhoneIndex::build(&local);
        if index.numbers.is_empty() {
            return Ok(Vec::new());
        }

        let matches = self.api.match_contacts(&index.numbers).await?;

        let mut seen = HashSet::new();
        let mut contacts: Vec<Contact> = matches
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .filter_map(|m| {
                let name = m
                    .username
                    .filter(|u| !u.trim().is_empty())
                    .or_else(|| {
                        m.phone_number
                            .as_deref()
                            .and_then(|p| index.name_for(p))
                            .map(str::to_string)
                    })?;
                Some(Contact {
                    id: m.id,
                    name,
                    phone_number: String::new(),
                })
            })
            .collect();

        contacts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(contacts)
    }

    // ─── Row actions ─────────────────────────────────────────────────────────

    /// Whether an action for this request/contact id is in flight.
    pub fn is_processing(&self, id: &str) -> bool {
        self.processing.contains_key(&request_key(id))
            || self.processing.contains_key(&contact_key(id))
    }

    fn begin(&self, key: String) -> Option<ProcessingGuard<'_>> {
        match self.processing.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let key = slot.key().clone();
                slot.insert(());
                Some(ProcessingGuard {
                    processing: &self.processing,
                    key,
                })
            }
        }
    }

    pub async fn accept_request(&self, request: &FriendRequest) -> Result<MutationOutcome> {
        self.respond(request, true).await
    }

    pub async fn reject_request(&self, request: &FriendRequest) -> Result<MutationOutcome> {
        self.respond(request, false).await
    }

    async fn respond(&self, request: &FriendRequest, accept: bool) -> Result<MutationOutcome> {
        if request.is_pending_sent() {
            return Err(AppError::BadRequest(
                "Cannot respond to a request you sent".to_string(),
            ));
        }

        let Some(_guard) = self.begin(request_key(&request.id)) else {
            tracing::debug!(request_id = %request.id, "Response already in flight");
            return Ok(MutationOutcome::AlreadyInFlight);
        };

        self.api
            .respond_to_friend_request(&request.id, accept)
            .await?;

        self.state
            .send_modify(|s| s.friend_requests.retain(|r| r.id != request.id));
        self.publish(FriendEvent::RequestResponded {
            request_id: request.id.clone(),
            accepted: accept,
        });
        Ok(MutationOutcome::Completed)
    }

    pub async fn send_friend_request(&self, contact: &Contact) -> Result<MutationOutcome> {
        let Some(_guard) = self.begin(contact_key(&contact.id)) else {
            tracing::debug!(contact_id = %contact.id, "Friend request already in flight");
            return Ok(MutationOutcome::AlreadyInFlight);
        };

        self.api.send_friend_request(&contact.id).await?;

        self.remove_contact(&contact.id);
        self.publish(FriendEvent::RequestSent {
            contact_id: contact.id.clone(),
        });
        Ok(MutationOutcome::Completed)
    }

    pub fn remove_contact(&self, id: &str) {
        self.state.send_modify(|s| s.contacts.retain(|c| c.id != id));
    }

    // ─── Resync ──────────────────────────────────────────────────────────────

    fn publish(&self, event: FriendEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("No resync listener for friend event");
        }
    }

    /// React to a mutation with a full refresh.
    pub async fn handle_event(&self, event: FriendEvent) {
        tracing::debug!(?event, "Handling friend event");
        if let FriendEvent::RequestSent { contact_id } = &event {
            self.remove_contact(contact_id);
        }
        self.refresh().await;
    }

    /// Run [`Self::handle_event`] for every published event until aborted.
    pub fn spawn_resync_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut events = self.events.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => controller.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Resync listener lagged, refreshing");
                        controller.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

fn request_key(id: &str) -> String {
    format!("request:{}", id)
}

fn contact_key(id: &str) -> String {
    format!("contact:{}", id)
}
