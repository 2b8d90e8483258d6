//! Friend requests, friendships and matched contacts.

use super::Profile;
use serde::{Deserialize, Serialize};

/// Server-side state of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Canceled,
}

/// Direction of a request relative to the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Sent,
    Received,
}

/// A directional proposal to become friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: FriendRequestStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub from_user: Option<Profile>,
    #[serde(default)]
    pub to_user: Option<Profile>,
    /// Computed locally by [`FriendRequest::with_direction`]; whatever the
    /// server sends under this name is ignored.
    #[serde(skip_deserializing)]
    pub direction: Option<RequestDirection>,
}

impl FriendRequest {
    /// Set `direction` by comparing the sender with the current user.
    pub fn with_direction(mut self, current_user_id: &str) -> Self {
        self.direction = Some(if self.from_user_id == current_user_id {
            RequestDirection::Sent
        } else {
            RequestDirection::Received
        });
        self
    }

    /// A pending request the current user sent. Accept/reject don't apply.
    pub fn is_pending_sent(&self) -> bool {
        self.status == FriendRequestStatus::Pending
            && self.direction == Some(RequestDirection::Sent)
    }
}

impl PartialEq for FriendRequest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// An accepted, bidirectional relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub created_at: String,
    /// The other party (never the current user).
    #[serde(default)]
    pub friend: Option<Profile>,
    #[serde(default, skip_serializing)]
    pub user1: Option<Profile>,
    #[serde(default, skip_serializing)]
    pub user2: Option<Profile>,
}

impl Friendship {
    /// Check the membership invariant and make `friend` the other party.
    ///
    /// Returns false when the current user is not exactly one of the two
    /// members. Older endpoints send `user1`/`user2` instead of `friend`;
    /// in that case the non-self profile is promoted to `friend`.
    pub fn resolve_for(&mut self, current_user_id: &str) -> bool {
        let is_user1 = self.user1_id == current_user_id;
        let is_user2 = self.user2_id == current_user_id;
        if is_user1 == is_user2 {
            return false;
        }

        let other_id = if is_user1 { &self.user2_id } else { &self.user1_id };

        let embedded_ok = self.friend.as_ref().is_some_and(|f| &f.id == other_id);
        if !embedded_ok {
            self.friend = [self.user1.take(), self.user2.take()]
                .into_iter()
                .flatten()
                .find(|p| &p.id == other_id);
        }
        self.user1 = None;
        self.user2 = None;
        true
    }

    /// Id of the other party.
    pub fn friend_id(&self, current_user_id: &str) -> &str {
        if self.user1_id == current_user_id {
            &self.user2_id
        } else {
            &self.user1_id
        }
    }
}

impl PartialEq for Friendship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A device contact that matched a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Matched user id
    pub id: String,
    pub name: String,
    /// Always empty once matched; the number is not retained.
    pub phone_number: String,
}

/// One result of the contact-match endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMatch {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "phoneNumber")]
    pub phone_number: Option<String>,
}
