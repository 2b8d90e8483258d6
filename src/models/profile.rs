//! User profile as returned by the API.

use serde::{Deserialize, Serialize};

/// A user's public profile.
///
/// Endpoints disagree on the name of the id field: friend requests embed
/// `user_id`, the friend list embeds `id`. Rows from the profiles table may
/// carry both, in which case `user_id` is the user's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProfileWire")]
pub struct Profile {
    pub id: String,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    #[serde(rename = "pfp_url")]
    pub avatar_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Deserialize)]
struct ProfileWire {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    pfp_url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl TryFrom<ProfileWire> for Profile {
    type Error = String;

    fn try_from(wire: ProfileWire) -> Result<Self, Self::Error> {
        let id = wire
            .user_id
            .or(wire.id)
            .ok_or_else(|| "profile has neither `user_id` nor `id`".to_string())?;

        Ok(Self {
            id,
            username: wire.username,
            phone_number: wire.phone_number,
            avatar_url: wire.pfp_url,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

impl Profile {
    /// The username if one has been chosen (empty strings count as unset).
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.trim().is_empty())
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Profile {}
