// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod friends;
pub mod profile;
pub mod screen;
pub mod session;

pub use friends::{
    Contact, ContactMatch, FriendRequest, FriendRequestStatus, Friendship, RequestDirection,
};
pub use profile::Profile;
pub use screen::AppScreen;
pub use session::Session;
