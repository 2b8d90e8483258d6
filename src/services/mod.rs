// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - client logic layer.

pub mod api;
pub mod auth;
pub mod contacts;
pub mod friends_sync;
pub mod http;
pub mod onboarding;
pub mod permissions;
pub mod push;
pub mod session;

pub use api::{FriendApi, FriendGraphClient, UpdateProfileRequest, MATCH_BATCH_SIZE};
pub use auth::{AuthBackend, GoTrueAuthClient};
pub use contacts::{
    normalize_phone_number, ContactSource, FileContactSource, LocalContact, NoContacts, PhoneIndex,
};
pub use friends_sync::{FriendEvent, FriendList, FriendsState, FriendsSyncController, MutationOutcome};
pub use http::HttpPolicy;
pub use onboarding::{OnboardingSnapshot, OnboardingStateMachine};
pub use permissions::{
    PermissionFlags, PermissionKind, PermissionProvider, PermissionState, PermissionStatus,
    StaticPermission,
};
pub use push::{PushTokenOutcome, PushTokenRegistrar};
pub use session::{AuthStatus, SessionStore};
