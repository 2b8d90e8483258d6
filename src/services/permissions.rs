// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification and contacts permission tracking.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Authorization state reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    NotDetermined,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Notifications,
    Contacts,
}

/// One OS permission subsystem.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current status, without prompting.
    async fn status(&self) -> Result<PermissionStatus>;

    /// Show the OS prompt and return the resulting status.
    async fn request(&self) -> Result<PermissionStatus>;
}

/// Snapshot of both grant flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionFlags {
    pub notifications: bool,
    pub contacts: bool,
}

impl PermissionFlags {
    pub fn all_granted(&self) -> bool {
        self.notifications && self.contacts
    }
}

/// Tracks grant status for notifications and contacts.
///
/// Provider failures never escape: they are logged and read as "not granted".
pub struct PermissionState {
    notifications: Arc<dyn PermissionProvider>,
    contacts: Arc<dyn PermissionProvider>,
    has_notifications: AtomicBool,
    has_contacts: AtomicBool,
    notifications_denied: AtomicBool,
    contacts_denied: AtomicBool,
}

impl PermissionState {
    pub fn new(
        notifications: Arc<dyn PermissionProvider>,
        contacts: Arc<dyn PermissionProvider>,
    ) -> Self {
        Self {
            notifications,
            contacts,
            has_notifications: AtomicBool::new(false),
            has_contacts: AtomicBool::new(false),
            notifications_denied: AtomicBool::new(false),
            contacts_denied: AtomicBool::new(false),
        }
    }

    /// Last known flags, without querying the providers.
    pub fn flags(&self) -> PermissionFlags {
        PermissionFlags {
            notifications: self.has_notifications.load(Ordering::SeqCst),
            contacts: self.has_contacts.load(Ordering::SeqCst),
        }
    }

    pub fn has_permissions(&self) -> bool {
        self.flags().all_granted()
    }

    /// True when the permission was denied, so only system settings can
    /// grant it now.
    pub fn needs_settings(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Notifications => self.notifications_denied.load(Ordering::SeqCst),
            PermissionKind::Contacts => self.contacts_denied.load(Ordering::SeqCst),
        }
    }

    /// Query both subsystems concurrently. Never prompts.
    pub async fn current_status(&self) -> PermissionFlags {
        let (notifications, contacts) = tokio::join!(
            query(self.notifications.as_ref(), PermissionKind::Notifications),
            query(self.contacts.as_ref(), PermissionKind::Contacts),
        );

        self.record(PermissionKind::Notifications, notifications);
        self.record(PermissionKind::Contacts, contacts);

        let flags = self.flags();
        tracing::debug!(
            notifications = flags.notifications,
            contacts = flags.contacts,
            "Permission states checked"
        );
        flags
    }

    pub async fn request_notifications(&self) -> bool {
        self.request(PermissionKind::Notifications).await
    }

    pub async fn request_contacts(&self) -> bool {
        self.request(PermissionKind::Contacts).await
    }

    /// Prompt only if the OS hasn't decided yet.
    async fn request(&self, kind: PermissionKind) -> bool {
        let provider = match kind {
            PermissionKind::Notifications => self.notifications.as_ref(),
            PermissionKind::Contacts => self.contacts.as_ref(),
        };

        let status = match query(provider, kind).await {
            PermissionStatus::NotDetermined => match provider.request().await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(?kind, error = %e, "Permission request failed");
                    PermissionStatus::Denied
                }
            },
            determined => determined,
        };

        self.record(kind, status);
        tracing::info!(?kind, ?status, "Permission request resolved");
        status.is_granted()
    }

    fn record(&self, kind: PermissionKind, status: PermissionStatus) {
        let (granted, denied) = match kind {
            PermissionKind::Notifications => (&self.has_notifications, &self.notifications_denied),
            PermissionKind::Contacts => (&self.has_contacts, &self.contacts_denied),
        };
        granted.store(status.is_granted(), Ordering::SeqCst);
        denied.store(status == PermissionStatus::Denied, Ordering::SeqCst);
    }
}

async fn query(provider: &dyn PermissionProvider, kind: PermissionKind) -> PermissionStatus {
    match provider.status().await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(?kind, error = %e, "Permission status check failed");
            PermissionStatus::Denied
        }
    }
}

/// Provider with a fixed status, for headless runs where the platform has
/// already decided (or there is no OS prompt at all).
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub PermissionStatus);

#[async_trait]
impl PermissionProvider for StaticPermission {
    async fn status(&self) -> Result<PermissionStatus> {
        Ok(self.0)
    }

    async fn request(&self) -> Result<PermissionStatus> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Provider that starts undetermined and grants (or denies) on prompt.
    struct Prompting {
        status: Mutex<PermissionStatus>,
        answer: PermissionStatus,
        prompts: AtomicUsize,
    }

    impl Prompting {
        fn new(initial: PermissionStatus, answer: PermissionStatus) -> Arc<Self> {
            Arc::new(Self {
                status: Mutex::new(initial),
                answer,
                prompts: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionProvider for Prompting {
        async fn status(&self) -> Result<PermissionStatus> {
            Ok(*self.status.lock().unwrap())
        }

        async fn request(&self) -> Result<PermissionStatus> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            *self.status.lock().unwrap() = self.answer;
            Ok(self.answer)
        }
    }

    struct Broken;

    #[async_trait]
    impl PermissionProvider for Broken {
        async fn status(&self) -> Result<PermissionStatus> {
            Err(AppError::Permission("subsystem unavailable".to_string()))
        }

        async fn request(&self) -> Result<PermissionStatus> {
            Err(AppError::Permission("subsystem unavailable".to_string()))
        }
    }

    /// Status lookups fail, but a prompt would be granted.
    #[derive(Default)]
    struct Unreadable {
        prompts: AtomicUsize,
    }

    #[async_trait]
    impl PermissionProvider for Unreadable {
        async fn status(&self) -> Result<PermissionStatus> {
            Err(AppError::Permission("status unavailable".to_string()))
        }

        async fn request(&self) -> Result<PermissionStatus> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            Ok(PermissionStatus::Granted)
        }
    }

    #[tokio::test]
    async fn test_status_check_does_not_prompt() {
        let notif = Prompting::new(PermissionStatus::NotDetermined, PermissionStatus::Granted);
        let contacts = Prompting::new(PermissionStatus::Granted, PermissionStatus::Granted);
        let state = PermissionState::new(notif.clone(), contacts.clone());

        let flags = state.current_status().await;

        assert_eq!(flags, PermissionFlags { notifications: false, contacts: true });
        assert!(!state.has_permissions());
        assert_eq!(notif.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_prompts_once_when_undetermined() {
        let notif = Prompting::new(PermissionStatus::NotDetermined, PermissionStatus::Granted);
        let state = PermissionState::new(
            notif.clone(),
            Arc::new(StaticPermission(PermissionStatus::Granted)),
        );

        assert!(state.request_notifications().await);
        assert!(state.request_notifications().await);
        assert_eq!(notif.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_is_not_reprompted() {
        let contacts = Prompting::new(PermissionStatus::Denied, PermissionStatus::Granted);
        let state = PermissionState::new(
            Arc::new(StaticPermission(PermissionStatus::Granted)),
            contacts.clone(),
        );

        assert!(!state.request_contacts().await);
        assert_eq!(contacts.prompts.load(Ordering::SeqCst), 0);
        assert!(state.needs_settings(PermissionKind::Contacts));
    }

    #[tokio::test]
    async fn test_provider_errors_degrade_to_not_granted() {
        let state = PermissionState::new(Arc::new(Broken), Arc::new(Broken));

        let flags = state.current_status().await;
        assert_eq!(flags, PermissionFlags::default());
        assert!(!state.request_notifications().await);
        assert!(!state.request_contacts().await);
    }

    #[tokio::test]
    async fn test_status_error_does_not_prompt() {
        let contacts = Arc::new(Unreadable::default());
        let state = PermissionState::new(
            Arc::new(StaticPermission(PermissionStatus::Granted)),
            contacts.clone(),
        );

        assert!(!state.request_contacts().await);
        assert_eq!(contacts.prompts.load(Ordering::SeqCst), 0);
        assert!(!state.flags().contacts);
    }
}
