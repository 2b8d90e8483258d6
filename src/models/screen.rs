//! Top-level screens of the app.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which top-level view is shown. Persisted by its lowercase tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppScreen {
    #[default]
    Login,
    Username,
    Notifications,
    Contacts,
    Permissions,
    Main,
    /// Legacy alias of `Main`; never entered by the onboarding flow.
    Complete,
}

impl AppScreen {
    pub const ALL: [AppScreen; 7] = [
        AppScreen::Login,
        AppScreen::Username,
        AppScreen::Notifications,
        AppScreen::Contacts,
        AppScreen::Permissions,
        AppScreen::Main,
        AppScreen::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppScreen::Login => "login",
            AppScreen::Username => "username",
            AppScreen::Notifications => "notifications",
            AppScreen::Contacts => "contacts",
            AppScreen::Permissions => "permissions",
            AppScreen::Main => "main",
            AppScreen::Complete => "complete",
        }
    }

    /// Screens the onboarding flow never leaves on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppScreen::Main | AppScreen::Complete)
    }
}

impl fmt::Display for AppScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown screen: {0}")]
pub struct UnknownScreen(pub String);

impl FromStr for AppScreen {
    type Err = UnknownScreen;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppScreen::ALL
            .into_iter()
            .find(|screen| screen.as_str() == s)
            .ok_or_else(|| UnknownScreen(s.to_string()))
    }
}
