// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Real Friends headless client
//!
//! Restores the saved session and onboarding state, then (once onboarding
//! has reached the main screen) runs one friends sync pass and registers
//! the push token.

use real_friends::{config::Config, models::AppScreen, App};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        api = %config.api_base_url,
        state_path = %config.state_path.display(),
        "Starting Real Friends client"
    );

    let app = App::from_config(&config)?;
    let background = app.spawn_background();

    let screen = app.onboarding.bootstrap().await;
    tracing::info!(screen = %screen, "Onboarding state restored");

    if screen == AppScreen::Main {
        app.friends.refresh().await;
        let state = app.friends.snapshot();
        tracing::info!(
            friends = state.friendships.len(),
            requests = state.friend_requests.len(),
            contacts = state.contacts.len(),
            "Friends synced"
        );

        if let Some(token) = &config.push_token {
            match app.push.save_token_if_needed(token).await {
                Ok(outcome) => tracing::info!(?outcome, "Push token checked"),
                Err(e) => tracing::warn!(error = %e, "Push token registration failed"),
            }
        }
    } else {
        tracing::info!(screen = %screen, "Onboarding incomplete, skipping sync");
    }

    for handle in background {
        handle.abort();
    }
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("real_friends=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
