// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-Keeper daemon
//!
//! Resumes (or creates) an API session and keeps its access token fresh
//! until interrupted or until the refresh token is rejected.

use session_keeper::{
    clock::SystemClock,
    config::Config,
    events::SessionEvent,
    services::{HttpAuthApi, SessionManager},
    store::FileStore,
    ui::TracingUi,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        api = %config.api_base_url,
        refresh_buffer_secs = config.refresh_buffer.as_secs(),
        "Starting Session-Keeper"
    );

    let store = FileStore::open(&config.session_file)?;
    tracing::info!(path = %store.path().display(), "Session store opened");

    let api = HttpAuthApi::new(config.api_base_url.clone(), config.http_timeout)?;

    let manager = SessionManager::new(
        Arc::new(SystemClock),
        Arc::new(store),
        Arc::new(api),
        Arc::new(TracingUi::new(config.login_url.clone())),
        config.refresh_buffer,
    );
    let mut events = manager.subscribe();

    if manager.start().is_none() {
        match config.credentials() {
            Some((username, password)) => {
                let outcome = manager.login(username, password).await?;
                tracing::info!(?outcome, "Session created");
            }
            None => {
                tracing::warn!("No stored session and no credentials configured");
                return Ok(());
            }
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                manager.stop();
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Ended { reason }) => {
                    tracing::warn!(?reason, "Session ended");
                    break;
                }
                Ok(event) => tracing::info!(?event, "Session event"),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Session events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("session_keeper=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
