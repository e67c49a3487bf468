//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resources shared
//! by every connection. Game sessions themselves are not shared: each
//! WebSocket connection owns its own controller.

use std::{sync::Arc, time::Duration};
use thereis_core::ContentProvider;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub content_provider: Arc<dyn ContentProvider>,
    /// Upper bound on a single round request.
    pub round_timeout: Duration,
}
