//! Application state for the booking HTTP server.

use crate::app::BookingApp;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// The booking engine
    pub app: Arc<BookingApp>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(app: BookingApp) -> Self {
        Self { app: Arc::new(app) }
    }
}
