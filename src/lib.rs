//! Library catalog server
//!
//! REST JSON API over a library catalog: authors, books, genres, languages
//! and the physical copies patrons borrow, renew and return.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub clock: Arc<dyn clock::Clock>,
}
