//! mdpad Core Library
//!
//! Shared types and utilities for the mdpad command-line client.
//! This crate holds everything the CLI needs that is not tied to the
//! HTTP transport: response models, the typed error, the cookie-file
//! session store, and redirect-target extraction.

pub mod api;
pub mod error;
pub mod extract;
pub mod session;

// Re-export commonly used types
pub use api::{AuthStatus, HistoryEntry, HistoryResponse, UserProfile};
pub use error::{PadError, Result};
pub use session::{CookieJar, SessionStore};
