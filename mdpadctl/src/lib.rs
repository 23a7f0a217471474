//! mdpad CLI Library
//!
//! This library provides the core functionality for the mdpad CLI tool.
//!
//! # Public API
//!
//! The primary public API is [`client::PadClient`], which provides
//! programmatic access to an mdpad server. Configuration types are
//! available via [`config::CliConfig`] and [`config::ConfigBuilder`].
//!
//! ```no_run
//! use mdpad_core::CookieJar;
//! use mdpadctl::client::PadClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut client = PadClient::new("http://localhost:3000", CookieJar::new())?;
//! let note_id = client.import_note(b"# hello".to_vec(), None).await?;
//! println!("created note {}", note_id);
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// HTTP client for communicating with the mdpad server.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

/// Export engines for the HTML and slide variants.
pub mod export;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

// Mock server used by the integration tests - not part of public API
#[doc(hidden)]
pub mod test_utils;
