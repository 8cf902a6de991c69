//! Confidential field store for bookmarks.
//!
//! Protected bookmark text (title, url, description, image) is sealed with
//! per-value envelope encryption before it reaches storage, and opened again
//! on the way out. Because envelopes are randomised, text search cannot run in
//! storage and is instead evaluated in memory after decryption.
//!
//! Startup sequence for a host process:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging with [`telemetry::init`].
//! 3. Build a [`BookmarkVault`] over a [`store::BookmarkStore`]; this derives
//!    and caches the master secret, and fails if `ENCRYPTION_KEY` is unusable.

pub mod config;
pub mod crypto;
pub mod record;
pub mod search;
pub mod service;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use crypto::{CipherError, MasterSecret};
pub use record::{Bookmark, SealedBookmark};
pub use service::{BookmarkVault, PageLimits};
