//! # Media Organizer
//!
//! Deduplicates a large media collection and relocates it into a canonical
//! album library.
//!
//! ## Core Philosophy
//! - **Never lose a file** - Moves are verified; duplicates go to a trash
//!   folder, never straight to deletion
//! - **Review first** - Analysis produces a plan; nothing moves until the
//!   plan is executed
//! - **Cheap re-runs** - Unchanged files are served from a persistent cache
//!
//! ## Architecture
//! - `core` - The scanning, caching, dedup and organizing engine
//! - `config` - Run settings and startup validation
//! - `events` - Lossy progress reporting for any presentation layer
//! - `error` - Error taxonomy

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::OrganizerConfig;
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// Filtered by `RUST_LOG` and written to stderr. Calling it more than once
/// keeps the first subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
