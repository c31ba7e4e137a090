//! # Error Module
//!
//! Error types for the media organizer.
//!
//! ## Severity
//! Only configuration problems are fatal. Every other category (unreadable
//! files, cache failures, naming service outages, failed moves) is logged,
//! counted and reported, and the run carries on with the remaining files.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Naming service error: {0}")]
    Naming(#[from] NamingError),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that occur while walking the scan root
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Scan root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Scan root is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// Errors that occur while computing a content digest
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur with the metadata/hash cache.
///
/// None of these stop a run; callers treat them as a cache miss or a
/// skipped write.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache write queue is full, write dropped")]
    QueueFull,

    #[error("Cache writer has shut down")]
    WriterClosed,

    #[error("Cache state is unusable at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },
}

/// Errors from the external album naming service
#[derive(Error, Debug)]
pub enum NamingError {
    #[error("Naming service unavailable: {0}")]
    Unavailable(String),

    #[error("Naming service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Naming service returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Naming service returned an empty suggestion")]
    EmptySuggestion,
}

/// Errors that occur while relocating a single file
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy of {path} is incomplete: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Copied {path} but could not remove the source: {source}")]
    RemoveSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Startup configuration problems. These are the only fatal errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Scan path {path} does not exist. Check the --path argument.")]
    ScanRootMissing { path: PathBuf },

    #[error("Scan path {path} is not a readable directory: {reason}")]
    ScanRootUnreadable { path: PathBuf, reason: String },

    #[error("Cannot write to {path}: {source}. Choose a location you have write access to.")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker count must be at least 1 (got {0})")]
    InvalidWorkers(usize),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;
