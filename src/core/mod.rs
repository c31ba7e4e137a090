//! # Core Module
//!
//! The presentation-agnostic organizing engine.
//!
//! ## Modules
//! - `scanner` - Discovers media files in directories
//! - `cache` - Persists metadata and digests between runs
//! - `pool` - Worker pool shared by the processing stages
//! - `metadata` - Extracts capture dates and tags
//! - `hasher` - Computes full-content digests
//! - `dedup` - Picks one survivor per set of identical files
//! - `organize` - Plans albums and moves files
//! - `pipeline` - Orchestrates the full workflow

pub mod cache;
pub mod dedup;
pub mod hasher;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod pool;
pub mod scanner;

// Re-export commonly used types
pub use dedup::DuplicateGroup;
pub use organize::{AlbumPlan, ExecutionSummary};
pub use pipeline::{OrganizationPlan, Pipeline};
pub use scanner::{MediaRecord, MediaType};
