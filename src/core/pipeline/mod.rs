//! # Pipeline Module
//!
//! Orchestrates the full organizing workflow.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Discover media files under the scan root
//! 2. **Prune** - Drop cache rows for vanished files (full scans only)
//! 3. **Metadata** - Capture dates, camera and tag fields (with caching)
//! 4. **Hash** - Full-content digests (with caching)
//! 5. **Deduplicate** - Pick one survivor per digest
//! 6. **Organize** - Group survivors into named albums
//!
//! Analysis stops at a review checkpoint and returns an
//! [`OrganizationPlan`]. Files are only moved by [`Pipeline::execute`].
//!
//! ## Parallelism
//! Stages 3 and 4 share one rayon pool of the configured size.

mod executor;
mod types;

pub use executor::{Pipeline, PipelineBuilder};
pub use types::{AnalysisReport, OrganizationPlan};
