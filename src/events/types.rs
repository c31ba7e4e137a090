//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the organizer pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Pipeline-level events
    Pipeline(PipelineEvent),
    /// Point-in-time progress of a long-running stage
    Progress(ProgressSnapshot),
    /// Coarse human-readable status line
    Status(StatusLine),
}

/// Immutable progress snapshot.
///
/// Snapshots are advisory: a consumer may never see some of them, so the
/// latest one received is the only one to trust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Stage this snapshot belongs to
    pub phase: PipelinePhase,
    /// Items finished so far
    pub processed: usize,
    /// Items in the stage (equals `processed` while scanning)
    pub total: usize,
    /// Photos seen so far
    pub photos: usize,
    /// Videos seen so far
    pub videos: usize,
    /// Audio files seen so far
    pub music: usize,
    /// Label of the item just finished
    pub current: String,
}

/// A status message tied to a phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLine {
    pub phase: PipelinePhase,
    pub message: String,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Analysis or execution finished
    Completed { phase: PipelinePhase },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Pruning,
    Metadata,
    Hashing,
    Deduplicating,
    Organizing,
    Executing,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Pruning => write!(f, "Pruning cache"),
            PipelinePhase::Metadata => write!(f, "Extracting metadata"),
            PipelinePhase::Hashing => write!(f, "Hashing"),
            PipelinePhase::Deduplicating => write!(f, "Finding duplicates"),
            PipelinePhase::Organizing => write!(f, "Organizing albums"),
            PipelinePhase::Executing => write!(f, "Moving files"),
        }
    }
}
