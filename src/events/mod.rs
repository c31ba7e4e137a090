//! # Events Module
//!
//! Progress reporting for any presentation layer.
//!
//! ## Design
//! Every long-running stage pushes [`ProgressSnapshot`]s into a bounded
//! channel with a non-blocking send. A slow consumer loses intermediate
//! snapshots instead of slowing the pipeline down.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Progress(p) = event {
//!             println!("{}: {}/{}", p.phase, p.processed, p.total);
//!         }
//!     }
//! });
//!
//! let plan = pipeline.analyze(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender, DEFAULT_EVENT_CAPACITY};
pub use types::*;

impl EventSender {
    /// Convenience for emitting a status line.
    pub fn status(&self, phase: PipelinePhase, message: impl Into<String>) {
        self.send(Event::Status(StatusLine {
            phase,
            message: message.into(),
        }));
    }

    /// Convenience for announcing a phase change.
    pub fn phase(&self, phase: PipelinePhase) {
        self.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
    }
}
