//! Pipeline orchestrator module for the voice reader.
//!
//! This module owns the session state and wires the voice directory, the
//! extraction coordinator, the playback controller and the story store into
//! one event loop.
//!
//! # Architecture
//!
//! ```text
//! PipelineCommand (mpsc)        PipelineEvent (mpsc, from spawned tasks)
//!        │                              │
//!        └──────────────┬───────────────┘
//!                       ▼
//!        PipelineOrchestrator::run()  ← async tokio task, single writer
//!                       │
//!                       ├─ VoiceDirectory        → catalog + default voice
//!                       ├─ ExtractionCoordinator → text_buffer (token-checked)
//!                       ├─ PlaybackController    → status Reading/Stopped
//!                       └─ StoryStore            → notice / history
//!
//! watch::Receiver<SessionState> ←─── read by the console front end
//! ```
//!
//! Results carry the token they were started under; only results whose
//! token is still active change the session.

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{
    PipelineCommand, PipelineError, PipelineEvent, PipelineOrchestrator, ProgressHook,
};
pub use state::{SessionState, StatusState};
