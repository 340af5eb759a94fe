//! Speech synthesis: backend trait, the espeak-ng backend and the playback
//! controller.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_reader::speech::{EspeakSynth, PlaybackController, SpeechSynth};
//!
//! let synth: Arc<dyn SpeechSynth> = Arc::new(EspeakSynth::new("espeak-ng"));
//! let playback = PlaybackController::new(synth);
//! playback.stop();
//! ```

pub mod espeak;
pub mod playback;
pub mod synth;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use espeak::EspeakSynth;
pub use playback::{
    clamp_param, PlaybackController, PlaybackError, PlaybackReport, MAX_PARAM, MIN_PARAM,
};
pub use synth::{SpeechCompletion, SpeechError, SpeechSynth, Utterance};

// test-only re-export so the pipeline tests can build a mock backend.
#[cfg(test)]
pub use synth::{MockSynth, SynthCall};
