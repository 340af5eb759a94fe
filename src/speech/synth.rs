//! Speech synthesis backend trait.
//!
//! # Overview
//!
//! [`SpeechSynth`] is the seam between the pipeline and the platform's speech
//! service.  It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SpeechSynth>`.
//!
//! Lifecycle of one utterance:
//!
//! * **start** — [`SpeechSynth::speak`] returns `Ok`, audio has begun;
//! * **end / error** — the returned [`SpeechCompletion`] resolves with
//!   `Ok(())` or `Err(_)`;
//! * **cancel** — [`SpeechSynth::cancel`] stops the utterance; its completion
//!   resolves with [`SpeechError::Cancelled`].
//!
//! [`MockSynth`] (available under `#[cfg(test)]`) records every call so tests
//! can assert ordering and that no two utterances ever overlap.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

use crate::voice::VoiceProfile;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// All errors that can arise from the speech subsystem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    /// The backend could not be started at all (missing executable, no audio).
    #[error("speech backend unavailable: {0}")]
    Unavailable(String),

    /// Voice enumeration ran but failed.
    #[error("voice enumeration failed: {0}")]
    Enumeration(String),

    /// The utterance started but ended with an error.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The utterance was cancelled before it finished.
    #[error("utterance cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// One speak request with every parameter fixed at the time it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: VoiceProfile,
    /// Rate multiplier, `0.5 ..= 2.0`.
    pub rate: f32,
    /// Pitch multiplier, `0.5 ..= 2.0`.
    pub pitch: f32,
}

/// Resolves once when the utterance ends, fails or is cancelled.
pub type SpeechCompletion = oneshot::Receiver<Result<(), SpeechError>>;

// ---------------------------------------------------------------------------
// SpeechSynth trait
// ---------------------------------------------------------------------------

/// Platform speech service.
#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Enumerate the voices currently known to the platform.
    ///
    /// May return an empty list early on; platforms that load voices lazily
    /// signal later availability through [`announcements`](Self::announcements).
    async fn voices(&self) -> Result<Vec<VoiceProfile>, SpeechError>;

    /// Start speaking `utterance`.
    ///
    /// Must not be called while another utterance is playing; callers cancel
    /// first.
    fn speak(&self, utterance: Utterance) -> Result<SpeechCompletion, SpeechError>;

    /// Stop the current utterance, if any.  Never fails.
    fn cancel(&self);

    /// A stream of "voice list changed" notifications, if the platform has one.
    fn announcements(&self) -> Option<broadcast::Receiver<()>> {
        None
    }
}

// Compile-time assertion: Box<dyn SpeechSynth> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechSynth>) {}
};

// ---------------------------------------------------------------------------
// MockSynth  (test-only)
// ---------------------------------------------------------------------------

/// A call observed by [`MockSynth`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum SynthCall {
    Speak(Utterance),
    Cancel,
}

/// In-memory speech backend for tests.
///
/// Utterances never end on their own; call
/// [`finish_current`](MockSynth::finish_current) to deliver the end event.
#[cfg(test)]
pub struct MockSynth {
    voices: std::sync::Mutex<Result<Vec<VoiceProfile>, SpeechError>>,
    announce: broadcast::Sender<()>,
    calls: std::sync::Mutex<Vec<SynthCall>>,
    current: std::sync::Mutex<Option<oneshot::Sender<Result<(), SpeechError>>>>,
    overlapped: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockSynth {
    pub fn new(voices: Vec<VoiceProfile>) -> Self {
        let (announce, _) = broadcast::channel(8);
        Self {
            voices: std::sync::Mutex::new(Ok(voices)),
            announce,
            calls: std::sync::Mutex::new(Vec::new()),
            current: std::sync::Mutex::new(None),
            overlapped: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// A backend whose voice enumeration always fails.
    pub fn failing_enumeration() -> Self {
        let synth = Self::new(Vec::new());
        *synth.voices.lock().unwrap() = Err(SpeechError::Enumeration("no voices".into()));
        synth
    }

    /// Replace the voice list and announce the change.
    pub fn announce_voices(&self, voices: Vec<VoiceProfile>) {
        *self.voices.lock().unwrap() = Ok(voices);
        let _ = self.announce.send(());
    }

    pub fn calls(&self) -> Vec<SynthCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SynthCall::Speak(u) => Some(u),
                SynthCall::Cancel => None,
            })
            .collect()
    }

    pub fn is_speaking(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    /// `true` if `speak` was ever called while an utterance was still playing.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Deliver the end (or error) event of the playing utterance.
    pub fn finish_current(&self, outcome: Result<(), SpeechError>) {
        if let Some(tx) = self.current.lock().unwrap().take() {
            let _ = tx.send(outcome);
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynth for MockSynth {
    async fn voices(&self) -> Result<Vec<VoiceProfile>, SpeechError> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&self, utterance: Utterance) -> Result<SpeechCompletion, SpeechError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut current = self.current.lock().unwrap();
            if current.is_some() {
                self.overlapped
                    .store(true, std::sync::atomic::Ordering::SeqCst);
            }
            *current = Some(tx);
        }
        self.calls.lock().unwrap().push(SynthCall::Speak(utterance));
        Ok(rx)
    }

    fn cancel(&self) {
        self.calls.lock().unwrap().push(SynthCall::Cancel);
        if let Some(tx) = self.current.lock().unwrap().take() {
            let _ = tx.send(Err(SpeechError::Cancelled));
        }
    }

    fn announcements(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.announce.subscribe())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
