//! Playback controller: text + voice + rate/pitch → one utterance at a time.
//!
//! The controller is stateless apart from the backend handle.  Tokens are
//! minted by the orchestrator; the controller only tags the completion report
//! with the token it was given, so stale reports can be recognised later.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::token::Token;
use crate::voice::VoiceProfile;

use super::synth::{SpeechError, SpeechSynth, Utterance};

/// Lowest accepted rate / pitch multiplier.
pub const MIN_PARAM: f32 = 0.5;
/// Highest accepted rate / pitch multiplier.
pub const MAX_PARAM: f32 = 2.0;

/// Clamp a rate or pitch multiplier into `MIN_PARAM ..= MAX_PARAM`.
///
/// Returns `None` for NaN and infinities; callers keep the previous value.
///
/// ```
/// use voice_reader::speech::clamp_param;
///
/// assert_eq!(clamp_param(1.5), Some(1.5));
/// assert_eq!(clamp_param(3.0), Some(2.0));
/// assert_eq!(clamp_param(0.1), Some(0.5));
/// assert_eq!(clamp_param(f32::NAN), None);
/// ```
pub fn clamp_param(value: f32) -> Option<f32> {
    value
        .is_finite()
        .then(|| value.clamp(MIN_PARAM, MAX_PARAM))
}

/// Why an utterance could not be prepared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// No voice is selected (the catalog is empty).
    #[error("no voice available")]
    NoVoiceAvailable,
}

/// Completion of one utterance, tagged with the token it was started under.
#[derive(Debug)]
pub struct PlaybackReport {
    pub token: Token,
    pub outcome: Result<(), SpeechError>,
}

/// Starts and cancels utterances on a [`SpeechSynth`].
#[derive(Clone)]
pub struct PlaybackController {
    synth: Arc<dyn SpeechSynth>,
}

impl PlaybackController {
    pub fn new(synth: Arc<dyn SpeechSynth>) -> Self {
        Self { synth }
    }

    /// Build the utterance for a play request.
    ///
    /// * `Ok(None)` — blank text, nothing to do.
    /// * `Err(NoVoiceAvailable)` — no voice selected; no audio is started.
    pub fn prepare(
        text: &str,
        voice: Option<&VoiceProfile>,
        rate: f32,
        pitch: f32,
    ) -> Result<Option<Utterance>, PlaybackError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let voice = voice.ok_or(PlaybackError::NoVoiceAvailable)?;
        Ok(Some(Utterance {
            text: text.to_string(),
            voice: voice.clone(),
            rate: clamp_param(rate).unwrap_or(1.0),
            pitch: clamp_param(pitch).unwrap_or(1.0),
        }))
    }

    /// Cancel whatever is playing, then start `utterance` under `token`.
    ///
    /// The end / error / cancel event is delivered on `reports` as a
    /// [`PlaybackReport`] carrying `token`.
    pub fn start<E>(
        &self,
        token: Token,
        utterance: Utterance,
        reports: mpsc::UnboundedSender<E>,
    ) -> Result<(), SpeechError>
    where
        E: From<PlaybackReport> + Send + 'static,
    {
        self.synth.cancel();

        log::debug!(
            "playback {token}: speaking {} chars with {} (rate={}, pitch={})",
            utterance.text.len(),
            utterance.voice,
            utterance.rate,
            utterance.pitch
        );
        let done = self.synth.speak(utterance)?;

        tokio::spawn(async move {
            // A dropped completion means the backend went away mid-utterance.
            let outcome = done.await.unwrap_or(Err(SpeechError::Cancelled));
            let _ = reports.send(PlaybackReport { token, outcome }.into());
        });
        Ok(())
    }

    /// Cancel the current utterance, if any.
    pub fn stop(&self) {
        self.synth.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::synth::{MockSynth, SynthCall};
    use crate::token::TokenSource;

    fn voice() -> VoiceProfile {
        VoiceProfile::new("Google TTS", "hi")
    }

    #[test]
    fn clamp_param_bounds() {
        assert_eq!(clamp_param(0.5), Some(0.5));
        assert_eq!(clamp_param(2.0), Some(2.0));
        assert_eq!(clamp_param(-1.0), Some(0.5));
        assert_eq!(clamp_param(10.0), Some(2.0));
        assert_eq!(clamp_param(f32::INFINITY), None);
        assert_eq!(clamp_param(f32::NAN), None);
    }

    #[test]
    fn prepare_blank_text_is_noop() {
        assert_eq!(
            PlaybackController::prepare("  \n", Some(&voice()), 1.0, 1.0),
            Ok(None)
        );
    }

    #[test]
    fn prepare_without_voice_fails() {
        assert_eq!(
            PlaybackController::prepare("hello", None, 1.0, 1.0),
            Err(PlaybackError::NoVoiceAvailable)
        );
    }

    #[test]
    fn prepare_blank_text_without_voice_is_still_noop() {
        assert_eq!(PlaybackController::prepare("", None, 1.0, 1.0), Ok(None));
    }

    #[test]
    fn prepare_carries_parameters() {
        let u = PlaybackController::prepare("hello", Some(&voice()), 1.5, 0.8)
            .unwrap()
            .unwrap();
        assert_eq!(u.text, "hello");
        assert_eq!(u.voice, voice());
        assert!((u.rate - 1.5).abs() < f32::EPSILON);
        assert!((u.pitch - 0.8).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn start_cancels_before_speaking_and_reports_token() {
        let synth = Arc::new(MockSynth::new(Vec::new()));
        let controller = PlaybackController::new(synth.clone());
        let (tx, mut rx) = mpsc::unbounded_channel::<PlaybackReport>();
        let mut tokens = TokenSource::new();
        let token = tokens.mint();

        let u = PlaybackController::prepare("hello", Some(&voice()), 1.0, 1.0)
            .unwrap()
            .unwrap();
        controller.start(token, u.clone(), tx).unwrap();

        assert_eq!(synth.calls(), vec![SynthCall::Cancel, SynthCall::Speak(u)]);

        synth.finish_current(Ok(()));
        let report = rx.recv().await.unwrap();
        assert_eq!(report.token, token);
        assert_eq!(report.outcome, Ok(()));
    }

    #[tokio::test]
    async fn restart_never_overlaps() {
        let synth = Arc::new(MockSynth::new(Vec::new()));
        let controller = PlaybackController::new(synth.clone());
        let (tx, mut rx) = mpsc::unbounded_channel::<PlaybackReport>();
        let mut tokens = TokenSource::new();

        let first = tokens.mint();
        let second = tokens.mint();
        let u = PlaybackController::prepare("hello", Some(&voice()), 1.0, 1.0)
            .unwrap()
            .unwrap();
        controller.start(first, u.clone(), tx.clone()).unwrap();
        controller.start(second, u, tx).unwrap();

        assert!(!synth.overlapped());
        let report = rx.recv().await.unwrap();
        assert_eq!(report.token, first);
        assert_eq!(report.outcome, Err(SpeechError::Cancelled));
    }
}
