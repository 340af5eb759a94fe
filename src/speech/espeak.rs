//! espeak-ng speech backend.
//!
//! Voices come from `espeak-ng --voices`; each utterance is one
//! `espeak-ng` child process.  Cancelling kills the child.
//!
//! `-v` takes the voice file from the listing's File column (`gmw/en-US`),
//! so two voices sharing a language stay distinct.  Voices never listed by
//! this backend fall back to their language tag.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;
use tokio::sync::oneshot;

use crate::config::SpeechConfig;
use crate::voice::VoiceProfile;

use super::synth::{SpeechCompletion, SpeechError, SpeechSynth, Utterance};

/// espeak-ng words-per-minute at rate 1.0.
const BASE_WPM: f32 = 175.0;
/// espeak-ng pitch at pitch 1.0 (valid range 0-99).
const BASE_PITCH: f32 = 50.0;

/// Speech backend driving the `espeak-ng` executable.
pub struct EspeakSynth {
    program: String,
    /// Cancel handle of the utterance currently playing.
    current: Mutex<Option<oneshot::Sender<()>>>,
    /// Voice name → espeak-ng voice file, from the last listing.
    files: Mutex<HashMap<String, String>>,
}

impl EspeakSynth {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            current: Mutex::new(None),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.espeak_path.clone())
    }

    /// Convert a rate multiplier into espeak-ng speed (words per minute).
    fn speed_wpm(rate: f32) -> u32 {
        (BASE_WPM * rate).round() as u32
    }

    /// Convert a pitch multiplier into espeak-ng pitch (0-99).
    fn pitch_arg(pitch: f32) -> u32 {
        (BASE_PITCH * pitch).round().clamp(0.0, 99.0) as u32
    }

    /// Parse the table printed by `espeak-ng --voices`.
    ///
    /// ```text
    /// Pty Language       Age/Gender VoiceName          File                 Other Languages
    ///  5  af              --/M      Afrikaans          gmw/af
    ///  2  en-us           --/M      English_(America)  gmw/en-US            (en 10)
    /// ```
    pub(crate) fn parse_voices(listing: &str) -> Vec<(VoiceProfile, String)> {
        listing
            .lines()
            .filter_map(|line| {
                let mut cols = line.split_whitespace();
                let priority = cols.next()?;
                if priority.parse::<u32>().is_err() {
                    // Header row.
                    return None;
                }
                let language = cols.next()?;
                let _age_gender = cols.next()?;
                let name = cols.next()?;
                let file = cols.next().unwrap_or(language);
                Some((
                    VoiceProfile::new(name.replace('_', " "), language),
                    file.to_string(),
                ))
            })
            .collect()
    }

    /// Record the voice files of a fresh listing and return its profiles.
    fn remember(&self, listed: Vec<(VoiceProfile, String)>) -> Vec<VoiceProfile> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.clear();
        listed
            .into_iter()
            .map(|(voice, file)| {
                files.insert(voice.name.clone(), file);
                voice
            })
            .collect()
    }

    /// Identifier passed to `-v` for `voice`.
    fn voice_arg(&self, voice: &VoiceProfile) -> String {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&voice.name)
            .cloned()
            .unwrap_or_else(|| voice.language_tag.clone())
    }

    fn take_current(&self) -> Option<oneshot::Sender<()>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl SpeechSynth for EspeakSynth {
    async fn voices(&self) -> Result<Vec<VoiceProfile>, SpeechError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SpeechError::Unavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Enumeration(stderr.trim().to_string()));
        }

        let voices = self.remember(Self::parse_voices(&String::from_utf8_lossy(&output.stdout)));
        debug!("espeak-ng reported {} voices", voices.len());
        Ok(voices)
    }

    fn speak(&self, utterance: Utterance) -> Result<SpeechCompletion, SpeechError> {
        // One child at a time.
        self.cancel();

        let speed = Self::speed_wpm(utterance.rate);
        let pitch = Self::pitch_arg(utterance.pitch);
        let voice = self.voice_arg(&utterance.voice);

        let mut cmd = Command::new(&self.program);
        cmd.arg("-v")
            .arg(&voice)
            .arg("-s")
            .arg(speed.to_string())
            .arg("-p")
            .arg(pitch.to_string())
            .arg("--")
            .arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SpeechError::Unavailable(format!("{}: {e}", self.program)))?;
        debug!(
            "espeak-ng started (voice={voice}, speed={speed}, pitch={pitch})"
        );

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel_tx);

        tokio::spawn(async move {
            // A dropped cancel handle counts as a cancel request.
            let finished = tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel_rx => None,
            };

            let outcome = match finished {
                Some(Ok(status)) if status.success() => Ok(()),
                Some(Ok(status)) => Err(SpeechError::Synthesis(format!(
                    "espeak-ng exited with {status}"
                ))),
                Some(Err(e)) => Err(SpeechError::Synthesis(e.to_string())),
                None => {
                    if let Err(e) = child.kill().await {
                        warn!("failed to kill espeak-ng: {e}");
                    }
                    Err(SpeechError::Cancelled)
                }
            };
            let _ = done_tx.send(outcome);
        });

        Ok(done_rx)
    }

    fn cancel(&self) {
        if let Some(tx) = self.take_current() {
            debug!("cancelling espeak-ng utterance");
            let _ = tx.send(());
        }
    }
}

impl Drop for EspeakSynth {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-us           --/M      English_(America)  gmw/en-US            (en 10)
 5  en-us           --/F      English_(America,_female) mb/mb-us1
 5  hi              --/M      Hindi              inc/hi
";

    #[test]
    fn parses_voice_table() {
        let voices = EspeakSynth::parse_voices(LISTING);
        assert_eq!(
            voices,
            vec![
                (VoiceProfile::new("Afrikaans", "af"), "gmw/af".to_string()),
                (
                    VoiceProfile::new("English (America)", "en-us"),
                    "gmw/en-US".to_string()
                ),
                (
                    VoiceProfile::new("English (America, female)", "en-us"),
                    "mb/mb-us1".to_string()
                ),
                (VoiceProfile::new("Hindi", "hi"), "inc/hi".to_string()),
            ]
        );
    }

    #[test]
    fn voices_sharing_a_language_speak_with_their_own_file() {
        let synth = EspeakSynth::new("espeak-ng");
        let voices = synth.remember(EspeakSynth::parse_voices(LISTING));
        assert_eq!(voices.len(), 4);

        assert_eq!(synth.voice_arg(&voices[1]), "gmw/en-US");
        assert_eq!(synth.voice_arg(&voices[2]), "mb/mb-us1");
        assert_eq!(synth.voice_arg(&voices[3]), "inc/hi");
    }

    #[test]
    fn unlisted_voice_falls_back_to_language_tag() {
        let synth = EspeakSynth::new("espeak-ng");
        synth.remember(EspeakSynth::parse_voices(LISTING));
        assert_eq!(
            synth.voice_arg(&VoiceProfile::new("Google हिन्दी", "hi-IN")),
            "hi-IN"
        );
    }

    #[test]
    fn row_without_file_column_uses_language() {
        let voices = EspeakSynth::parse_voices(" 5  eo  --/M  Esperanto");
        assert_eq!(
            voices,
            vec![(VoiceProfile::new("Esperanto", "eo"), "eo".to_string())]
        );
    }

    #[test]
    fn empty_listing_yields_no_voices() {
        assert!(EspeakSynth::parse_voices("").is_empty());
        assert!(EspeakSynth::parse_voices("Pty Language Age/Gender VoiceName File").is_empty());
    }

    #[test]
    fn rate_maps_to_words_per_minute() {
        assert_eq!(EspeakSynth::speed_wpm(1.0), 175);
        assert_eq!(EspeakSynth::speed_wpm(0.5), 88);
        assert_eq!(EspeakSynth::speed_wpm(2.0), 350);
    }

    #[test]
    fn pitch_maps_into_espeak_range() {
        assert_eq!(EspeakSynth::pitch_arg(1.0), 50);
        assert_eq!(EspeakSynth::pitch_arg(0.5), 25);
        assert_eq!(EspeakSynth::pitch_arg(2.0), 99);
    }

    #[tokio::test]
    async fn missing_executable_is_unavailable() {
        let synth = EspeakSynth::new("/nonexistent/espeak-ng");
        let err = synth.voices().await.unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable(_)));
    }

    #[tokio::test]
    async fn speak_with_missing_executable_fails_without_panicking() {
        let synth = EspeakSynth::new("/nonexistent/espeak-ng");
        let result = synth.speak(Utterance {
            text: "hello".into(),
            voice: VoiceProfile::new("English", "en"),
            rate: 1.0,
            pitch: 1.0,
        });
        assert!(matches!(result, Err(SpeechError::Unavailable(_))));
    }

    #[test]
    fn cancel_without_utterance_is_noop() {
        let synth = EspeakSynth::new("espeak-ng");
        synth.cancel();
        synth.cancel();
    }
}
