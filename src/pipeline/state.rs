//! Session state and the user-visible status machine.
//!
//! [`SessionState`] is the single record the orchestrator owns and mutates.
//! Everyone else sees cloned snapshots published on a `watch` channel, so the
//! orchestrator is the only writer.

use crate::config::AppConfig;
use crate::speech::clamp_param;
use crate::store::Story;
use crate::token::TokenSlot;
use crate::voice::VoiceProfile;

use super::runner::PipelineError;

// ---------------------------------------------------------------------------
// StatusState
// ---------------------------------------------------------------------------

/// User-visible phase of the reading pipeline.
///
/// ```text
/// Ready ──upload──▶ Scanning ──text (current)──▶ Extracted
///   │                  │     ──error (current)─▶ Error
///   │                  └──stale result──▶ Scanning
///   └──play──▶ Reading ──stop──▶ Stopped
/// Extracted / Stopped / Error ──play──▶ Reading | ──upload──▶ Scanning
/// ```
///
/// No state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusState {
    /// Session started; nothing has happened yet.
    #[default]
    Ready,
    /// An image is being recognised.
    Scanning,
    /// The latest recognition replaced the text buffer.
    Extracted,
    /// An utterance was started.  Stays until stop or the next play.
    Reading,
    /// Playback was stopped by the user.
    Stopped,
    /// The latest extraction or utterance failed.
    Error,
}

impl StatusState {
    /// Returns `true` while a subsystem is expected to report back.
    ///
    /// ```
    /// use voice_reader::pipeline::StatusState;
    ///
    /// assert!(StatusState::Scanning.is_busy());
    /// assert!(StatusState::Reading.is_busy());
    /// assert!(!StatusState::Stopped.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, StatusState::Scanning | StatusState::Reading)
    }

    /// Short label for the status line.  Screen readers announce it.
    pub fn label(&self) -> &'static str {
        match self {
            StatusState::Ready => "Ready",
            StatusState::Scanning => "Scanning image...",
            StatusState::Extracted => "Text extracted",
            StatusState::Reading => "Reading...",
            StatusState::Stopped => "Stopped",
            StatusState::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything the pipeline knows about one user session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Text that play / save operate on.
    pub text_buffer: String,

    /// Voices last reported by the speech backend, in platform order.
    pub voice_catalog: Vec<VoiceProfile>,

    /// Always an entry of `voice_catalog`; `None` only when it is empty.
    pub selected_voice: Option<VoiceProfile>,

    /// Rate multiplier, `0.5 ..= 2.0`.
    pub rate: f32,

    /// Pitch multiplier, `0.5 ..= 2.0`.
    pub pitch: f32,

    pub status: StatusState,

    /// Live playback request, if any.
    pub active_playback: TokenSlot,

    /// Live extraction request, if any.
    pub active_extraction: TokenSlot,

    /// Latest voice catalog refresh, if one is in flight.
    pub active_catalog: TokenSlot,

    /// Last notification for the user (save confirmation, failures).
    pub notice: Option<String>,

    /// Last error surfaced to the user.
    pub last_error: Option<PipelineError>,

    /// Stories from the last successful history fetch, newest first.
    pub history: Vec<Story>,
}

impl SessionState {
    /// Fresh session: `Ready`, empty text and catalog, rate/pitch from config.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            text_buffer: String::new(),
            voice_catalog: Vec::new(),
            selected_voice: None,
            rate: clamp_param(config.playback.rate).unwrap_or(1.0),
            pitch: clamp_param(config.playback.pitch).unwrap_or(1.0),
            status: StatusState::Ready,
            active_playback: TokenSlot::default(),
            active_extraction: TokenSlot::default(),
            active_catalog: TokenSlot::default(),
            notice: None,
            last_error: None,
            history: Vec::new(),
        }
    }

    /// Replace the catalog and select `default` from it.
    ///
    /// `default` outside the new catalog is ignored, keeping the invariant
    /// that the selection always comes from the current catalog.
    pub(crate) fn replace_catalog(
        &mut self,
        catalog: Vec<VoiceProfile>,
        default: Option<VoiceProfile>,
    ) {
        self.selected_voice = default.filter(|v| catalog.contains(v));
        self.voice_catalog = catalog;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_ready() {
        assert_eq!(StatusState::default(), StatusState::Ready);
    }

    #[test]
    fn busy_states() {
        assert!(!StatusState::Ready.is_busy());
        assert!(StatusState::Scanning.is_busy());
        assert!(!StatusState::Extracted.is_busy());
        assert!(StatusState::Reading.is_busy());
        assert!(!StatusState::Stopped.is_busy());
        assert!(!StatusState::Error.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(StatusState::Ready.label(), "Ready");
        assert_eq!(StatusState::Scanning.label(), "Scanning image...");
        assert_eq!(StatusState::Extracted.label(), "Text extracted");
        assert_eq!(StatusState::Reading.label(), "Reading...");
        assert_eq!(StatusState::Stopped.label(), "Stopped");
        assert_eq!(StatusState::Error.label(), "Error");
    }

    #[test]
    fn new_session_is_empty_and_ready() {
        let state = SessionState::default();
        assert_eq!(state.status, StatusState::Ready);
        assert!(state.text_buffer.is_empty());
        assert!(state.voice_catalog.is_empty());
        assert!(state.selected_voice.is_none());
        assert!(!state.active_playback.is_active());
        assert!(!state.active_extraction.is_active());
        assert!(!state.active_catalog.is_active());
        assert!((state.rate - 1.0).abs() < f32::EPSILON);
        assert!((state.pitch - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn new_session_clamps_configured_parameters() {
        let mut config = AppConfig::default();
        config.playback.rate = 5.0;
        config.playback.pitch = f32::NAN;

        let state = SessionState::new(&config);
        assert!((state.rate - 2.0).abs() < f32::EPSILON);
        assert!((state.pitch - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn replace_catalog_drops_foreign_selection() {
        let mut state = SessionState::default();
        state.replace_catalog(
            vec![VoiceProfile::new("Alex", "en-US")],
            Some(VoiceProfile::new("Ghost", "xx")),
        );
        assert!(state.selected_voice.is_none());
        assert_eq!(state.voice_catalog.len(), 1);
    }

    #[test]
    fn replace_catalog_with_empty_clears_selection() {
        let mut state = SessionState::default();
        let alex = VoiceProfile::new("Alex", "en-US");
        state.replace_catalog(vec![alex.clone()], Some(alex));
        state.replace_catalog(Vec::new(), None);
        assert!(state.selected_voice.is_none());
        assert!(state.voice_catalog.is_empty());
    }
}
