//! Voice directory: catalog refresh and default selection.
//!
//! Platforms may report an empty voice list at first and announce voices
//! later, so a refresh runs once at startup and again on every announcement.
//! Each refresh carries the token it was started under; results travel to
//! the orchestrator as [`CatalogReport`]s and announcements as
//! [`VoicesChanged`].

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::VoiceConfig;
use crate::speech::{SpeechError, SpeechSynth};
use crate::token::Token;

use super::profile::{select_default, VoiceProfile};

/// Outcome of one catalog refresh, tagged with its token.
#[derive(Debug)]
pub struct CatalogReport {
    pub token: Token,
    pub outcome: Result<Vec<VoiceProfile>, SpeechError>,
}

/// The platform announced that its voice list changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicesChanged;

/// Queries the speech backend for voices and applies the default policy.
#[derive(Clone)]
pub struct VoiceDirectory {
    synth: Arc<dyn SpeechSynth>,
    prefs: VoiceConfig,
}

impl VoiceDirectory {
    pub fn new(synth: Arc<dyn SpeechSynth>, prefs: VoiceConfig) -> Self {
        Self { synth, prefs }
    }

    /// Ask the backend for its current voice list.
    pub async fn refresh_catalog(&self) -> Result<Vec<VoiceProfile>, SpeechError> {
        self.synth.voices().await
    }

    /// Default voice for `catalog` under the configured preferences.
    pub fn select_default(&self, catalog: &[VoiceProfile]) -> Option<VoiceProfile> {
        select_default(catalog, &self.prefs)
    }

    /// Refresh under `token` in the background and deliver the result on
    /// `reports`.
    pub fn spawn_refresh<E>(
        &self,
        token: Token,
        reports: mpsc::UnboundedSender<E>,
    ) -> JoinHandle<()>
    where
        E: From<CatalogReport> + Send + 'static,
    {
        log::debug!("voices: refresh {token} started");
        let directory = self.clone();
        tokio::spawn(async move {
            let outcome = directory.refresh_catalog().await;
            let _ = reports.send(CatalogReport { token, outcome }.into());
        })
    }

    /// Forward every platform announcement as [`VoicesChanged`].
    ///
    /// The receiver decides when to refresh.  Returns `None` when the
    /// backend has no announcement stream.  The task ends when the stream
    /// closes or `reports` is dropped.
    pub fn watch_announcements<E>(
        &self,
        reports: mpsc::UnboundedSender<E>,
    ) -> Option<JoinHandle<()>>
    where
        E: From<VoicesChanged> + Send + 'static,
    {
        let mut announcements = self.synth.announcements()?;

        Some(tokio::spawn(async move {
            loop {
                match announcements.recv().await {
                    // Several missed announcements still need only one refresh.
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        log::debug!("voices: platform announced a voice change");
                        if reports.send(VoicesChanged.into()).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }
}
