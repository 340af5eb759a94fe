//! Pipeline orchestrator: the single writer of [`SessionState`].
//!
//! [`PipelineOrchestrator`] receives [`PipelineCommand`]s from the front end
//! and [`PipelineEvent`]s from the subsystems it started, one at a time, on a
//! single `tokio::select!` loop.
//!
//! # Pipeline flow
//!
//! ```text
//! UploadImage(img)
//!   └─▶ issue extraction token, status = Scanning
//!         └─▶ ExtractionCoordinator (task) ──▶ Extraction{token, text|err}
//!               ├─ token current → text_buffer = text, Extracted | Error
//!               └─ token stale   → discarded
//!
//! Play
//!   └─▶ cancel current utterance, issue playback token, status = Reading
//!         └─▶ PlaybackController (task) ──▶ Playback{token, ended|err}
//!               ├─ token current → clear token (err → Error)
//!               └─ token stale   → discarded
//!
//! startup / VoicesChanged
//!   └─▶ issue catalog token ──▶ Catalog{token, voices|err}
//!         ├─ token current → replace catalog, re-apply default voice
//!         └─ token stale   → discarded
//!
//! Save / FetchHistory
//!   └─▶ StoryStore (task) ──▶ SaveFinished | HistoryFetched → notice
//! ```
//!
//! Every accepted input publishes a fresh snapshot on a `watch` channel.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::config::AppConfig;
use crate::ocr::{
    ExtractionCoordinator, ExtractionReport, ImageInput, OcrEngine, OcrError, OcrProgress,
};
use crate::speech::{
    clamp_param, PlaybackController, PlaybackError, PlaybackReport, SpeechError, SpeechSynth,
};
use crate::store::{NewStory, StoreError, Story, StoryStore};
use crate::token::{Token, TokenSource};
use crate::voice::{CatalogReport, VoiceDirectory, VoicesChanged};

use super::state::{SessionState, StatusState};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors surfaced to the user.  None of them are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Play was requested but the voice catalog is empty.
    #[error("No voice available. Install a speech voice and try again")]
    NoVoiceAvailable,
    /// The current extraction failed.
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),
    /// The story store did not accept a save.
    #[error("Failed to save story: {0}")]
    SaveFailed(String),
    /// The story history could not be loaded.
    #[error("Failed to fetch stories: {0}")]
    FetchFailed(String),
    /// The current utterance ended with an error.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// User intents, sent by the front end.
#[derive(Debug)]
pub enum PipelineCommand {
    /// Replace the text buffer.
    EditText(String),
    /// Recognise text in an image and replace the buffer with it.
    UploadImage(ImageInput),
    /// Select the catalog voice with this exact name.
    SelectVoice(String),
    SetRate(f32),
    SetPitch(f32),
    /// Speak the buffer with the selected voice.
    Play,
    Stop,
    /// Save the buffer; `None` uses the configured default title.
    Save { title: Option<String> },
    FetchHistory,
}

/// Results delivered by background work.
#[derive(Debug)]
pub enum PipelineEvent {
    Catalog(CatalogReport),
    VoicesChanged,
    Extraction(ExtractionReport),
    Playback(PlaybackReport),
    SaveFinished(Result<String, StoreError>),
    HistoryFetched(Result<Vec<Story>, StoreError>),
}

impl From<CatalogReport> for PipelineEvent {
    fn from(report: CatalogReport) -> Self {
        PipelineEvent::Catalog(report)
    }
}

impl From<VoicesChanged> for PipelineEvent {
    fn from(_: VoicesChanged) -> Self {
        PipelineEvent::VoicesChanged
    }
}

impl From<ExtractionReport> for PipelineEvent {
    fn from(report: ExtractionReport) -> Self {
        PipelineEvent::Extraction(report)
    }
}

impl From<PlaybackReport> for PipelineEvent {
    fn from(report: PlaybackReport) -> Self {
        PipelineEvent::Playback(report)
    }
}

/// Observer for OCR progress of the current extraction.
pub type ProgressHook = Box<dyn Fn(Token, &OcrProgress) + Send + Sync>;

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the reading pipeline.
///
/// Create with [`PipelineOrchestrator::new`], grab a snapshot receiver with
/// [`subscribe`](Self::subscribe), then call [`run`](Self::run) inside a
/// tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voice_reader::config::AppConfig;
/// use voice_reader::ocr::TesseractEngine;
/// use voice_reader::pipeline::{PipelineCommand, PipelineOrchestrator};
/// use voice_reader::speech::EspeakSynth;
/// use voice_reader::store::HttpStoryClient;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let orchestrator = PipelineOrchestrator::new(
///     &config,
///     Arc::new(EspeakSynth::from_config(&config.speech)),
///     Arc::new(TesseractEngine::from_config(&config.ocr)),
///     Arc::new(HttpStoryClient::from_config(&config.store)),
/// );
/// let snapshots = orchestrator.subscribe();
///
/// let (command_tx, command_rx) = tokio::sync::mpsc::channel(32);
/// tokio::spawn(orchestrator.run(command_rx));
///
/// command_tx.send(PipelineCommand::EditText("Hello".into())).await.unwrap();
/// command_tx.send(PipelineCommand::Play).await.unwrap();
/// println!("{}", snapshots.borrow().status.label());
/// # }
/// ```
pub struct PipelineOrchestrator {
    state: SessionState,
    tokens: TokenSource,
    voices: VoiceDirectory,
    extraction: ExtractionCoordinator,
    playback: PlaybackController,
    store: Arc<dyn StoryStore>,
    default_title: String,
    events_tx: mpsc::UnboundedSender<PipelineEvent>,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    snapshots: watch::Sender<SessionState>,
    progress_hook: Option<ProgressHook>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator with a fresh `Ready` session.
    ///
    /// # Arguments
    ///
    /// * `config` — voice preferences, OCR language, initial rate/pitch and
    ///   the default story title.
    /// * `synth`  — speech backend (e.g. `EspeakSynth`).
    /// * `ocr`    — recognition engine (e.g. `TesseractEngine`).
    /// * `store`  — remote story store (e.g. `HttpStoryClient`).
    pub fn new(
        config: &AppConfig,
        synth: Arc<dyn SpeechSynth>,
        ocr: Arc<dyn OcrEngine>,
        store: Arc<dyn StoryStore>,
    ) -> Self {
        let state = SessionState::new(config);
        let (snapshots, _) = watch::channel(state.clone());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state,
            tokens: TokenSource::new(),
            voices: VoiceDirectory::new(Arc::clone(&synth), config.voice.clone()),
            extraction: ExtractionCoordinator::from_config(ocr, &config.ocr),
            playback: PlaybackController::new(synth),
            store,
            default_title: config.store.default_title.clone(),
            events_tx,
            events_rx,
            snapshots,
            progress_hook: None,
        }
    }

    /// Call `hook` for every progress update of the current extraction.
    pub fn with_progress_hook(mut self, hook: ProgressHook) -> Self {
        self.progress_hook = Some(hook);
        self
    }

    /// Receiver of session snapshots; the first value is the initial state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed.
    ///
    /// Loads the voice catalog first and keeps it in sync with platform
    /// announcements for as long as the loop runs.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PipelineCommand>) {
        self.refresh_voices();
        let watcher = self.voices.watch_announcements(self.events_tx.clone());

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => {
                    if self.handle_event(event) {
                        self.publish();
                    }
                }
            }
        }

        self.playback.stop();
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        log::info!("pipeline: command channel closed, orchestrator shutting down");
    }

    /// Start a catalog refresh that supersedes any refresh still in flight.
    fn refresh_voices(&mut self) {
        let token = self.state.active_catalog.issue(&mut self.tokens);
        self.voices.spawn_refresh(token, self.events_tx.clone());
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }

    /// Record `err` as the user-visible notice and last error.
    fn surface(&mut self, err: PipelineError) {
        log::warn!("pipeline: {err}");
        self.state.notice = Some(err.to_string());
        self.state.last_error = Some(err);
    }

    fn set_status(&mut self, status: StatusState) {
        if self.state.status != status {
            log::debug!("pipeline: {:?} → {:?}", self.state.status, status);
        }
        self.state.status = status;
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Apply one command and publish the resulting snapshot.
    pub(crate) fn handle_command(&mut self, command: PipelineCommand) {
        match command {
            PipelineCommand::EditText(text) => self.state.text_buffer = text,
            PipelineCommand::UploadImage(image) => self.upload(image),
            PipelineCommand::SelectVoice(name) => self.select_voice(&name),
            PipelineCommand::SetRate(rate) => match clamp_param(rate) {
                Some(rate) => self.state.rate = rate,
                None => log::warn!("pipeline: ignoring rate {rate}"),
            },
            PipelineCommand::SetPitch(pitch) => match clamp_param(pitch) {
                Some(pitch) => self.state.pitch = pitch,
                None => log::warn!("pipeline: ignoring pitch {pitch}"),
            },
            PipelineCommand::Play => self.play(),
            PipelineCommand::Stop => self.stop(),
            PipelineCommand::Save { title } => self.save(title),
            PipelineCommand::FetchHistory => self.fetch_history(),
        }
        self.publish();
    }

    fn upload(&mut self, image: ImageInput) {
        let token = self.state.active_extraction.issue(&mut self.tokens);
        log::info!("pipeline: extraction {token} started for {}", image.name);
        self.set_status(StatusState::Scanning);
        self.extraction.start(token, image, self.events_tx.clone());
    }

    fn select_voice(&mut self, name: &str) {
        match self.state.voice_catalog.iter().find(|v| v.name == name) {
            Some(voice) => {
                log::info!("pipeline: voice selected: {voice}");
                self.state.selected_voice = Some(voice.clone());
            }
            None => log::warn!("pipeline: voice {name:?} is not in the catalog"),
        }
    }

    fn play(&mut self) {
        let prepared = PlaybackController::prepare(
            &self.state.text_buffer,
            self.state.selected_voice.as_ref(),
            self.state.rate,
            self.state.pitch,
        );

        let utterance = match prepared {
            Ok(Some(utterance)) => utterance,
            Ok(None) => {
                log::debug!("pipeline: play with empty text ignored");
                return;
            }
            Err(PlaybackError::NoVoiceAvailable) => {
                self.surface(PipelineError::NoVoiceAvailable);
                return;
            }
        };

        let token = self.state.active_playback.issue(&mut self.tokens);
        match self
            .playback
            .start(token, utterance, self.events_tx.clone())
        {
            Ok(()) => {
                log::info!("pipeline: playback {token} started");
                self.set_status(StatusState::Reading);
            }
            Err(e) => {
                self.state.active_playback.clear();
                self.set_status(StatusState::Error);
                self.surface(PipelineError::PlaybackFailed(e.to_string()));
            }
        }
    }

    fn stop(&mut self) {
        self.playback.stop();
        if let Some(token) = self.state.active_playback.clear() {
            log::info!("pipeline: playback {token} stopped");
        }
        self.set_status(StatusState::Stopped);
    }

    fn save(&mut self, title: Option<String>) {
        let story = NewStory::new(
            title.unwrap_or_else(|| self.default_title.clone()),
            self.state.text_buffer.clone(),
        );
        let store = Arc::clone(&self.store);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let outcome = store.save(&story).await;
            let _ = events.send(PipelineEvent::SaveFinished(outcome));
        });
    }

    fn fetch_history(&mut self) {
        let store = Arc::clone(&self.store);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let outcome = store.list().await;
            let _ = events.send(PipelineEvent::HistoryFetched(outcome));
        });
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Apply one subsystem event.  Returns `false` when it was discarded.
    pub(crate) fn handle_event(&mut self, event: PipelineEvent) -> bool {
        match event {
            PipelineEvent::Catalog(report) => self.on_catalog(report),
            PipelineEvent::VoicesChanged => {
                self.refresh_voices();
                false
            }
            PipelineEvent::Extraction(ExtractionReport::Progress { token, progress }) => {
                if self.state.active_extraction.current() == Some(token) {
                    log::debug!(
                        "pipeline: extraction {token}: {} ({:.0}%)",
                        progress.status,
                        progress.progress * 100.0
                    );
                    if let Some(hook) = &self.progress_hook {
                        hook(token, &progress);
                    }
                }
                false
            }
            PipelineEvent::Extraction(ExtractionReport::Finished { token, outcome }) => {
                self.on_extraction_finished(token, outcome)
            }
            PipelineEvent::Playback(report) => self.on_playback_finished(report),
            PipelineEvent::SaveFinished(outcome) => {
                match outcome {
                    Ok(message) => {
                        log::info!("pipeline: story saved");
                        self.state.notice = Some(message);
                    }
                    Err(e) => self.surface(PipelineError::SaveFailed(e.to_string())),
                }
                true
            }
            PipelineEvent::HistoryFetched(outcome) => {
                match outcome {
                    Ok(stories) => {
                        log::info!("pipeline: fetched {} stories", stories.len());
                        self.state.history = stories;
                    }
                    Err(e) => self.surface(PipelineError::FetchFailed(e.to_string())),
                }
                true
            }
        }
    }

    fn on_catalog(&mut self, report: CatalogReport) -> bool {
        let CatalogReport { token, outcome } = report;
        if !self.state.active_catalog.settle(token) {
            log::debug!("pipeline: discarding stale voice refresh {token}");
            return false;
        }

        match outcome {
            Ok(catalog) => {
                let default = self.voices.select_default(&catalog);
                log::info!(
                    "pipeline: {} voices, default {}",
                    catalog.len(),
                    default
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "none".into())
                );
                self.state.replace_catalog(catalog, default);
                true
            }
            Err(e) => {
                log::error!("pipeline: voice enumeration failed: {e}");
                true
            }
        }
    }

    fn on_extraction_finished(&mut self, token: Token, outcome: Result<String, OcrError>) -> bool {
        if !self.state.active_extraction.settle(token) {
            log::debug!("pipeline: discarding stale extraction {token}");
            return false;
        }

        match outcome {
            Ok(text) => {
                log::info!("pipeline: extraction {token} produced {} chars", text.len());
                self.state.text_buffer = text;
                self.set_status(StatusState::Extracted);
            }
            Err(e) => {
                self.set_status(StatusState::Error);
                self.surface(PipelineError::ExtractionFailed(e.to_string()));
            }
        }
        true
    }

    fn on_playback_finished(&mut self, report: PlaybackReport) -> bool {
        let PlaybackReport { token, outcome } = report;
        if !self.state.active_playback.settle(token) {
            log::debug!("pipeline: discarding stale playback {token}");
            return false;
        }

        match outcome {
            Ok(()) => log::info!("pipeline: playback {token} finished"),
            Err(SpeechError::Cancelled) => log::debug!("pipeline: playback {token} cancelled"),
            Err(e) => {
                self.set_status(StatusState::Error);
                self.surface(PipelineError::PlaybackFailed(e.to_string()));
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
