//! Extraction coordinator: one image in, one tagged text result out.
//!
//! The coordinator runs the engine in a background task and reports
//! progress and completion as [`ExtractionReport`]s carrying the token the
//! orchestrator issued.  It never decides whether a result is current; that
//! check belongs to the orchestrator.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::OcrConfig;
use crate::token::Token;

use super::engine::{ImageInput, OcrEngine, OcrError, OcrProgress};

/// Messages produced while one extraction runs.
#[derive(Debug)]
pub enum ExtractionReport {
    /// Intermediate progress; informational only.
    Progress { token: Token, progress: OcrProgress },
    /// Final text or error.
    Finished {
        token: Token,
        outcome: Result<String, OcrError>,
    },
}

impl ExtractionReport {
    pub fn token(&self) -> Token {
        match self {
            Self::Progress { token, .. } | Self::Finished { token, .. } => *token,
        }
    }
}

/// Drives an [`OcrEngine`] for uploaded images.
#[derive(Clone)]
pub struct ExtractionCoordinator {
    engine: Arc<dyn OcrEngine>,
    language: String,
}

impl ExtractionCoordinator {
    pub fn new(engine: Arc<dyn OcrEngine>, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
        }
    }

    pub fn from_config(engine: Arc<dyn OcrEngine>, config: &OcrConfig) -> Self {
        Self::new(engine, config.language.clone())
    }

    /// Start recognising `image` under `token`.
    pub fn start<E>(
        &self,
        token: Token,
        image: ImageInput,
        reports: mpsc::UnboundedSender<E>,
    ) -> JoinHandle<()>
    where
        E: From<ExtractionReport> + Send + 'static,
    {
        log::debug!(
            "extraction {token}: recognising {} ({} bytes, lang={})",
            image.name,
            image.bytes.len(),
            self.language
        );

        let engine = Arc::clone(&self.engine);
        let language = self.language.clone();

        tokio::spawn(async move {
            let progress_tx = reports.clone();
            let on_progress = move |progress: OcrProgress| {
                let _ = progress_tx.send(ExtractionReport::Progress { token, progress }.into());
            };

            let outcome = engine.recognize(&image, &language, &on_progress).await;
            let _ = reports.send(ExtractionReport::Finished { token, outcome }.into());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::MockOcrEngine;
    use crate::token::TokenSource;

    #[tokio::test]
    async fn reports_progress_then_result_with_token() {
        let engine = Arc::new(MockOcrEngine::new());
        let release = engine.gate("page.png");
        let coordinator = ExtractionCoordinator::new(engine.clone(), "eng+hin");
        let (tx, mut rx) = mpsc::unbounded_channel::<ExtractionReport>();
        let token = TokenSource::new().mint();

        coordinator.start(token, ImageInput::new("page.png", vec![1]), tx);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ExtractionReport::Progress { .. }));
        assert_eq!(first.token(), token);

        release.send(Ok("नमस्ते".into())).unwrap();
        match rx.recv().await.unwrap() {
            ExtractionReport::Finished { token: t, outcome } => {
                assert_eq!(t, token);
                assert_eq!(outcome.unwrap(), "नमस्ते");
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert_eq!(engine.languages(), vec!["eng+hin".to_string()]);
    }

    #[tokio::test]
    async fn engine_error_is_reported() {
        let engine = Arc::new(MockOcrEngine::new());
        let release = engine.gate("page.png");
        let coordinator = ExtractionCoordinator::new(engine, "eng");
        let (tx, mut rx) = mpsc::unbounded_channel::<ExtractionReport>();
        let token = TokenSource::new().mint();

        coordinator.start(token, ImageInput::new("page.png", vec![1]), tx);
        release
            .send(Err(OcrError::Recognition("unreadable".into())))
            .unwrap();

        loop {
            if let ExtractionReport::Finished { outcome, .. } = rx.recv().await.unwrap() {
                assert_eq!(outcome, Err(OcrError::Recognition("unreadable".into())));
                break;
            }
        }
    }
}
