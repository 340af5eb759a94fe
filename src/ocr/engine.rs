//! Optical recognition engine trait.
//!
//! [`OcrEngine`] is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn OcrEngine>`.  Progress is reported through a callback while the
//! recognition future is pending.
//!
//! [`MockOcrEngine`] (available under `#[cfg(test)]`) holds every request
//! until the test releases it, so tests control completion order.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// OcrError
// ---------------------------------------------------------------------------

/// All errors that can arise from the recognition engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OcrError {
    /// The uploaded image has no bytes.
    #[error("image is empty")]
    EmptyImage,

    /// The engine could not be started.
    #[error("recognition engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran but reported a failure.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// The engine output was not valid UTF-8 text.
    #[error("recognition output is not text: {0}")]
    InvalidOutput(String),
}

// ---------------------------------------------------------------------------
// ImageInput / OcrProgress
// ---------------------------------------------------------------------------

/// An uploaded image, as raw encoded bytes (PNG, JPEG, …).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Display name, usually the file name.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an image file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Intermediate progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrProgress {
    /// Engine phase, e.g. `"recognizing text"`.
    pub status: String,
    /// Fraction complete, `0.0 ..= 1.0`.
    pub progress: f32,
}

impl OcrProgress {
    pub fn new(status: impl Into<String>, progress: f32) -> Self {
        Self {
            status: status.into(),
            progress,
        }
    }
}

// ---------------------------------------------------------------------------
// OcrEngine trait
// ---------------------------------------------------------------------------

/// Turns an image into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise the text in `image`.
    ///
    /// `language` is an engine-specific hint such as `"eng+hin"`.
    async fn recognize(
        &self,
        image: &ImageInput,
        language: &str,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<String, OcrError>;
}

// Compile-time assertion: Box<dyn OcrEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn OcrEngine>) {}
};

// ---------------------------------------------------------------------------
// MockOcrEngine  (test-only)
// ---------------------------------------------------------------------------

/// Test double that waits for the test to release each image by name.
#[cfg(test)]
#[derive(Default)]
pub struct MockOcrEngine {
    gates: std::sync::Mutex<
        std::collections::HashMap<String, tokio::sync::oneshot::Receiver<Result<String, OcrError>>>,
    >,
    languages: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockOcrEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`; the returned sender releases its recognition result.
    pub fn gate(&self, name: &str) -> tokio::sync::oneshot::Sender<Result<String, OcrError>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.gates.lock().unwrap().insert(name.to_string(), rx);
        tx
    }

    /// Language hints received so far.
    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn recognize(
        &self,
        image: &ImageInput,
        language: &str,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<String, OcrError> {
        self.languages.lock().unwrap().push(language.to_string());
        let gate = self.gates.lock().unwrap().remove(&image.name);
        let Some(gate) = gate else {
            return Err(OcrError::Recognition(format!("unexpected image {}", image.name)));
        };
        progress(OcrProgress::new("recognizing text", 0.5));
        gate.await
            .unwrap_or_else(|_| Err(OcrError::Recognition("gate dropped".into())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
