//! Tesseract recognition engine.
//!
//! Runs `tesseract stdin stdout -l <lang>`, writing the image to the child's
//! stdin and collecting the recognised text from stdout.
//!
//! Dependencies:
//! - tesseract-ocr plus the language packs named in the hint
//!   (install with: sudo apt install tesseract-ocr tesseract-ocr-hin)

use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::OcrConfig;

use super::engine::{ImageInput, OcrEngine, OcrError, OcrProgress};

/// Recognition engine backed by the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: String,
}

impl TesseractEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_path.clone())
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(
        &self,
        image: &ImageInput,
        language: &str,
        progress: &(dyn Fn(OcrProgress) + Send + Sync),
    ) -> Result<String, OcrError> {
        if image.bytes.is_empty() {
            return Err(OcrError::EmptyImage);
        }

        progress(OcrProgress::new("loading image", 0.0));

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::Unavailable(format!("{}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Unavailable("child stdin not captured".into()))?;

        // Feed stdin while stdout is drained, or a large image fills the pipe.
        let bytes = image.bytes.clone();
        let writer = tokio::spawn(async move {
            stdin.write_all(&bytes).await?;
            stdin.shutdown().await
        });

        progress(OcrProgress::new("recognizing text", 0.5));

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("tesseract closed stdin early: {e}"),
            Err(e) => warn!("tesseract stdin writer failed: {e}"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }

        let text =
            String::from_utf8(output.stdout).map_err(|e| OcrError::InvalidOutput(e.to_string()))?;
        debug!("tesseract recognised {} chars from {}", text.len(), image.name);

        progress(OcrProgress::new("done", 1.0));

        // Tesseract terminates every page with a form feed.
        Ok(text
            .trim_end_matches(|c: char| c == '\u{c}' || c.is_whitespace())
            .to_string())
    }
}
