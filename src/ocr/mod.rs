//! Optical text extraction.
//!
//! # Architecture
//!
//! ```text
//! ImageInput ──▶ ExtractionCoordinator::start(token)
//!                     │  (tokio task)
//!                     ▼
//!               OcrEngine::recognize ──progress──▶ ExtractionReport::Progress
//!                     │
//!                     └──────── text / error ───▶ ExtractionReport::Finished
//! ```

pub mod engine;
pub mod extraction;
pub mod tesseract;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{ImageInput, OcrEngine, OcrError, OcrProgress};
pub use extraction::{ExtractionCoordinator, ExtractionReport};
pub use tesseract::TesseractEngine;

#[cfg(test)]
pub use engine::MockOcrEngine;
