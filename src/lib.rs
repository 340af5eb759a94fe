//! Accessible story reader: type or photograph a story, hear it read aloud,
//! and keep it in a story store.
//!
//! | Module | Role |
//! |--------|------|
//! | [`voice`] | voice catalog and default-voice policy |
//! | [`ocr`] | text recognition from images |
//! | [`speech`] | speech synthesis and playback control |
//! | [`store`] | story store client and HTTP service |
//! | [`pipeline`] | session state and the orchestrator loop |
//! | [`app`] | console front end |

pub mod app;
pub mod config;
pub mod ocr;
pub mod pipeline;
pub mod speech;
pub mod store;
pub mod token;
pub mod voice;
