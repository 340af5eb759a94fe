//! Voice directory module.
//!
//! * [`VoiceProfile`] — one selectable synthetic voice.
//! * [`select_default`] — the deterministic default-voice policy.
//! * [`VoiceDirectory`] — refreshes the catalog from the speech backend,
//!   including after platform announcements.

pub mod directory;
pub mod profile;

pub use directory::{CatalogReport, VoiceDirectory, VoicesChanged};
pub use profile::{select_default, VoiceProfile};
