//! Voice profiles and the default-voice selection policy.

use std::fmt;

use crate::config::VoiceConfig;

/// One selectable synthetic voice as reported by the speech backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceProfile {
    /// Human-readable voice name, e.g. `"Google हिन्दी"`.
    pub name: String,
    /// BCP-47-ish language tag, e.g. `"hi-IN"`.
    pub language_tag: String,
}

impl VoiceProfile {
    pub fn new(name: impl Into<String>, language_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_tag: language_tag.into(),
        }
    }
}

impl fmt::Display for VoiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.language_tag)
    }
}

/// Pick the default voice from `catalog`.
///
/// In order of precedence:
///
/// 1. first profile whose name contains `preferred_provider`;
/// 2. first profile whose language tag contains `preferred_language`;
/// 3. first profile;
/// 4. `None` for an empty catalog.
///
/// Empty preference strings are skipped rather than matching everything.
///
/// ```
/// use voice_reader::config::VoiceConfig;
/// use voice_reader::voice::{select_default, VoiceProfile};
///
/// let catalog = vec![
///     VoiceProfile::new("X", "en-US"),
///     VoiceProfile::new("Google TTS", "hi"),
/// ];
/// let picked = select_default(&catalog, &VoiceConfig::default());
/// assert_eq!(picked, Some(VoiceProfile::new("Google TTS", "hi")));
/// ```
pub fn select_default(catalog: &[VoiceProfile], prefs: &VoiceConfig) -> Option<VoiceProfile> {
    let by_provider = || {
        (!prefs.preferred_provider.is_empty())
            .then(|| {
                catalog
                    .iter()
                    .find(|v| v.name.contains(&prefs.preferred_provider))
            })
            .flatten()
    };
    let by_language = || {
        (!prefs.preferred_language.is_empty())
            .then(|| {
                catalog
                    .iter()
                    .find(|v| v.language_tag.contains(&prefs.preferred_language))
            })
            .flatten()
    };

    by_provider()
        .or_else(by_language)
        .or_else(|| catalog.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(provider: &str, language: &str) -> VoiceConfig {
        VoiceConfig {
            preferred_provider: provider.into(),
            preferred_language: language.into(),
        }
    }

    #[test]
    fn provider_marker_wins() {
        let catalog = vec![
            VoiceProfile::new("X", ""),
            VoiceProfile::new("Google TTS", "hi"),
        ];
        assert_eq!(
            select_default(&catalog, &prefs("Google", "hi")),
            Some(VoiceProfile::new("Google TTS", "hi"))
        );
    }

    #[test]
    fn provider_marker_beats_earlier_language_match() {
        let catalog = vec![
            VoiceProfile::new("Lekha", "hi-IN"),
            VoiceProfile::new("Google US English", "en-US"),
        ];
        assert_eq!(
            select_default(&catalog, &prefs("Google", "hi")).map(|v| v.name),
            Some("Google US English".to_string())
        );
    }

    #[test]
    fn language_match_when_no_provider_match() {
        let catalog = vec![
            VoiceProfile::new("Alex", "en-US"),
            VoiceProfile::new("Lekha", "hi-IN"),
        ];
        assert_eq!(
            select_default(&catalog, &prefs("Google", "hi")).map(|v| v.name),
            Some("Lekha".to_string())
        );
    }

    #[test]
    fn first_voice_when_nothing_matches() {
        let catalog = vec![
            VoiceProfile::new("Alex", "en-US"),
            VoiceProfile::new("Amelie", "fr-CA"),
        ];
        assert_eq!(
            select_default(&catalog, &prefs("Google", "hi")).map(|v| v.name),
            Some("Alex".to_string())
        );
    }

    #[test]
    fn empty_catalog_selects_none() {
        assert_eq!(select_default(&[], &prefs("Google", "hi")), None);
    }

    #[test]
    fn empty_preferences_fall_through_to_first() {
        let catalog = vec![
            VoiceProfile::new("Alex", "en-US"),
            VoiceProfile::new("Google TTS", "hi"),
        ];
        assert_eq!(
            select_default(&catalog, &prefs("", "")).map(|v| v.name),
            Some("Alex".to_string())
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let catalog = vec![
            VoiceProfile::new("Alex", "en-US"),
            VoiceProfile::new("Lekha", "hi-IN"),
            VoiceProfile::new("Google हिन्दी", "hi-IN"),
        ];
        let p = prefs("Google", "hi");
        let first = select_default(&catalog, &p);
        for _ in 0..10 {
            assert_eq!(select_default(&catalog, &p), first);
        }
    }
}
