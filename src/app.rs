//! Console front end: line commands in, status announcements out.
//!
//! # Architecture
//!
//! The binary reads stdin line by line and hands each line to
//! [`parse_command`].  Pipeline intents become [`PipelineCommand`]s sent to
//! the orchestrator; local requests (help, status, voice list) are answered
//! from the latest [`SessionState`] snapshot.
//!
//! A renderer task watches the snapshot channel and prints whatever
//! [`describe_change`] reports, so every status transition is announced as a
//! plain line that screen readers pick up.
//!
//! # Commands
//!
//! | Line | Effect |
//! |------|--------|
//! | `text <words>` | replace the text buffer |
//! | `upload <path>` | extract text from an image |
//! | `voices` | list the voice catalog |
//! | `voice <name>` | select a voice by name |
//! | `rate <0.5-2.0>` / `pitch <0.5-2.0>` | set playback parameters |
//! | `play` / `stop` | start or stop reading |
//! | `save [title]` | save the buffer to the story store |
//! | `history` | fetch saved stories |
//! | `status` / `help` / `quit` | local |

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::{PipelineCommand, SessionState, StatusState};
use crate::store::Story;

/// Text printed by `help`.
pub const HELP: &str = "\
Commands:
  text <words>      replace the text to read
  upload <path>     extract text from an image
  voices            list available voices
  voice <name>      select a voice
  rate <0.5-2.0>    set reading speed
  pitch <0.5-2.0>   set voice pitch
  play              read the text aloud
  stop              stop reading
  save [title]      save the text as a story
  history           show saved stories
  status            show the current state
  quit              exit";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// One parsed console line.
#[derive(Debug)]
pub enum ConsoleInput {
    /// Forward to the orchestrator as-is.
    Pipeline(PipelineCommand),
    /// Read the file, then forward as `UploadImage`.
    Upload(PathBuf),
    Voices,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unknown command {0:?}; type `help` for a list")]
    UnknownCommand(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("{0:?} is not a number")]
    InvalidNumber(String),
}

/// Parse one line.  Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleInput>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "text" => ConsoleInput::Pipeline(PipelineCommand::EditText(rest.to_string())),
        "upload" => ConsoleInput::Upload(PathBuf::from(required(rest, "upload")?)),
        "voices" => ConsoleInput::Voices,
        "voice" => ConsoleInput::Pipeline(PipelineCommand::SelectVoice(
            required(rest, "voice")?.to_string(),
        )),
        "rate" => ConsoleInput::Pipeline(PipelineCommand::SetRate(number(rest, "rate")?)),
        "pitch" => ConsoleInput::Pipeline(PipelineCommand::SetPitch(number(rest, "pitch")?)),
        "play" => ConsoleInput::Pipeline(PipelineCommand::Play),
        "stop" => ConsoleInput::Pipeline(PipelineCommand::Stop),
        "save" => ConsoleInput::Pipeline(PipelineCommand::Save {
            title: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "history" => ConsoleInput::Pipeline(PipelineCommand::FetchHistory),
        "status" => ConsoleInput::Status,
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        _ => return Err(ParseError::UnknownCommand(word.to_string())),
    };
    Ok(Some(input))
}

fn required<'a>(rest: &'a str, command: &'static str) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn number(rest: &str, command: &'static str) -> Result<f32, ParseError> {
    required(rest, command)?
        .parse()
        .map_err(|_| ParseError::InvalidNumber(rest.to_string()))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Multi-line summary for `status`.
pub fn render_status(state: &SessionState) -> String {
    let voice = state
        .selected_voice
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".into());

    let mut out = format!(
        "Status: {}\nVoice:  {voice}\nRate:   {:.2}\nPitch:  {:.2}\nText:   {}",
        state.status.label(),
        state.rate,
        state.pitch,
        preview(&state.text_buffer)
    );
    if let Some(notice) = &state.notice {
        out.push_str("\nNotice: ");
        out.push_str(notice);
    }
    out
}

/// Numbered voice list, marking the selected one.
pub fn render_voices(state: &SessionState) -> String {
    if state.voice_catalog.is_empty() {
        return "No voices available".into();
    }
    state
        .voice_catalog
        .iter()
        .enumerate()
        .map(|(i, voice)| {
            let marker = if state.selected_voice.as_ref() == Some(voice) {
                "*"
            } else {
                " "
            };
            format!("{marker} {:>2}. {voice}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Saved stories, newest first.
pub fn render_history(stories: &[Story]) -> String {
    if stories.is_empty() {
        return "No saved stories".into();
    }
    stories
        .iter()
        .map(|s| {
            format!(
                "{}  {}: {}",
                s.date.format("%Y-%m-%d %H:%M"),
                s.title,
                preview(&s.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First line of `text`, cut to 60 characters.
fn preview(text: &str) -> String {
    const MAX: usize = 60;
    let text = text.trim();
    if text.is_empty() {
        return "(empty)".into();
    }
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() > MAX || text.lines().count() > 1 {
        let cut: String = first.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

/// Lines to announce when the session moves from `prev` to `next`.
pub fn describe_change(prev: &SessionState, next: &SessionState) -> Vec<String> {
    let mut lines = Vec::new();

    if prev.voice_catalog != next.voice_catalog {
        lines.push(format!("{} voices available", next.voice_catalog.len()));
    }
    if prev.selected_voice != next.selected_voice {
        if let Some(voice) = &next.selected_voice {
            lines.push(format!("Voice: {voice}"));
        }
    }
    if prev.status != next.status {
        lines.push(next.status.label().to_string());
    }
    if prev.text_buffer != next.text_buffer && next.status == StatusState::Extracted {
        lines.push(format!("Text: {}", preview(&next.text_buffer)));
    }
    if prev.notice != next.notice {
        if let Some(notice) = &next.notice {
            lines.push(notice.clone());
        }
    }
    if prev.history != next.history {
        lines.push(render_history(&next.history));
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceProfile;

    fn parse(line: &str) -> ConsoleInput {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn blank_line_is_ignored() {
        assert!(parse_command("   ").unwrap().is_none());
    }

    #[test]
    fn text_keeps_everything_after_the_verb() {
        match parse("text  Once upon a time ") {
            ConsoleInput::Pipeline(PipelineCommand::EditText(t)) => {
                assert_eq!(t, "Once upon a time")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_text_clears_the_buffer() {
        match parse("text") {
            ConsoleInput::Pipeline(PipelineCommand::EditText(t)) => assert!(t.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn upload_requires_a_path() {
        assert_eq!(
            parse_command("upload").unwrap_err(),
            ParseError::MissingArgument("upload")
        );
        match parse("upload /tmp/page one.png") {
            ConsoleInput::Upload(p) => assert_eq!(p, PathBuf::from("/tmp/page one.png")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rate_and_pitch_parse_numbers() {
        assert!(matches!(
            parse("rate 1.5"),
            ConsoleInput::Pipeline(PipelineCommand::SetRate(r)) if (r - 1.5).abs() < f32::EPSILON
        ));
        assert!(matches!(
            parse("PITCH 0.8"),
            ConsoleInput::Pipeline(PipelineCommand::SetPitch(p)) if (p - 0.8).abs() < f32::EPSILON
        ));
        assert_eq!(
            parse_command("rate fast").unwrap_err(),
            ParseError::InvalidNumber("fast".into())
        );
    }

    #[test]
    fn save_title_is_optional() {
        assert!(matches!(
            parse("save"),
            ConsoleInput::Pipeline(PipelineCommand::Save { title: None })
        ));
        match parse("save The Fox") {
            ConsoleInput::Pipeline(PipelineCommand::Save { title }) => {
                assert_eq!(title.as_deref(), Some("The Fox"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn voice_name_may_contain_spaces() {
        match parse("voice Google हिन्दी") {
            ConsoleInput::Pipeline(PipelineCommand::SelectVoice(n)) => {
                assert_eq!(n, "Google हिन्दी")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn local_commands() {
        assert!(matches!(parse("voices"), ConsoleInput::Voices));
        assert!(matches!(parse("status"), ConsoleInput::Status));
        assert!(matches!(parse("help"), ConsoleInput::Help));
        assert!(matches!(parse("exit"), ConsoleInput::Quit));
        assert!(matches!(
            parse("history"),
            ConsoleInput::Pipeline(PipelineCommand::FetchHistory)
        ));
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert_eq!(
            parse_command("dance now").unwrap_err(),
            ParseError::UnknownCommand("dance".into())
        );
    }

    #[test]
    fn status_render_includes_voice_and_notice() {
        let mut state = SessionState::default();
        state.selected_voice = Some(VoiceProfile::new("Lekha", "hi-IN"));
        state.notice = Some("Story Saved Successfully!".into());

        let out = render_status(&state);
        assert!(out.contains("Status: Ready"));
        assert!(out.contains("Lekha (hi-IN)"));
        assert!(out.contains("(empty)"));
        assert!(out.contains("Story Saved Successfully!"));
    }

    #[test]
    fn voices_render_marks_selection() {
        let mut state = SessionState::default();
        let alex = VoiceProfile::new("Alex", "en-US");
        let lekha = VoiceProfile::new("Lekha", "hi-IN");
        state.voice_catalog = vec![alex, lekha.clone()];
        state.selected_voice = Some(lekha);

        let out = render_voices(&state);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("   1. Alex"));
        assert!(lines[1].starts_with("*  2. Lekha"));
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "a".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 63);
        assert!(p.ends_with("..."));
        assert_eq!(preview("two\nlines"), "two...");
    }

    #[test]
    fn change_announces_status_and_notice() {
        let prev = SessionState::default();
        let mut next = prev.clone();
        next.status = StatusState::Extracted;
        next.text_buffer = "Hello".into();
        next.notice = Some("saved".into());

        assert_eq!(
            describe_change(&prev, &next),
            vec![
                "Text extracted".to_string(),
                "Text: Hello".to_string(),
                "saved".to_string()
            ]
        );
    }

    #[test]
    fn unchanged_state_announces_nothing() {
        let state = SessionState::default();
        assert!(describe_change(&state, &state.clone()).is_empty());
    }
}
