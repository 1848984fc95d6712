//! Parser for the labeled-line script format returned by the chat model
//!
//! ```text
//! Scene: at a café
//! Role A: a barista
//! Role B: a student
//! Voice A: nova
//! Voice B: echo
//! A: Hi there! | Studying hard today?
//! Translation: こんにちは！ | 今日も勉強？
//! B: Yes, exams are next week.
//! ```
//!
//! The header lines are position-sensitive. Speaker lines alternate starting
//! with `A` and each may be followed by one `Translation:` line. Blank lines
//! and whitespace around labels and values are ignored.

use sdk::errors::EngineError;
use sdk::types::{PerRole, Role, Scenario, Turn};

/// Voices accepted by the speech endpoint
pub const KNOWN_VOICES: &[&str] = &[
    "alloy", "ash", "ballad", "coral", "echo", "fable", "nova", "onyx", "sage", "shimmer",
];

const TRANSLATION_LABEL: &str = "Translation";

/// Parse a model reply into a `Scenario`
///
/// Unknown voices are replaced by `default_voice`. Any structural problem is a
/// `ScenarioParse` error.
pub fn parse_scenario(text: &str, default_voice: &str) -> Result<Scenario, EngineError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate();

    let mut header = |expected: &str| -> Result<String, EngineError> {
        let (n, line) = lines.next().ok_or_else(|| {
            EngineError::ScenarioParse(format!("missing '{}' line", expected))
        })?;
        match split_label(line) {
            Some((label, value)) if label == expected => Ok(value),
            _ => Err(EngineError::ScenarioParse(format!(
                "line {}: expected '{}:', found '{}'",
                n + 1,
                expected,
                line
            ))),
        }
    };

    let scene = header("Scene")?;
    let role_a = header("Role A")?;
    let role_b = header("Role B")?;
    let voice_a = header("Voice A")?;
    let voice_b = header("Voice B")?;

    let mut script: Vec<Turn> = Vec::new();
    let mut has_translation = false;
    let mut expected = Role::A;

    for (n, line) in lines {
        let (label, value) = split_label(line).ok_or_else(|| {
            EngineError::ScenarioParse(format!("line {}: no label in '{}'", n + 1, line))
        })?;

        match label.as_str() {
            "A" | "B" => {
                let role = if label == "A" { Role::A } else { Role::B };
                if role != expected {
                    return Err(EngineError::ScenarioParse(format!(
                        "line {}: expected a line from {}, found {}",
                        n + 1,
                        expected,
                        role
                    )));
                }
                if value.is_empty() {
                    return Err(EngineError::ScenarioParse(format!(
                        "line {}: empty line for {}",
                        n + 1,
                        role
                    )));
                }
                script.push(Turn::new(role, value, String::new()));
                has_translation = false;
                expected = role.other();
            }
            TRANSLATION_LABEL => {
                let turn = match script.last_mut() {
                    Some(turn) if !has_translation => turn,
                    _ => {
                        return Err(EngineError::ScenarioParse(format!(
                            "line {}: translation without a preceding line",
                            n + 1
                        )))
                    }
                };
                turn.translation = value;
                has_translation = true;
            }
            other => {
                return Err(EngineError::ScenarioParse(format!(
                    "line {}: unexpected label '{}'",
                    n + 1,
                    other
                )))
            }
        }
    }

    if script.is_empty() {
        return Err(EngineError::ScenarioParse(
            "script has no dialogue lines".to_string(),
        ));
    }

    Ok(Scenario {
        scene,
        roles: PerRole::new(role_a, role_b),
        voices: PerRole::new(
            resolve_voice(&voice_a, default_voice),
            resolve_voice(&voice_b, default_voice),
        ),
        script,
    })
}

/// Split `Label: value`, collapsing whitespace inside the label and cleaning the value
fn split_label(line: &str) -> Option<(String, String)> {
    let (label, value) = line.split_once(':')?;
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        return None;
    }
    Some((label, clean_text(value)))
}

/// Trim whitespace and surrounding quotes the model likes to add
pub fn clean_text(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '"' || c == '“' || c == '”')
        .trim()
        .to_string()
}

fn resolve_voice(voice: &str, default_voice: &str) -> String {
    let voice = voice.to_lowercase();
    if KNOWN_VOICES.contains(&voice.as_str()) {
        voice
    } else {
        tracing::warn!(
            "Unknown voice '{}', falling back to '{}'",
            voice,
            default_voice
        );
        default_voice.to_string()
    }
}
