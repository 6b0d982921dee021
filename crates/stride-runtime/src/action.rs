//! Action verb grammar.
//!
//! Model replies carry exactly one action in a small uppercase verb
//! grammar. The parser scans the whole reply, so prose around the verb
//! is tolerated; when several verbs appear, the earliest match wins.
//!
//! Grammar:
//! - `CLICK(<element id>)`
//! - `CLICK_XY(<x>, <y>)` (vision replies, viewport coordinates)
//! - `TYPE("<text>")` (quotes optional)
//! - `PRESS(<key>)`
//! - `FINISH` / `DONE`

use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::errors::ActionParseError;

static CLICK_XY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CLICK_XY\(\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*\)")
        .expect("click_xy regex")
});
static CLICK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CLICK\(\s*(\d+)\s*\)").expect("click regex"));
static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"TYPE\(\s*(?:"([^"]*)"|([^)"]*?))\s*\)"#).expect("type regex")
});
static PRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"PRESS\(\s*"?([A-Za-z0-9+_\-]+)"?\s*\)"#).expect("press regex")
});
static FINISH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:FINISH|DONE)\b").expect("finish regex"));

/// One primitive action against the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    ClickElement { id: u64 },
    ClickPoint { x: f64, y: f64 },
    TypeText { text: String },
    PressKey { key: String },
    Finish,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClickElement { id } => write!(f, "CLICK({id})"),
            Self::ClickPoint { x, y } => write!(f, "CLICK_XY({x}, {y})"),
            Self::TypeText { text } => write!(f, "TYPE({text:?})"),
            Self::PressKey { key } => write!(f, "PRESS({key})"),
            Self::Finish => write!(f, "FINISH"),
        }
    }
}

/// Parse the earliest action verb out of a model reply.
pub fn parse_action(content: &str) -> Result<StepAction, ActionParseError> {
    let mut candidates: Vec<(usize, StepAction)> = Vec::new();

    if let Some(caps) = CLICK_XY_RE.captures(content) {
        let x = capture_f64(&caps, 1, "CLICK_XY")?;
        let y = capture_f64(&caps, 2, "CLICK_XY")?;
        candidates.push((match_start(&caps), StepAction::ClickPoint { x, y }));
    }
    if let Some(caps) = CLICK_RE.captures(content) {
        let id = capture_u64(&caps, 1, "CLICK")?;
        candidates.push((match_start(&caps), StepAction::ClickElement { id }));
    }
    if let Some(caps) = TYPE_RE.captures(content) {
        let text = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        candidates.push((match_start(&caps), StepAction::TypeText { text }));
    }
    if let Some(caps) = PRESS_RE.captures(content) {
        let key = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        candidates.push((match_start(&caps), StepAction::PressKey { key }));
    }
    if let Some(found) = FINISH_RE.find(content) {
        candidates.push((found.start(), StepAction::Finish));
    }

    candidates
        .into_iter()
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, action)| action)
        .ok_or_else(|| ActionParseError::Unrecognized(truncated(content, 120)))
}

fn match_start(caps: &Captures<'_>) -> usize {
    caps.get(0).map(|m| m.start()).unwrap_or(0)
}

fn capture_u64(caps: &Captures<'_>, index: usize, verb: &'static str) -> Result<u64, ActionParseError> {
    let raw = caps.get(index).map(|m| m.as_str()).unwrap_or_default();
    raw.parse::<u64>().map_err(|_| ActionParseError::Malformed {
        verb,
        detail: format!("bad element id {raw:?}"),
    })
}

fn capture_f64(caps: &Captures<'_>, index: usize, verb: &'static str) -> Result<f64, ActionParseError> {
    let raw = caps.get(index).map(|m| m.as_str()).unwrap_or_default();
    raw.parse::<f64>().map_err(|_| ActionParseError::Malformed {
        verb,
        detail: format!("bad coordinate {raw:?}"),
    })
}

fn truncated(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let head: String = content.chars().take(max_chars).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_click_on_element() {
        assert_eq!(
            parse_action("CLICK(42)").unwrap(),
            StepAction::ClickElement { id: 42 }
        );
    }

    #[test]
    fn parses_click_at_coordinates() {
        assert_eq!(
            parse_action("CLICK_XY(200, 150)").unwrap(),
            StepAction::ClickPoint { x: 200.0, y: 150.0 }
        );
        assert_eq!(
            parse_action("CLICK_XY(12.5, -3.25)").unwrap(),
            StepAction::ClickPoint { x: 12.5, y: -3.25 }
        );
    }

    #[test]
    fn click_xy_is_not_mistaken_for_element_click() {
        let action = parse_action("I will CLICK_XY(10, 20) now").unwrap();
        assert_eq!(action, StepAction::ClickPoint { x: 10.0, y: 20.0 });
    }

    #[test]
    fn parses_type_with_and_without_quotes() {
        assert_eq!(
            parse_action(r#"TYPE("hello world")"#).unwrap(),
            StepAction::TypeText {
                text: "hello world".into()
            }
        );
        assert_eq!(
            parse_action("TYPE(plain)").unwrap(),
            StepAction::TypeText {
                text: "plain".into()
            }
        );
    }

    #[test]
    fn parses_press_key_and_chords() {
        assert_eq!(
            parse_action("PRESS(Enter)").unwrap(),
            StepAction::PressKey { key: "Enter".into() }
        );
        assert_eq!(
            parse_action(r#"PRESS("Control+a")"#).unwrap(),
            StepAction::PressKey {
                key: "Control+a".into()
            }
        );
    }

    #[test]
    fn parses_finish_and_done() {
        assert_eq!(parse_action("FINISH").unwrap(), StepAction::Finish);
        assert_eq!(parse_action("We are DONE here.").unwrap(), StepAction::Finish);
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let reply = "The submit button looks right.\nCLICK(3)\nThat should do it.";
        assert_eq!(
            parse_action(reply).unwrap(),
            StepAction::ClickElement { id: 3 }
        );
    }

    #[test]
    fn earliest_verb_wins_when_several_appear() {
        let reply = r#"First TYPE("query"), then CLICK(7)."#;
        assert_eq!(
            parse_action(reply).unwrap(),
            StepAction::TypeText {
                text: "query".into()
            }
        );
    }

    #[test]
    fn rejects_replies_without_a_verb() {
        let err = parse_action("I am not sure what to do.").unwrap_err();
        assert!(matches!(err, ActionParseError::Unrecognized(_)));
    }

    #[test]
    fn rejects_out_of_range_element_ids() {
        let err = parse_action("CLICK(99999999999999999999999)").unwrap_err();
        assert!(matches!(err, ActionParseError::Malformed { verb: "CLICK", .. }));
    }

    #[test]
    fn underscore_keeps_done_out_of_identifiers() {
        let err = parse_action("status=URL_DONE").unwrap_err();
        assert!(matches!(err, ActionParseError::Unrecognized(_)));
    }

    #[test]
    fn display_round_trips_through_the_grammar() {
        let action = StepAction::ClickElement { id: 9 };
        assert_eq!(parse_action(&action.to_string()).unwrap(), action);
    }
}
