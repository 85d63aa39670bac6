//! Canonical edit suggestions from loosely structured model output.
//!
//! Prompt iterations and providers drift on field names (`prompt` vs `idea`
//! vs `tweak` ...), and sometimes skip JSON entirely. The normalizer accepts
//! every alias seen so far and falls back to bullet-line parsing.

use crate::parse::{strip_code_fences, try_parse_json};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Upper bound on suggestions returned to the editor.
pub const MAX_SUGGESTIONS: usize = 5;

const TITLE_KEYS: [&str; 3] = ["title", "label", "name"];
const PROMPT_KEYS: [&str; 8] = [
    "prompt",
    "text",
    "suggestion",
    "instruction",
    "edit",
    "change",
    "tweak",
    "idea",
];
const WHY_KEYS: [&str; 4] = ["why", "reason", "because", "explanation"];
const LIST_KEYS: [&str; 5] = ["suggestions", "items", "ideas", "tweaks", "recommendations"];
const TITLE_DIVIDER: &str = " - ";

/// An edit instruction the user can apply as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub prompt: String,
    pub why: String,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, prompt: impl Into<String>, why: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            why: why.into(),
        }
    }
}

/// A trimmed string, or the trimmed string inside a `{text|content|value}` wrapper.
fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(wrapper @ Value::Object(_)) => ["text", "content", "value"]
            .iter()
            .find_map(|key| wrapper.get(*key).filter(|v| !v.is_null()))
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn pick_first_text(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| coerce_text(item.get(*key)))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn normalize_item(item: &Value) -> Suggestion {
    if let Some(text) = item.as_str() {
        let text = text.trim();
        return Suggestion::new(text, text, "");
    }

    let title = pick_first_text(item, &TITLE_KEYS);
    let has_prompt_key = item
        .as_object()
        .is_some_and(|object| PROMPT_KEYS.iter().any(|key| object.contains_key(*key)));
    let prompt = pick_first_text(item, &PROMPT_KEYS);
    let why = pick_first_text(item, &WHY_KEYS);

    // A bare `{title}` is still a usable instruction; an explicit but empty
    // prompt field is not.
    let prompt = if prompt.is_empty() && !has_prompt_key {
        title.clone()
    } else {
        prompt
    };
    let title = if title.is_empty() {
        prompt.clone()
    } else {
        title
    };
    Suggestion { title, prompt, why }
}

/// Canonicalize a JSON list of strings or objects into at most
/// [`MAX_SUGGESTIONS`] suggestions with non-empty prompts.
pub fn normalize_suggestions(value: &Value) -> Vec<Suggestion> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(normalize_item)
        .filter(|suggestion| !suggestion.prompt.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect()
}

fn bullet_re() -> &'static Regex {
    static BULLET_RE: OnceLock<Regex> = OnceLock::new();
    BULLET_RE.get_or_init(|| {
        Regex::new(r"^[-*•\d]+[.)\]]?\s+").expect("bullet regex should compile")
    })
}

/// Split `"Title - prompt"` on the first divider; later dividers stay in the prompt.
fn split_title_prompt(line: &str) -> (String, String) {
    match line.split_once(TITLE_DIVIDER) {
        None => (line.to_string(), line.to_string()),
        Some((left, rest)) => {
            let prompt = rest.trim();
            let title = left.trim();
            let title = if title.is_empty() { prompt } else { title };
            (title.to_string(), prompt.to_string())
        }
    }
}

/// Heuristic suggestions from free text, one per bullet or numbered line.
pub fn derive_suggestions_from_text(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let mut seen = HashSet::new();

    let lines = text
        .lines()
        .map(|line| bullet_re().replace(line.trim(), "").into_owned())
        .filter(|line| !line.is_empty());

    for line in lines {
        let (title, prompt) = split_title_prompt(&line);
        if prompt.is_empty() || seen.contains(&prompt) {
            continue;
        }
        seen.insert(prompt.clone());
        suggestions.push(Suggestion::new(title, prompt, ""));
        if suggestions.len() >= MAX_SUGGESTIONS {
            break;
        }
    }
    suggestions
}

/// Suggestions from a parsed reply, falling back to line heuristics over `text`.
///
/// The list is read from the first present of `suggestions`, `items`, `ideas`,
/// `tweaks`, `recommendations`, or the parsed value itself.
pub fn build_suggestions_from_text(text: &str, parsed: Option<&Value>) -> Vec<Suggestion> {
    let source = parsed.map(|value| {
        LIST_KEYS
            .iter()
            .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
            .unwrap_or(value)
    });
    let suggestions = source.map(normalize_suggestions).unwrap_or_default();
    if suggestions.is_empty() {
        derive_suggestions_from_text(text)
    } else {
        suggestions
    }
}

/// Full pipeline over extracted reply text: strip fences, recover JSON, build.
pub fn suggestions_from_reply(text: &str) -> Vec<Suggestion> {
    let cleaned = strip_code_fences(text);
    let parsed = try_parse_json(&cleaned);
    build_suggestions_from_text(&cleaned, parsed.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::extract_provider_text;
    use serde_json::json;

    #[test]
    fn test_normalize_drops_empty_prompts() {
        let input = json!([
            {"title": "T", "prompt": "P", "why": "W"},
            {"prompt": "  "}
        ]);
        assert_eq!(
            normalize_suggestions(&input),
            vec![Suggestion::new("T", "P", "W")]
        );
    }

    #[test]
    fn test_normalize_trims_fields() {
        let input = json!([
            {"title": "  Layer drums  ", "prompt": "  Add hats  ", "why": "  tighten the groove  "},
            {"title": "No prompt", "prompt": "   "}
        ]);
        assert_eq!(
            normalize_suggestions(&input),
            vec![Suggestion::new("Layer drums", "Add hats", "tighten the groove")]
        );
    }

    #[test]
    fn test_normalize_string_items() {
        assert_eq!(
            normalize_suggestions(&json!(["Add swing"])),
            vec![Suggestion::new("Add swing", "Add swing", "")]
        );
    }

    #[test]
    fn test_normalize_non_array_is_empty() {
        assert!(normalize_suggestions(&json!({"title": "T"})).is_empty());
        assert!(normalize_suggestions(&json!(null)).is_empty());
        assert!(normalize_suggestions(&json!("Add swing")).is_empty());
    }

    #[test]
    fn test_normalize_resolves_aliases() {
        let input = json!([
            {"label": "Swing", "idea": "Add swing to hats", "reason": "groove"},
            {"name": "Space", "instruction": {"text": " Add reverb "}, "explanation": "depth"},
            {"tweak": "Lower the bass"}
        ]);
        assert_eq!(
            normalize_suggestions(&input),
            vec![
                Suggestion::new("Swing", "Add swing to hats", "groove"),
                Suggestion::new("Space", "Add reverb", "depth"),
                Suggestion::new("Lower the bass", "Lower the bass", ""),
            ]
        );
    }

    #[test]
    fn test_title_only_item_becomes_prompt() {
        let input = json!([{"title": "Add a clap on 2 and 4"}]);
        assert_eq!(
            normalize_suggestions(&input),
            vec![Suggestion::new("Add a clap on 2 and 4", "Add a clap on 2 and 4", "")]
        );
    }

    #[test]
    fn test_explicit_empty_prompt_key_blocks_title_fallback() {
        let input = json!([{"title": "Half time", "prompt": ""}, {"title": "Ghost", "edit": null}]);
        assert!(normalize_suggestions(&input).is_empty());
    }

    #[test]
    fn test_non_object_items_are_dropped() {
        let input = json!([1, null, true, ["nested"], "Keep me"]);
        assert_eq!(
            normalize_suggestions(&input),
            vec![Suggestion::new("Keep me", "Keep me", "")]
        );
    }

    #[test]
    fn test_normalize_caps_at_five() {
        let input = Value::Array((0..12).map(|i| json!(format!("idea {i}"))).collect());
        let result = normalize_suggestions(&input);
        assert_eq!(result.len(), MAX_SUGGESTIONS);
        assert_eq!(result[4].prompt, "idea 4");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = json!([
            {"label": "Swing", "idea": " Add swing ", "because": "groove"},
            "  Detune the pad ",
            {"title": "Only title"},
            {"prompt": "Prompt only"}
        ]);
        let first = normalize_suggestions(&input);
        let second = normalize_suggestions(&serde_json::to_value(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_derive_splits_title_and_prompt() {
        let text = "- Layer drums - Add hats\n- Add texture - Add noise";
        assert_eq!(
            derive_suggestions_from_text(text),
            vec![
                Suggestion::new("Layer drums", "Add hats", ""),
                Suggestion::new("Add texture", "Add noise", ""),
            ]
        );
    }

    #[test]
    fn test_derive_splits_on_first_divider_only() {
        let text = "1. Build - drop the kick - then bring it back";
        assert_eq!(
            derive_suggestions_from_text(text),
            vec![Suggestion::new("Build", "drop the kick - then bring it back", "")]
        );
    }

    #[test]
    fn test_derive_strips_markers_and_dedupes() {
        let text = "Ideas:\r\n* Add swing\n\n2) Add swing\n• Open the filter\n3] Half-time feel";
        assert_eq!(
            derive_suggestions_from_text(text),
            vec![
                Suggestion::new("Ideas:", "Ideas:", ""),
                Suggestion::new("Add swing", "Add swing", ""),
                Suggestion::new("Open the filter", "Open the filter", ""),
                Suggestion::new("Half-time feel", "Half-time feel", ""),
            ]
        );
    }

    #[test]
    fn test_derive_blank_title_uses_prompt() {
        assert_eq!(
            derive_suggestions_from_text(" - Add hats"),
            vec![Suggestion::new("Add hats", "Add hats", "")]
        );
    }

    #[test]
    fn test_derive_caps_at_five() {
        let text = (1..=9)
            .map(|i| format!("- idea {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(derive_suggestions_from_text(&text).len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_build_reads_alias_list_keys() {
        let parsed = json!({"ideas": ["Add rim accents"]});
        assert_eq!(
            build_suggestions_from_text("ignored", Some(&parsed)),
            vec![Suggestion::new("Add rim accents", "Add rim accents", "")]
        );
    }

    #[test]
    fn test_build_accepts_bare_array() {
        let parsed = json!([{"title": "Hats", "prompt": "Add hats"}]);
        assert_eq!(
            build_suggestions_from_text("", Some(&parsed)),
            vec![Suggestion::new("Hats", "Add hats", "")]
        );
    }

    #[test]
    fn test_build_falls_back_to_text() {
        let parsed = json!({"note": "no suggestions here"});
        assert_eq!(
            build_suggestions_from_text("Add swing to the hats", Some(&parsed)),
            vec![Suggestion::new("Add swing to the hats", "Add swing to the hats", "")]
        );
    }

    #[test]
    fn test_build_returns_empty_when_nothing_derivable() {
        assert!(build_suggestions_from_text("   ", None).is_empty());
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let body = json!({"choices": [{"message": {"content":
            "```json\n{\"suggestions\":[{\"title\":\"Add hats\",\"prompt\":\"Add syncopated hats\"}]}\n```"
        }}]});
        let text = extract_provider_text(&body);
        assert_eq!(
            suggestions_from_reply(&text),
            vec![Suggestion::new("Add hats", "Add syncopated hats", "")]
        );
    }

    #[test]
    fn test_pipeline_recovers_json_wrapped_in_prose() {
        let text = "Sure! Here you go:\n{\"tweaks\": [{\"name\": \"Echo\", \"change\": \"Add delay\"}]}\nEnjoy.";
        assert_eq!(
            suggestions_from_reply(text),
            vec![Suggestion::new("Echo", "Add delay", "")]
        );
    }
}
