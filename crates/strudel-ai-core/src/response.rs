//! Text extraction from provider reply bodies.
//!
//! Chat completions, the responses API, legacy completions and Anthropic
//! messages all put the assistant text at different JSON paths, sometimes
//! wrapped as `{type, text}` or `{type, text: {value}}`. Each known location is
//! a [`ReplyShape`]; extraction tries them in priority order.

use crate::provider::Provider;
use serde_json::Value;

const TEXT_VALUE_KEYS: [&str; 3] = ["text", "content", "value"];
const PART_TEXT_KEYS: [&str; 3] = ["text", "content", "output_text"];

/// One place a reply body may carry assistant text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyShape<'a> {
    /// Responses API convenience field `output_text`.
    OutputText(&'a str),
    /// Responses API `output[]` items.
    ResponsesOutput(&'a [Value]),
    /// `choices[0].message.content`, which may be a string, block list or object.
    ChatContent(&'a Value),
    /// Legacy completions `choices[0].text`.
    LegacyCompletion(&'a str),
    /// Anthropic messages `content[]` blocks.
    MessageBlocks(&'a [Value]),
    /// Nothing recognizable.
    Unknown,
}

impl<'a> ReplyShape<'a> {
    /// Every generic (OpenAI-family) shape present on `body`, highest priority first.
    pub fn detect(body: &'a Value) -> Vec<ReplyShape<'a>> {
        let mut shapes = Vec::new();

        if let Some(text) = body.get("output_text").and_then(Value::as_str) {
            shapes.push(ReplyShape::OutputText(text));
        }
        if let Some(items) = body
            .get("output")
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
        {
            shapes.push(ReplyShape::ResponsesOutput(items));
        }

        let first_choice = body.get("choices").and_then(|choices| choices.get(0));
        if let Some(content) = first_choice
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
        {
            shapes.push(ReplyShape::ChatContent(content));
        }
        if let Some(text) = first_choice
            .and_then(|choice| choice.get("text"))
            .and_then(Value::as_str)
        {
            shapes.push(ReplyShape::LegacyCompletion(text));
        }

        if shapes.is_empty() {
            shapes.push(ReplyShape::Unknown);
        }
        shapes
    }

    /// The Anthropic messages shape, when `body.content` is a block list.
    pub fn anthropic(body: &'a Value) -> Option<ReplyShape<'a>> {
        body.get("content")
            .and_then(Value::as_array)
            .map(|blocks| ReplyShape::MessageBlocks(blocks))
    }

    /// Trimmed text for this shape, `None` when it carries nothing usable.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            ReplyShape::OutputText(text) | ReplyShape::LegacyCompletion(text) => {
                text.trim().to_string()
            }
            ReplyShape::ResponsesOutput(items) => items
                .iter()
                .map(|item| match item.get("content") {
                    Some(Value::Array(parts)) => text_from_parts(parts),
                    other => text_value(other),
                })
                .collect::<String>()
                .trim()
                .to_string(),
            ReplyShape::ChatContent(content) => match content {
                Value::String(text) => text.trim().to_string(),
                Value::Array(parts) => text_from_parts(parts),
                Value::Object(_) => text_value(Some(*content)).trim().to_string(),
                _ => String::new(),
            },
            ReplyShape::MessageBlocks(blocks) => blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<String>()
                .trim()
                .to_string(),
            ReplyShape::Unknown => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// First key among `keys` that is present and not `null`.
fn first_present<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| value.get(*key).filter(|candidate| !candidate.is_null()))
}

/// Unwrap a string, or a `{text|content|value}` wrapper up to two levels deep.
fn text_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(wrapper @ Value::Object(_)) => match first_present(wrapper, &TEXT_VALUE_KEYS) {
            Some(Value::String(text)) => text.clone(),
            Some(nested @ Value::Object(_)) => match first_present(nested, &TEXT_VALUE_KEYS) {
                Some(Value::String(text)) => text.clone(),
                _ => String::new(),
            },
            _ => String::new(),
        },
        _ => String::new(),
    }
}

fn text_from_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .map(|part| {
            PART_TEXT_KEYS
                .iter()
                .map(|key| text_value(part.get(*key)))
                .find(|text| !text.is_empty())
                .unwrap_or_default()
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Best-effort assistant text from an OpenAI-family reply, `""` when none.
pub fn extract_provider_text(body: &Value) -> String {
    ReplyShape::detect(body)
        .iter()
        .find_map(ReplyShape::text)
        .unwrap_or_default()
}

/// Concatenated `content[].text` of an Anthropic messages reply.
pub fn extract_claude_text(body: &Value) -> String {
    ReplyShape::anthropic(body)
        .and_then(|shape| shape.text())
        .unwrap_or_default()
}

/// Provider-aware extraction. Claude replies fall back to the generic shapes
/// so proxies that translate to OpenAI format still work.
pub fn extract_text_for(provider: Provider, body: &Value) -> String {
    match provider {
        Provider::Claude => {
            let text = extract_claude_text(body);
            if text.is_empty() {
                extract_provider_text(body)
            } else {
                text
            }
        }
        Provider::OpenAi => extract_provider_text(body),
    }
}
