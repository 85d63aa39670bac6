//! Request parameter rules for OpenAI model families.
//!
//! Reasoning models (`gpt-5*`, `o1*`, `o3*`, `o4*`) reject `max_tokens` and any
//! non-default `temperature`.

use serde_json::{Map, Value};

const REASONING_PREFIXES: [&str; 4] = ["gpt-5", "o1", "o3", "o4"];

fn is_reasoning_model(model: &str) -> bool {
    let normalized = model.to_lowercase();
    REASONING_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

/// Body key carrying the token limit for `model`.
pub fn completion_token_param(model: &str) -> &'static str {
    if is_reasoning_model(model) {
        "max_completion_tokens"
    } else {
        "max_tokens"
    }
}

pub fn supports_custom_temperature(model: &str) -> bool {
    !is_reasoning_model(model)
}

pub fn with_openai_max_tokens(body: &mut Map<String, Value>, model: &str, max_tokens: u32) {
    body.insert(completion_token_param(model).to_string(), Value::from(max_tokens));
}

/// Set `temperature` only when the model accepts it.
pub fn with_openai_temperature(body: &mut Map<String, Value>, model: &str, temperature: f64) {
    if supports_custom_temperature(model) {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
}
