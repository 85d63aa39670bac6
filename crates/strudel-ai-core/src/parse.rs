use serde_json::Value;

/// Strip a markdown code fence wrapping a model reply.
///
/// Text that does not start with a fence (after trimming) is returned exactly
/// as given, so generated code keeps its formatting.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return text.to_string();
    };
    let after_tag = after_open.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let body = after_tag.strip_prefix('\n').unwrap_or(after_tag);
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

/// Parse JSON, retrying on the outermost `{...}` span when the model wrapped
/// the object in prose.
pub fn try_parse_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences_with_language_tag() {
        assert_eq!(strip_code_fences("```js\ncode\n```"), "code");
        assert_eq!(strip_code_fences("```js\ns(\"bd\")\n```"), "s(\"bd\")");
    }

    #[test]
    fn test_strip_code_fences_leaves_plain_text_untouched() {
        assert_eq!(strip_code_fences("code"), "code");
        assert_eq!(strip_code_fences("  code\n"), "  code\n");
    }

    #[test]
    fn test_strip_code_fences_without_tag_or_closing_fence() {
        assert_eq!(strip_code_fences("```\nnote(\"c e g\")\n```"), "note(\"c e g\")");
        assert_eq!(strip_code_fences("  ```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_try_parse_json_recovers_embedded_object() {
        assert_eq!(
            try_parse_json("prefix {\"a\":1} suffix"),
            Some(json!({"a": 1}))
        );
    }

    #[test]
    fn test_try_parse_json_rejects_garbage() {
        assert_eq!(try_parse_json("not json"), None);
        assert_eq!(try_parse_json("} backwards {"), None);
        assert_eq!(try_parse_json("{ broken"), None);
    }

    #[test]
    fn test_try_parse_json_accepts_non_object_values() {
        assert_eq!(try_parse_json("[1, 2]"), Some(json!([1, 2])));
        assert_eq!(try_parse_json(" \"x\" "), Some(json!("x")));
    }
}
