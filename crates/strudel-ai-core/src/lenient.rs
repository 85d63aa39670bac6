//! Forgiving `deserialize_with` helpers for browser-sent payloads.
//!
//! The editor sends loosely typed JSON. A field of the wrong type is treated as
//! absent rather than failing the whole request.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A string field, or `""` for any other JSON type.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// `Some` only when the field holds a string.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// A finite number, accepting numeric strings like `"1.5"`.
pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// Only the string elements of an array; anything else yields an empty list.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Elements of an array that decode as `T`; undecodable elements are skipped.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// `Some` when the field is an object that decodes as `T`.
pub fn opt_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Probe {
        #[serde(deserialize_with = "string")]
        text: String,
        #[serde(deserialize_with = "opt_number")]
        tempo: Option<f64>,
        #[serde(deserialize_with = "string_list")]
        names: Vec<String>,
        #[serde(deserialize_with = "flag")]
        enabled: bool,
    }

    #[test]
    fn test_wrong_types_become_defaults() {
        let probe: Probe =
            serde_json::from_str(r#"{"text": 4, "tempo": null, "names": "x", "enabled": "yes"}"#)
                .unwrap();
        assert_eq!(probe.text, "");
        assert_eq!(probe.tempo, None);
        assert!(probe.names.is_empty());
        assert!(!probe.enabled);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let probe: Probe = serde_json::from_str(r#"{"tempo": " 1.25 "}"#).unwrap();
        assert_eq!(probe.tempo, Some(1.25));
    }

    #[test]
    fn test_string_list_drops_non_strings() {
        let probe: Probe = serde_json::from_str(r#"{"names": ["a", 1, null, "b"]}"#).unwrap();
        assert_eq!(probe.names, vec!["a", "b"]);
    }
}
