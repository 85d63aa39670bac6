//! Request bodies sent by the editor.
//!
//! Fields are decoded leniently: a field of the wrong type is treated as
//! absent, and only a body that is not JSON at all is rejected.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use strudel_ai_core::lenient;
use strudel_ai_core::{ComposeOptions, ContextFile, Provider, SoundContext};

/// Decode a request body. `null` and malformed JSON are rejected; other
/// non-object values decode as an empty payload.
pub fn parse_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidPayload)?;
    let object = match value {
        Value::Null => return Err(ApiError::InvalidPayload),
        Value::Object(object) => object,
        _ => Map::new(),
    };
    serde_json::from_value(Value::Object(object)).map_err(|_| ApiError::InvalidPayload)
}

/// Resolve the optional `provider` field. Absent means Claude.
pub fn resolve_provider(raw: Option<&str>) -> Result<Provider, ApiError> {
    match raw {
        None => Ok(Provider::Claude),
        Some(raw) => Provider::parse(raw).ok_or(ApiError::UnknownProvider),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComposePayload {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub provider: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub prompt: String,
    #[serde(deserialize_with = "lenient::list")]
    pub context_files: Vec<ContextFile>,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub sound_context: Option<SoundContext>,
    #[serde(deserialize_with = "lenient::opt_number")]
    pub tempo_cps: Option<f64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub start_gains_at_zero: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub use_gain_sliders: bool,
}

impl ComposePayload {
    pub fn options(&self) -> ComposeOptions {
        ComposeOptions {
            start_gains_at_zero: self.start_gains_at_zero,
            use_gain_sliders: self.use_gain_sliders,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditPayload {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub provider: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(deserialize_with = "lenient::string")]
    pub prompt: String,
    #[serde(deserialize_with = "lenient::string")]
    pub selection: String,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub sound_context: Option<SoundContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuggestionsPayload {
    #[serde(deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(deserialize_with = "lenient::string")]
    pub selection: String,
    #[serde(deserialize_with = "lenient::opt_object")]
    pub sound_context: Option<SoundContext>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_and_null_bodies_are_rejected() {
        assert!(matches!(
            parse_payload::<ComposePayload>(b"{oops"),
            Err(ApiError::InvalidPayload)
        ));
        assert!(matches!(
            parse_payload::<ComposePayload>(b"null"),
            Err(ApiError::InvalidPayload)
        ));
    }

    #[test]
    fn test_non_object_body_decodes_empty() {
        let payload: EditPayload = parse_payload(b"[1, 2]").unwrap();
        assert!(payload.code.is_empty());
        assert!(payload.prompt.is_empty());
    }

    #[test]
    fn test_compose_payload_is_lenient() {
        let payload: ComposePayload = parse_payload(
            br#"{
                "provider": "OpenAI",
                "prompt": "  ambient  ",
                "contextFiles": [{"name": "a.strudel", "content": "x"}, 7, null],
                "soundContext": {"synths": ["saw"]},
                "tempoCps": "0.75",
                "startGainsAtZero": true,
                "useGainSliders": "yes"
            }"#,
        )
        .unwrap();
        assert_eq!(payload.provider.as_deref(), Some("OpenAI"));
        assert_eq!(payload.context_files, vec![ContextFile::new("a.strudel", "x")]);
        assert_eq!(payload.sound_context.as_ref().unwrap().synths, vec!["saw"]);
        assert_eq!(payload.tempo_cps, Some(0.75));
        assert_eq!(
            payload.options(),
            ComposeOptions {
                start_gains_at_zero: true,
                use_gain_sliders: false,
            }
        );
    }

    #[test]
    fn test_null_tempo_is_absent() {
        let payload: ComposePayload = parse_payload(br#"{"tempoCps": null}"#).unwrap();
        assert_eq!(payload.tempo_cps, None);
    }

    #[test]
    fn test_resolve_provider() {
        assert_eq!(resolve_provider(None).unwrap(), Provider::Claude);
        assert_eq!(resolve_provider(Some("OPENAI")).unwrap(), Provider::OpenAi);
        assert!(matches!(
            resolve_provider(Some("gemini")),
            Err(ApiError::UnknownProvider)
        ));
    }
}
