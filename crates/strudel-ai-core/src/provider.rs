use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream LLM vendor a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Claude, Provider::OpenAi];

    /// Case-insensitive parse of the wire name (`"claude"` / `"openai"`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAi),
            _ => None,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::OpenAi => "openai",
        }
    }

    /// Human-facing name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Claude => "Claude",
            Provider::OpenAi => "OpenAI",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider `{}`", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::parse(s).ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Provider::parse("Claude"), Some(Provider::Claude));
        assert_eq!(Provider::parse(" OPENAI "), Some(Provider::OpenAi));
        assert_eq!(Provider::parse("gemini"), None);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&Provider::OpenAi).unwrap(),
            "\"openai\""
        );
        let parsed: Provider = serde_json::from_str("\"claude\"").unwrap();
        assert_eq!(parsed, Provider::Claude);
    }

    #[test]
    fn test_from_str_reports_unknown_name() {
        let err = "mistral".parse::<Provider>().unwrap_err();
        assert!(err.to_string().contains("mistral"));
    }
}
