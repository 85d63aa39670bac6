//! Pure data transformations behind the editor's AI features.
//!
//! Everything here is synchronous and infallible: malformed provider replies
//! degrade to empty text or empty suggestion lists instead of erroring.

pub mod lenient;
pub mod parse;
pub mod prompts;
pub mod provider;
pub mod response;
pub mod sound;
pub mod suggestions;
pub mod tempo;
pub mod workspace;

pub use parse::{strip_code_fences, try_parse_json};
pub use prompts::{ComposeOptions, ContextFile};
pub use provider::Provider;
pub use response::{extract_claude_text, extract_provider_text, extract_text_for, ReplyShape};
pub use sound::{SoundContext, SoundRegistry};
pub use suggestions::{
    build_suggestions_from_text, derive_suggestions_from_text, normalize_suggestions,
    suggestions_from_reply, Suggestion, MAX_SUGGESTIONS,
};
