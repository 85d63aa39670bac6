//! Request handlers for the `/api/*` endpoints.

use crate::error::ApiError;
use crate::payload::{
    parse_payload, resolve_provider, ComposePayload, EditPayload, SuggestionsPayload,
};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use strudel_ai_adapters::config::api_key_var;
use strudel_ai_adapters::{ChatRequest, Task};
use strudel_ai_core::prompts::{
    build_compose_prompt, build_edit_prompt, build_inline_suggestions_prompt,
    COMPOSE_SYSTEM_PROMPT, EDIT_SYSTEM_PROMPT, SUGGESTIONS_SYSTEM_PROMPT,
};
use strudel_ai_core::{extract_text_for, strip_code_fences, suggestions_from_reply, Provider, Suggestion};

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Run one upstream call and return the extracted reply text (possibly empty).
async fn complete_text(
    state: &AppState,
    task: Task,
    provider: Provider,
    system: &str,
    user: String,
) -> Result<String, ApiError> {
    let api_key = state
        .config
        .api_key(provider)
        .ok_or(ApiError::MissingApiKey {
            var: api_key_var(provider),
        })?;
    let settings = state.config.model_settings(task, provider);

    tracing::info!(
        task = task.label(),
        %provider,
        model = %settings.model,
        max_tokens = settings.max_tokens,
        "calling upstream"
    );

    let request = ChatRequest {
        provider,
        api_key: api_key.to_string(),
        model: settings.model,
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        system: system.to_string(),
        user,
    };
    let body = state.backend.complete(&request).await?;
    Ok(extract_text_for(provider, &body))
}

/// Strip fences from generated code; an empty result is an error.
fn code_from_reply(provider: Provider, text: &str) -> Result<Json<CodeResponse>, ApiError> {
    let code = strip_code_fences(text);
    if code.trim().is_empty() {
        return Err(ApiError::EmptyContent {
            label: provider.label(),
        });
    }
    Ok(Json(CodeResponse { code }))
}

/// `POST /api/compose`: generate a full composition.
pub async fn compose(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CodeResponse>, ApiError> {
    let payload: ComposePayload = parse_payload(&body)?;
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::MissingPrompt);
    }
    let provider = resolve_provider(payload.provider.as_deref())?;

    let user = build_compose_prompt(
        prompt,
        &payload.context_files,
        payload.sound_context.as_ref(),
        payload.tempo_cps,
        payload.options(),
    );
    let text = complete_text(&state, Task::Compose, provider, COMPOSE_SYSTEM_PROMPT, user).await?;
    code_from_reply(provider, &text)
}

/// `POST /api/claude-api`: apply an edit instruction to the current code.
pub async fn edit(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CodeResponse>, ApiError> {
    let payload: EditPayload = parse_payload(&body)?;
    let prompt = payload.prompt.trim();
    if payload.code.is_empty() || prompt.is_empty() {
        return Err(ApiError::MissingCodeOrPrompt);
    }
    let provider = resolve_provider(payload.provider.as_deref())?;

    let user = build_edit_prompt(
        &payload.code,
        prompt,
        Some(payload.selection.as_str()),
        payload.sound_context.as_ref(),
    );
    let text = complete_text(&state, Task::Edit, provider, EDIT_SYSTEM_PROMPT, user).await?;
    code_from_reply(provider, &text)
}

async fn suggestions_for(
    state: &AppState,
    provider: Provider,
    body: &[u8],
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let payload: SuggestionsPayload = parse_payload(body)?;
    if payload.code.trim().is_empty() {
        return Err(ApiError::MissingCode);
    }

    let user = build_inline_suggestions_prompt(
        &payload.code,
        Some(payload.selection.as_str()),
        payload.sound_context.as_ref(),
    );
    let text =
        complete_text(state, Task::Suggestions, provider, SUGGESTIONS_SYSTEM_PROMPT, user).await?;

    let suggestions = suggestions_from_reply(&text);
    if suggestions.is_empty() {
        tracing::debug!(%provider, reply_len = text.len(), "no suggestions in reply");
        return Ok(Json(SuggestionsResponse {
            suggestions,
            warning: Some(format!("{} API returned no suggestions.", provider.label())),
        }));
    }
    Ok(Json(SuggestionsResponse {
        suggestions,
        warning: None,
    }))
}

/// `POST /api/claude-suggestions`
pub async fn claude_suggestions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    suggestions_for(&state, Provider::Claude, &body).await
}

/// `POST /api/openai-suggestions`
pub async fn openai_suggestions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    suggestions_for(&state, Provider::OpenAi, &body).await
}

/// `GET /api/health`: liveness plus which providers have keys configured.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "providers": {
            "claude": state.config.has_api_key(Provider::Claude),
            "openai": state.config.has_api_key(Provider::OpenAi),
        },
    }))
}
