use std::sync::Arc;
use strudel_ai_adapters::{Config, LlmBackend};

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn LlmBackend>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }
}
