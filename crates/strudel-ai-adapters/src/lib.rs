//! Runtime adapters for strudel-ai (config, provider HTTP clients, autosave persistence).

pub mod autosave;
pub mod config;
pub mod openai;
pub mod providers;

pub use config::{Config, FileConfig, ModelSettings, Task};
pub use providers::{ChatRequest, HttpBackend, LlmBackend, ProviderError};
