//! Shared fixtures for gateway tests.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;

use gryag_agent::media::MediaCache;
use gryag_agent::provider::{FunctionDecl, LlmProvider, ModelReply, ProviderError, ReplyPart};
use gryag_agent::tools::ToolRegistry;
use gryag_agent::{Orchestrator, Persona};
use gryag_cache::Cache;
use gryag_core::config::Config;
use gryag_core::i18n::Localizer;
use gryag_store::Store;

use crate::app::AppState;

/// Provider that always answers with a fixed text.
struct FixedProvider;

#[async_trait]
impl LlmProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }
    async fn generate(
        &self,
        _system: &str,
        _contents: &[serde_json::Value],
        _tools: &[FunctionDecl],
    ) -> Result<ModelReply, ProviderError> {
        Ok(ModelReply {
            parts: vec![ReplyPart::Text("ok".into())],
            finish_reason: "STOP".into(),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        gemini_api_key: "test-key".into(),
        gemini_model: "gemini-2.5-flash".into(),
        gemini_image_model: "gemini-2.5-flash-image".into(),
        bind_host: "127.0.0.1".into(),
        bind_port: 0,
        db_path: ":memory:".into(),
        admin_ids: vec![900],
        allowed_chat_ids: None,
        rate_limit_global_per_minute: 10,
        rate_limit_user_per_minute: 3,
        enable_proactive_messaging: true,
        enable_summarization: false,
        enable_sandbox: false,
        enable_image_generation: false,
        enable_web_search: false,
        enable_voice_stt: false,
        immediate_context_size: 50,
        message_retention_days: 90,
        media_cache_dir: std::env::temp_dir(),
        media_cache_ttl_hours: 48,
        persona_file: String::new(),
        locale_dir: String::new(),
        default_lang: "uk".into(),
        proactive_active_hours: (9, 22),
        proactive_interval_minutes: 60,
        summary_run_hour: 4,
        summary_7day_interval_days: 3,
        summary_30day_interval_days: 12,
        sandbox_url: None,
    }
}

/// Build an `AppState` over an in-memory store, a fixed provider, and a
/// throwaway persona, with `mutate` applied to the config first.
pub fn test_state(mutate: impl FnOnce(&mut Config)) -> AppState {
    let mut config = test_config();
    mutate(&mut config);

    let store = Arc::new(Store::open_in_memory().unwrap());
    let cache = Arc::new(Cache::new());

    let media_dir = tempfile::tempdir().unwrap();
    let media = MediaCache::new(media_dir.keep(), config.media_cache_ttl_hours);

    let mut persona_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(persona_file, "You are gryag.").unwrap();
    let persona = Arc::new(Persona::load(persona_file.path().to_str().unwrap()).unwrap());
    let _ = persona_file.keep();

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(FixedProvider),
        Arc::new(ToolRegistry::new()),
        persona.clone(),
        Arc::new(Localizer::fallback()),
        media,
        config.immediate_context_size,
        config.enable_voice_stt,
    ));

    AppState::new(config, store, cache, orchestrator, persona)
}
