use std::collections::HashSet;
use std::path::PathBuf;

use figment::{providers::Env, Figment};
use serde::Deserialize;

use crate::error::{GryagError, Result};

/// Fully parsed runtime configuration.
///
/// Built by [`Config::load`] from plain environment variables — there is no
/// config file. List- and range-shaped values (`ADMIN_IDS`,
/// `ALLOWED_CHAT_IDS`, `PROACTIVE_ACTIVE_HOURS`) are parsed eagerly so a
/// typo fails startup instead of surfacing mid-request.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_image_model: String,
    pub bind_host: String,
    pub bind_port: u16,
    pub db_path: String,
    pub admin_ids: Vec<i64>,
    /// `None` means no whitelist — all chats admitted.
    pub allowed_chat_ids: Option<HashSet<i64>>,
    pub rate_limit_global_per_minute: u32,
    pub rate_limit_user_per_minute: u32,
    pub enable_proactive_messaging: bool,
    pub enable_summarization: bool,
    pub enable_sandbox: bool,
    pub enable_image_generation: bool,
    pub enable_web_search: bool,
    pub enable_voice_stt: bool,
    pub immediate_context_size: usize,
    pub message_retention_days: i64,
    pub media_cache_dir: PathBuf,
    pub media_cache_ttl_hours: i64,
    pub persona_file: String,
    pub locale_dir: String,
    pub default_lang: String,
    /// Kyiv wall-clock window, `[start, end)`, wrap past midnight allowed.
    pub proactive_active_hours: (u8, u8),
    pub proactive_interval_minutes: u64,
    pub summary_run_hour: u8,
    pub summary_7day_interval_days: i64,
    pub summary_30day_interval_days: i64,
    pub sandbox_url: Option<String>,
}

/// Raw environment shape — strings where post-parsing is needed.
#[derive(Debug, Deserialize)]
struct RawConfig {
    gemini_api_key: Option<String>,
    #[serde(default = "default_model")]
    gemini_model: String,
    #[serde(default = "default_image_model")]
    gemini_image_model: String,
    #[serde(default = "default_bind_host")]
    bind_host: String,
    #[serde(default = "default_bind_port")]
    bind_port: u16,
    #[serde(default = "default_db_path")]
    db_path: String,
    #[serde(default)]
    admin_ids: String,
    #[serde(default)]
    allowed_chat_ids: String,
    #[serde(default = "default_global_rate")]
    rate_limit_global_per_minute: u32,
    #[serde(default = "default_user_rate")]
    rate_limit_user_per_minute: u32,
    #[serde(default)]
    enable_proactive_messaging: bool,
    #[serde(default)]
    enable_summarization: bool,
    #[serde(default)]
    enable_sandbox: bool,
    #[serde(default)]
    enable_image_generation: bool,
    #[serde(default)]
    enable_web_search: bool,
    #[serde(default)]
    enable_voice_stt: bool,
    #[serde(default = "default_context_size")]
    immediate_context_size: usize,
    #[serde(default = "default_retention_days")]
    message_retention_days: i64,
    #[serde(default = "default_media_cache_dir")]
    media_cache_dir: String,
    #[serde(default = "default_media_cache_ttl")]
    media_cache_ttl_hours: i64,
    #[serde(default = "default_persona_file")]
    persona_file: String,
    #[serde(default = "default_locale_dir")]
    locale_dir: String,
    #[serde(default = "default_lang")]
    default_lang: String,
    #[serde(default = "default_active_hours")]
    proactive_active_hours: String,
    #[serde(default = "default_proactive_interval")]
    proactive_interval_minutes: u64,
    #[serde(default = "default_summary_run_hour")]
    summary_run_hour: u8,
    #[serde(default = "default_summary_7day_interval")]
    summary_7day_interval_days: i64,
    #[serde(default = "default_summary_30day_interval")]
    summary_30day_interval_days: i64,
    sandbox_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        let raw: RawConfig = Figment::new()
            .merge(Env::raw())
            .extract()
            .map_err(|e| GryagError::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let gemini_api_key = raw
            .gemini_api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GryagError::Config("GEMINI_API_KEY is required".into()))?;

        let admin_ids = parse_id_list(&raw.admin_ids)
            .map_err(|e| GryagError::Config(format!("ADMIN_IDS: {e}")))?;
        let allowed = parse_id_list(&raw.allowed_chat_ids)
            .map_err(|e| GryagError::Config(format!("ALLOWED_CHAT_IDS: {e}")))?;
        let allowed_chat_ids = if allowed.is_empty() {
            None
        } else {
            Some(allowed.into_iter().collect())
        };

        let proactive_active_hours = parse_hour_range(&raw.proactive_active_hours)
            .map_err(|e| GryagError::Config(format!("PROACTIVE_ACTIVE_HOURS: {e}")))?;

        if raw.summary_run_hour > 23 {
            return Err(GryagError::Config(format!(
                "SUMMARY_RUN_HOUR: hour {} out of range",
                raw.summary_run_hour
            )));
        }

        Ok(Self {
            gemini_api_key,
            gemini_model: raw.gemini_model,
            gemini_image_model: raw.gemini_image_model,
            bind_host: raw.bind_host,
            bind_port: raw.bind_port,
            db_path: raw.db_path,
            admin_ids,
            allowed_chat_ids,
            rate_limit_global_per_minute: raw.rate_limit_global_per_minute,
            rate_limit_user_per_minute: raw.rate_limit_user_per_minute,
            enable_proactive_messaging: raw.enable_proactive_messaging,
            enable_summarization: raw.enable_summarization,
            enable_sandbox: raw.enable_sandbox,
            enable_image_generation: raw.enable_image_generation,
            enable_web_search: raw.enable_web_search,
            enable_voice_stt: raw.enable_voice_stt,
            immediate_context_size: raw.immediate_context_size,
            message_retention_days: raw.message_retention_days,
            media_cache_dir: PathBuf::from(raw.media_cache_dir),
            media_cache_ttl_hours: raw.media_cache_ttl_hours,
            persona_file: raw.persona_file,
            locale_dir: raw.locale_dir,
            default_lang: raw.default_lang,
            proactive_active_hours,
            proactive_interval_minutes: raw.proactive_interval_minutes,
            summary_run_hour: raw.summary_run_hour,
            summary_7day_interval_days: raw.summary_7day_interval_days,
            summary_30day_interval_days: raw.summary_30day_interval_days,
            sandbox_url: raw.sandbox_url,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Parse a comma-separated list of i64 ids. Empty input → empty list.
fn parse_id_list(s: &str) -> std::result::Result<Vec<i64>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<i64>().map_err(|_| format!("invalid id '{p}'")))
        .collect()
}

/// Parse an `H1-H2` hour range, both ends in 0..=23.
fn parse_hour_range(s: &str) -> std::result::Result<(u8, u8), String> {
    let (a, b) = s
        .split_once('-')
        .ok_or_else(|| format!("expected 'H1-H2', got '{s}'"))?;
    let start: u8 = a.trim().parse().map_err(|_| format!("invalid hour '{a}'"))?;
    let end: u8 = b.trim().parse().map_err(|_| format!("invalid hour '{b}'"))?;
    if start > 23 || end > 23 {
        return Err(format!("hours must be 0..=23, got '{s}'"));
    }
    Ok((start, end))
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}
fn default_bind_port() -> u16 {
    27710
}
fn default_db_path() -> String {
    "gryag.db".to_string()
}
fn default_global_rate() -> u32 {
    10
}
fn default_user_rate() -> u32 {
    3
}
fn default_context_size() -> usize {
    50
}
fn default_retention_days() -> i64 {
    90
}
fn default_media_cache_dir() -> String {
    "/tmp/gryag_media_cache".to_string()
}
fn default_media_cache_ttl() -> i64 {
    48
}
fn default_persona_file() -> String {
    "config/persona.txt".to_string()
}
fn default_locale_dir() -> String {
    "config/locales".to_string()
}
fn default_lang() -> String {
    "uk".to_string()
}
fn default_active_hours() -> String {
    "9-22".to_string()
}
fn default_proactive_interval() -> u64 {
    60
}
fn default_summary_run_hour() -> u8 {
    4
}
fn default_summary_7day_interval() -> i64 {
    3
}
fn default_summary_30day_interval() -> i64 {
    12
}
