//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use quill_core::backend::gemini::{GeminiOptions, DEFAULT_BASE_URL, DEFAULT_MODEL};
use quill_core::persona::DEFAULT_SEPARATOR;
use quill_core::{ConfigError, PageText, Persona, PersonaConfig, PersonaMode, PersonaPreset};

/// Runtime configuration for quill-server.
///
/// Every field has a default so the server starts with nothing but an API
/// key in the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Gemini model identifier.
    pub model: String,

    /// `none`, `standing` or `inline` (parsed by [`Config::persona_config`]).
    pub persona_mode: String,

    /// Built-in persona name; empty or `"none"` disables the preset.
    pub persona_preset: String,

    /// Explicit persona text; overrides the preset's instruction.
    pub persona_text: Option<String>,

    /// Inline-mode delimiter between persona and user content.
    pub persona_separator: String,

    /// Gemini REST base URL; override to point at a proxy or a mock.
    pub gemini_base_url: String,

    /// Whole-request timeout for backend calls, in seconds.
    pub backend_timeout_secs: u64,

    /// TOML file searched for `GOOGLE_API_KEY` when the env has no key.
    pub secrets_file: PathBuf,

    /// Session widget histories untouched for this long are evicted; `0`
    /// disables idle eviction.
    pub session_idle_secs: u64,

    /// Upper bound on live sessions; the least recently used is evicted.
    pub max_sessions: usize,

    /// Comma-separated CORS origin allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let env_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_owned());
        Self {
            bind_address: env_or("QUILL_BIND", "0.0.0.0:3000"),
            log_level: env_or("QUILL_LOG", "info"),
            log_json: parse_bool(get("QUILL_LOG_JSON"), false),
            model: env_or("QUILL_MODEL", DEFAULT_MODEL),
            persona_mode: env_or("QUILL_PERSONA_MODE", "standing"),
            persona_preset: env_or("QUILL_PERSONA_PRESET", "park-wan-suh"),
            persona_text: get("QUILL_PERSONA").filter(|t| !t.trim().is_empty()),
            persona_separator: env_or("QUILL_PERSONA_SEPARATOR", DEFAULT_SEPARATOR),
            gemini_base_url: env_or("QUILL_GEMINI_BASE_URL", DEFAULT_BASE_URL),
            backend_timeout_secs: parse_or(get("QUILL_BACKEND_TIMEOUT_SECS"), 120),
            secrets_file: PathBuf::from(env_or("QUILL_SECRETS_FILE", ".streamlit/secrets.toml")),
            session_idle_secs: parse_or(get("QUILL_SESSION_IDLE_SECS"), 1800),
            max_sessions: parse_or(get("QUILL_MAX_SESSIONS"), 1000),
            cors_allowed_origins: get("QUILL_CORS_ORIGINS").filter(|s| !s.trim().is_empty()),
            enable_swagger: parse_bool(get("QUILL_ENABLE_SWAGGER"), true),
        }
    }

    fn preset(&self) -> Result<Option<PersonaPreset>, ConfigError> {
        match self.persona_preset.trim() {
            "" => Ok(None),
            name if name.eq_ignore_ascii_case("none") => Ok(None),
            name => PersonaPreset::parse(name).map(Some),
        }
    }

    /// Resolve mode, preset and text into a [`PersonaConfig`].
    pub fn persona_config(&self) -> Result<PersonaConfig, ConfigError> {
        let mode: PersonaMode = self
            .persona_mode
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPersonaMode(self.persona_mode.clone()))?;
        let text = match &self.persona_text {
            Some(text) => Some(text.clone()),
            None => self.preset()?.map(|p| p.instruction().to_owned()),
        };
        let persona = Persona::from_parts(mode, text, Some(self.persona_separator.clone()))?;
        Ok(PersonaConfig::new(self.model.clone(), persona))
    }

    /// Labels for the chat pages: the preset's, or neutral defaults.
    pub fn page_text(&self) -> PageText {
        self.preset().ok().flatten().map(PersonaPreset::page_text).unwrap_or_default()
    }

    pub fn gemini_options(&self, api_key: Option<String>) -> GeminiOptions {
        GeminiOptions {
            api_key,
            model: self.model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.backend_timeout_secs),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
