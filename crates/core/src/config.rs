use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub detection: DetectionConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub explain: ExplainConfig,
}

impl Config {
    /// Build config for a named profile (empty string = default). Call
    /// `load_dotenv()` first. With a profile such as `PROD`, every key is
    /// looked up as `{PROFILE}_{KEY}` first, falling back to `{KEY}`.
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            detection: DetectionConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            explain: ExplainConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  detection:   threshold={}, model={}",
            self.detection.threshold,
            self.detection.model_path.display()
        );
        tracing::info!(
            "  llm:         provider={}, configured={}, temperature={}",
            self.llm.provider,
            self.llm.is_configured(),
            self.llm.temperature
        );
        tracing::info!("  ollama:      url={}", self.ollama.url);
        tracing::info!(
            "  explain:     enabled={}, stage_timeout={}s, concurrency={}",
            self.explain.enabled,
            self.explain.stage_timeout_secs,
            self.explain.max_concurrency
        );
    }
}

// ── Detection ─────────────────────────────────────────────────

/// Default anomaly cutoff on mean squared reconstruction error.
pub const DEFAULT_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Anomaly cutoff. Severity bands are derived from it (x1.5, x2).
    pub threshold: f64,
    pub model_path: PathBuf,
}

impl DetectionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            threshold: profiled_env_parse(p, "SENTINEL_THRESHOLD", DEFAULT_THRESHOLD),
            model_path: PathBuf::from(profiled_env_or(
                p,
                "SENTINEL_MODEL_PATH",
                "models/autoencoder.json",
            )),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            model_path: PathBuf::from("models/autoencoder.json"),
        }
    }
}

// ── LLM (OpenAI / Anthropic) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "anthropic", "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "openai"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            anthropic_api_key: profiled_env_opt(p, "ANTHROPIC_API_KEY"),
            anthropic_model: profiled_env_or(p, "ANTHROPIC_MODEL", "claude-3-5-haiku-latest"),
            // Explanations must be reproducible across runs.
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.0),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 256),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "anthropic" | "claude" => self.anthropic_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.2"),
        }
    }
}

// ── Explanation pipeline ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainConfig {
    pub enabled: bool,
    /// Upper bound on a single stage call; expiry degrades that tier only.
    pub stage_timeout_secs: u64,
    /// How many tier samples may be explained at once.
    pub max_concurrency: usize,
}

impl ExplainConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            enabled: profiled_env_bool(p, "EXPLAIN_ENABLED", true),
            stage_timeout_secs: profiled_env_parse(p, "EXPLAIN_STAGE_TIMEOUT_SECS", 60),
            max_concurrency: profiled_env_parse(p, "EXPLAIN_MAX_CONCURRENCY", 1usize).max(1),
        }
    }
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stage_timeout_secs: 60,
            max_concurrency: 1,
        }
    }
}
