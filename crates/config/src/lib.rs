//! Configuration loading, validation, and management for memoforge.
//!
//! Loads configuration from `~/.memoforge/config.toml` with environment
//! variable overrides. Validates all settings before a pipeline is built.
//! Every heuristic constant of the packer lives here as tunable
//! configuration rather than in code.

use memoforge_core::Budget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.memoforge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Budget packer settings
    #[serde(default)]
    pub packer: PackerConfig,

    /// Session memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Per-stage timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// LLM endpoint used for moderation, generation and market research
    #[serde(default)]
    pub llm: LlmConfig,

    /// Which moderation collaborator to use
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Structured profile lookup API
    #[serde(default)]
    pub profile: ProfileConfig,

    /// External extraction commands for binary formats
    #[serde(default)]
    pub extractors: ExtractorsConfig,

    /// Optional market analysis subprocess
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_analysis: Option<CommandConfig>,
}

fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// ── Packer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Token ceiling for the packed material.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Headroom that is never spent on material.
    #[serde(default)]
    pub reserve: usize,

    /// Safety buffer below `max_tokens` for admitting whole fragments.
    #[serde(default = "default_whole_buffer")]
    pub whole_buffer: usize,

    /// Safety buffer below `max_tokens` for admitting summaries.
    #[serde(default = "default_summary_buffer")]
    pub summary_buffer: usize,

    /// Characters per token used by the length-based estimator.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Fragments with fewer characters than this are dropped as noise.
    #[serde(default = "default_min_fragment_chars")]
    pub min_fragment_chars: usize,
}

fn default_max_tokens() -> usize {
    120_000
}
fn default_whole_buffer() -> usize {
    1_000
}
fn default_summary_buffer() -> usize {
    500
}
fn default_chars_per_token() -> usize {
    4
}
fn default_min_fragment_chars() -> usize {
    50
}

impl PackerConfig {
    pub fn budget(&self) -> Budget {
        Budget::new(self.max_tokens, self.reserve)
    }
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            reserve: 0,
            whole_buffer: default_whole_buffer(),
            summary_buffer: default_summary_buffer(),
            chars_per_token: default_chars_per_token(),
            min_fragment_chars: default_min_fragment_chars(),
        }
    }
}

// ── Memory ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// FIFO cap on entries kept per session.
    #[serde(default = "default_max_entries")]
    pub max_entries_per_session: usize,

    /// Prepend earlier full-content entries of the same session before compaction.
    #[serde(default)]
    pub reuse_previous_context: bool,
}

fn default_max_entries() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries_per_session: default_max_entries(),
            reuse_previous_context: false,
        }
    }
}

// ── Timeouts ────────────────────────────────────────────────────────────────

/// Stage timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_extraction_secs")]
    pub extraction: u64,
    #[serde(default = "default_ocr_secs")]
    pub ocr: u64,
    #[serde(default = "default_url_fetch_secs")]
    pub url_fetch: u64,
    #[serde(default = "default_profile_lookup_secs")]
    pub profile_lookup: u64,
    #[serde(default = "default_profile_api_attempt_secs")]
    pub profile_api_attempt: u64,
    #[serde(default = "default_profile_page_attempt_secs")]
    pub profile_page_attempt: u64,
    #[serde(default = "default_moderation_secs")]
    pub moderation: u64,
    #[serde(default = "default_opportunity_summary_secs")]
    pub opportunity_summary: u64,
    #[serde(default = "default_market_analysis_secs")]
    pub market_analysis: u64,
    #[serde(default = "default_generation_secs")]
    pub generation: u64,
}

fn default_extraction_secs() -> u64 {
    30
}
fn default_ocr_secs() -> u64 {
    90
}
fn default_url_fetch_secs() -> u64 {
    8
}
fn default_profile_lookup_secs() -> u64 {
    12
}
fn default_profile_api_attempt_secs() -> u64 {
    10
}
fn default_profile_page_attempt_secs() -> u64 {
    8
}
fn default_moderation_secs() -> u64 {
    20
}
fn default_opportunity_summary_secs() -> u64 {
    30
}
fn default_market_analysis_secs() -> u64 {
    45
}
fn default_generation_secs() -> u64 {
    90
}

impl TimeoutConfig {
    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction)
    }
    pub fn ocr(&self) -> Duration {
        Duration::from_secs(self.ocr)
    }
    pub fn url_fetch(&self) -> Duration {
        Duration::from_secs(self.url_fetch)
    }
    pub fn profile_lookup(&self) -> Duration {
        Duration::from_secs(self.profile_lookup)
    }
    pub fn profile_api_attempt(&self) -> Duration {
        Duration::from_secs(self.profile_api_attempt)
    }
    pub fn profile_page_attempt(&self) -> Duration {
        Duration::from_secs(self.profile_page_attempt)
    }
    pub fn moderation(&self) -> Duration {
        Duration::from_secs(self.moderation)
    }
    pub fn opportunity_summary(&self) -> Duration {
        Duration::from_secs(self.opportunity_summary)
    }
    pub fn market_analysis(&self) -> Duration {
        Duration::from_secs(self.market_analysis)
    }
    pub fn generation(&self) -> Duration {
        Duration::from_secs(self.generation)
    }

    fn all(&self) -> [(&'static str, u64); 10] {
        [
            ("extraction", self.extraction),
            ("ocr", self.ocr),
            ("url_fetch", self.url_fetch),
            ("profile_lookup", self.profile_lookup),
            ("profile_api_attempt", self.profile_api_attempt),
            ("profile_page_attempt", self.profile_page_attempt),
            ("moderation", self.moderation),
            ("opportunity_summary", self.opportunity_summary),
            ("market_analysis", self.market_analysis),
            ("generation", self.generation),
        ]
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            extraction: default_extraction_secs(),
            ocr: default_ocr_secs(),
            url_fetch: default_url_fetch_secs(),
            profile_lookup: default_profile_lookup_secs(),
            profile_api_attempt: default_profile_api_attempt_secs(),
            profile_page_attempt: default_profile_page_attempt_secs(),
            moderation: default_moderation_secs(),
            opportunity_summary: default_opportunity_summary_secs(),
            market_analysis: default_market_analysis_secs(),
            generation: default_generation_secs(),
        }
    }
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_moderation_model")]
    pub moderation_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the generated memo.
    #[serde(default = "default_completion_tokens")]
    pub max_tokens: u32,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_moderation_model() -> String {
    "omni-moderation-latest".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_completion_tokens() -> u32 {
    6000
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("moderation_model", &self.moderation_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            moderation_model: default_moderation_model(),
            temperature: default_temperature(),
            max_tokens: default_completion_tokens(),
        }
    }
}

// ── Moderation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// "openai" or "keyword"
    #[serde(default = "default_moderation_provider")]
    pub provider: String,

    /// Extra deny-list terms for the keyword moderator, as `category = [terms]`.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub deny_terms: std::collections::BTreeMap<String, Vec<String>>,
}

fn default_moderation_provider() -> String {
    "openai".into()
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            provider: default_moderation_provider(),
            deny_terms: Default::default(),
        }
    }
}

// ── Profile lookup ──────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_profile_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Whether to fall back to scraping the public profile page.
    #[serde(default = "default_true")]
    pub public_page_fallback: bool,
}

fn default_profile_api_url() -> String {
    "https://enrichlayer.com/api/v2/profile".into()
}

impl std::fmt::Debug for ProfileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("public_page_fallback", &self.public_page_fallback)
            .finish()
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            api_url: default_profile_api_url(),
            api_key: None,
            public_page_fallback: true,
        }
    }
}

// ── Extractors ──────────────────────────────────────────────────────────────

/// An external program fed on stdin, reporting on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractorsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<CommandConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docx: Option<CommandConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<CommandConfig>,
}

// ── Loading ─────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from the default path (~/.memoforge/config.toml).
    ///
    /// Environment variables override the file:
    /// - `MEMOFORGE_API_KEY`, then `OPENAI_API_KEY` → `llm.api_key`
    /// - `MEMOFORGE_MODEL` → `llm.model`
    /// - `PROFILE_API_KEY` → `profile.api_key`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("MEMOFORGE_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("MEMOFORGE_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("PROFILE_API_KEY") {
            self.profile.api_key = Some(key);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".memoforge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.packer;
        if p.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "packer.chars_per_token must be > 0".into(),
            ));
        }
        if p.max_tokens <= p.whole_buffer {
            return Err(ConfigError::ValidationError(
                "packer.max_tokens must exceed packer.whole_buffer".into(),
            ));
        }
        if p.summary_buffer > p.whole_buffer {
            return Err(ConfigError::ValidationError(
                "packer.summary_buffer must not exceed packer.whole_buffer".into(),
            ));
        }
        if p.reserve >= p.max_tokens {
            return Err(ConfigError::ValidationError(
                "packer.reserve must be below packer.max_tokens".into(),
            ));
        }
        if self.memory.max_entries_per_session == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_entries_per_session must be > 0".into(),
            ));
        }
        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if let Some((name, _)) = self.timeouts.all().iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ValidationError(format!(
                "timeouts.{name} must be > 0"
            )));
        }
        if !matches!(self.moderation.provider.as_str(), "openai" | "keyword") {
            return Err(ConfigError::ValidationError(format!(
                "moderation.provider must be 'openai' or 'keyword', got '{}'",
                self.moderation.provider
            )));
        }
        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
