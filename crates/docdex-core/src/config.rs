//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `DOCDEX_*`
//! env vars (nested keys split on `__`, e.g. `DOCDEX_ENGINE__DATA_DIR`).
//! Every field has a default, so the pipeline runs without any config file.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocdexConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory holding concrete indices and the alias store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Stable alias reads and writes go through.
    #[serde(default = "default_alias")]
    pub alias: String,
    /// Analyzed-offset limit `L` for highlighting, in bytes.
    #[serde(default = "default_max_analyzed_offset")]
    pub max_analyzed_offset: usize,
    #[serde(default = "default_writer_heap_bytes")]
    pub writer_heap_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default)]
    pub fuzzy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Confidence below this presents a candidate list, not one answer.
    #[serde(default = "default_assertive_threshold")]
    pub assertive_threshold: f32,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// How many top hits are cited as sources.
    #[serde(default = "default_top_sources")]
    pub top_sources: usize,
    /// Optional language-generation collaborator.
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_migration_timeout_secs")]
    pub migration_timeout_secs: u64,
    #[serde(default = "default_scroll_batch")]
    pub scroll_batch: usize,
}

fn default_data_dir() -> String {
    "./data/docdex".to_string()
}
fn default_alias() -> String {
    "documents".to_string()
}
fn default_max_analyzed_offset() -> usize {
    10_000_000
}
fn default_writer_heap_bytes() -> usize {
    50_000_000
}
fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    100
}
fn default_assertive_threshold() -> f32 {
    0.4
}
fn default_max_suggestions() -> usize {
    5
}
fn default_top_sources() -> usize {
    3
}
fn default_generator_timeout_secs() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    200
}
fn default_migration_timeout_secs() -> u64 {
    600
}
fn default_scroll_batch() -> usize {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            data_dir: default_data_dir(),
            alias: default_alias(),
            max_analyzed_offset: default_max_analyzed_offset(),
            writer_heap_bytes: default_writer_heap_bytes(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            fuzzy: false,
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        AnswerConfig {
            assertive_threshold: default_assertive_threshold(),
            max_suggestions: default_max_suggestions(),
            top_sources: default_top_sources(),
            generator: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            migration_timeout_secs: default_migration_timeout_secs(),
            scroll_batch: default_scroll_batch(),
        }
    }
}

impl DocdexConfig {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("DOCDEX_").split("__"));

        figment
            .extract()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute, it's returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
