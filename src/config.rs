//! TOML configuration and credential loading.
//!
//! A [`Config`] is loaded once at process start and passed by reference into
//! every pipeline entry point. Every field has a default, so a missing config
//! file yields the stock setup: three policy files, Gemini models, a
//! `./chroma_db` store holding the `company_policies` collection, and a chat
//! server on `127.0.0.1:7860`.
//!
//! The API credential is never stored in the file. [`Credentials::from_env`]
//! reads it from the environment variable named by `provider.api_key_env`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the vector store files.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            collection: default_collection(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./chroma_db")
}
fn default_collection() -> String {
    "company_policies".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_files")]
    pub files: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            files: default_files(),
        }
    }
}

fn default_files() -> Vec<String> {
    vec![
        "policy_hr.txt".to_string(),
        "policy_remote.txt".to_string(),
        "policy_it.txt".to_string(),
    ]
}

/// Which remote API family serves embeddings and generation.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::OpenAI => "https://api.openai.com",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Override for the API root, e.g. a proxy or a local mock.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout. `None` falls back to [`DEFAULT_TIMEOUT_SECS`].
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

impl ProviderConfig {
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
            .trim_end_matches('/')
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmbeddingConfig {
    /// Model name. Defaults per provider when unset.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    100
}

/// Gemini rejects batch embedding requests with more than 100 entries.
pub const GEMINI_MAX_BATCH: usize = 100;

impl EmbeddingConfig {
    pub fn model(&self, kind: ProviderKind) -> &str {
        self.model.as_deref().unwrap_or(match kind {
            ProviderKind::Gemini => "models/text-embedding-004",
            ProviderKind::OpenAI => "text-embedding-3-small",
        })
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GenerationConfig {
    #[serde(default)]
    pub model: Option<String>,
}

impl GenerationConfig {
    pub fn model(&self, kind: ProviderKind) -> &str {
        self.model.as_deref().unwrap_or(match kind {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::OpenAI => "gpt-4o-mini",
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_examples")]
    pub examples: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            title: default_title(),
            description: default_description(),
            examples: default_examples(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7860".to_string()
}
fn default_title() -> String {
    "Company Policy Chatbot".to_string()
}
fn default_description() -> String {
    "Ask me questions about HR, IT, or Remote Work policies.".to_string()
}
fn default_examples() -> Vec<String> {
    vec![
        "What is the company's leave policy?".to_string(),
        "How can employees request remote work?".to_string(),
        "What is the password policy?".to_string(),
    ]
}

/// Load configuration from `path`.
///
/// A missing file is not an error: the built-in defaults are used instead.
/// A file that exists but cannot be read or parsed, or that fails
/// validation, is fatal.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(
            "config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.storage.collection.trim().is_empty() {
        bail!("storage.collection must not be empty");
    }

    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = config.ingest.files.iter().find(|f| !seen.insert(f.as_str())) {
        bail!("ingest.files lists {} more than once", dup);
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.batch_size < 1 {
        bail!("embedding.batch_size must be >= 1");
    }

    if config.provider.kind == ProviderKind::Gemini
        && config.embedding.batch_size > GEMINI_MAX_BATCH
    {
        bail!(
            "embedding.batch_size must be <= {} for the gemini provider",
            GEMINI_MAX_BATCH
        );
    }

    if config.provider.timeout_secs == Some(0) {
        bail!("provider.timeout_secs must be > 0");
    }

    Ok(())
}

/// The API credential, read once at start-up.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the API key from the environment variable configured for the
    /// provider. An unset or blank variable is a fatal start-up error.
    pub fn from_env(config: &Config) -> Result<Self> {
        let var = config.provider.api_key_env();
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => bail!(
                "{} not found. Please set it in your environment before running policybot.",
                var
            ),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
