use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7410".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_github_raw_base")]
    pub raw_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            raw_base: default_github_raw_base(),
        }
    }
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_github_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,
    #[serde(default = "default_openai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            model: default_model(),
            reasoning_effort: default_reasoning_effort(),
            timeout_secs: default_openai_timeout_secs(),
        }
    }
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "o4-mini".to_string()
}
fn default_reasoning_effort() -> String {
    "high".to_string()
}
fn default_openai_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_api_base")]
    pub api_base: String,
    #[serde(default = "default_storage_content_base")]
    pub content_base: String,
    #[serde(default = "default_storage_auth_base")]
    pub auth_base: String,
    #[serde(default = "default_storage_folder")]
    pub folder: String,
    #[serde(default = "default_storage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_base: default_storage_api_base(),
            content_base: default_storage_content_base(),
            auth_base: default_storage_auth_base(),
            folder: default_storage_folder(),
            timeout_secs: default_storage_timeout_secs(),
        }
    }
}

fn default_storage_api_base() -> String {
    "https://api.dropboxapi.com/2".to_string()
}
fn default_storage_content_base() -> String {
    "https://content.dropboxapi.com/2".to_string()
}
fn default_storage_auth_base() -> String {
    "https://api.dropbox.com".to_string()
}
fn default_storage_folder() -> String {
    "/expounder".to_string()
}
fn default_storage_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Maximum bytes per uploaded chunk.
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
    /// Concurrency ceiling for blob downloads and chunk uploads.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-file size cap for the inline summarization path. The
    /// file-upload generation path is uncapped.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: default_chunk_bytes(),
            concurrency: default_concurrency(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_chunk_bytes() -> usize {
    80_000
}
fn default_concurrency() -> usize {
    6
}
fn default_max_file_bytes() -> usize {
    60_000
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist. Env-provided credentials (GitHub, OpenAI, Dropbox)
/// are read by the modules that need them, never stored in the config.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.pipeline.chunk_bytes == 0 {
        anyhow::bail!("pipeline.chunk_bytes must be > 0");
    }

    if config.pipeline.concurrency == 0 {
        anyhow::bail!("pipeline.concurrency must be > 0");
    }

    match config.openai.reasoning_effort.as_str() {
        "low" | "medium" | "high" => {}
        other => anyhow::bail!(
            "Unknown openai.reasoning_effort: '{}'. Must be low, medium, or high.",
            other
        ),
    }

    if !config.storage.folder.starts_with('/') {
        anyhow::bail!("storage.folder must start with '/'");
    }

    Ok(config)
}
