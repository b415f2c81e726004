//! Configuration management for SafeDrop.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - Config file (`.safedrop/config.yaml` in the workspace, or `--config`)
//! - Environment variables (`SAFEDROP_*`)
//! - Command-line flags
//!
//! Relative paths in the configuration are resolved against the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Language-model backends known to the factory.
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Embedding providers known to the factory.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .safedrop/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Retrieval pipeline settings
    pub rag: RagSettings,

    /// Answer generation backend settings
    pub llm: LlmSettings,
}

/// How a build treats an index that already exists at the target location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Drop existing entries and write the new set.
    #[default]
    Replace,
    /// Keep existing entries and add new ones, skipping duplicates.
    Append,
}

impl MergePolicy {
    /// Parse a merge policy name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "replace" | "overwrite" => Some(Self::Replace),
            "append" | "extend" => Some(Self::Append),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

/// Retrieval pipeline settings (`rag:` section of config.yaml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RagSettings {
    /// Directory scanned by `ingest` when no source is given
    pub data_dir: PathBuf,

    /// Self-contained vector index directory
    pub index_dir: PathBuf,

    /// Policy-aware instruction template
    pub template_path: PathBuf,

    /// Maximum fragment length in characters
    pub chunk_size: usize,

    /// Characters shared by adjacent fragments
    pub chunk_overlap: usize,

    /// Number of fragments retrieved per question
    pub top_k: usize,

    /// Upper bound on a single generation call
    pub generation_timeout_secs: u64,

    /// Behaviour when building over an existing index
    pub merge_policy: MergePolicy,

    /// Embedding model used at build and query time
    pub embedding: EmbeddingSettings,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from(".safedrop/index"),
            template_path: PathBuf::from("prompts/policy_aware.txt"),
            chunk_size: 800,
            chunk_overlap: 100,
            top_k: 3,
            generation_timeout_secs: 120,
            merge_policy: MergePolicy::Replace,
            embedding: EmbeddingSettings::default(),
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Endpoint for HTTP providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Answer generation backend settings (`llm:` section of config.yaml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Backend: "ollama" (local runtime) or "openai" (remote API)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Environment variable holding the API key (remote backends)
    pub api_key_env: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3:8b".to_string(),
            endpoint: None,
            api_key_env: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    rag: Option<RagSettings>,
    llm: Option<LlmSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            rag: RagSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration for a workspace.
    ///
    /// `workspace` and `config_file` come from the command line (which also
    /// reads `SAFEDROP_WORKSPACE` / `SAFEDROP_CONFIG`). Remaining environment
    /// variables are applied after the config file:
    /// - `SAFEDROP_PROVIDER`, `SAFEDROP_MODEL`: generation backend and model
    /// - `SAFEDROP_EMBEDDING_MODEL`: embedding model identifier
    /// - `SAFEDROP_INDEX_DIR`, `SAFEDROP_TEMPLATE`: index and template locations
    /// - `SAFEDROP_TOP_K`: retrieval depth
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use safedrop_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Index: {:?}", config.index_dir());
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }
        config.config_file = config_file;

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".safedrop/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file = Self::parse_yaml(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))?;

        let mut result = self.clone();

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    fn parse_yaml(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Apply `SAFEDROP_*` environment overrides.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("SAFEDROP_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("SAFEDROP_MODEL") {
            self.llm.model = model;
        }

        if let Ok(model) = std::env::var("SAFEDROP_EMBEDDING_MODEL") {
            self.rag.embedding.model = model;
        }

        if let Ok(dir) = std::env::var("SAFEDROP_INDEX_DIR") {
            self.rag.index_dir = PathBuf::from(dir);
        }

        if let Ok(template) = std::env::var("SAFEDROP_TEMPLATE") {
            self.rag.template_path = PathBuf::from(template);
        }

        if let Ok(top_k) = std::env::var("SAFEDROP_TOP_K") {
            self.rag.top_k = top_k.parse().map_err(|_| {
                AppError::Config(format!("SAFEDROP_TOP_K must be a positive integer, got '{}'", top_k))
            })?;
        }

        if self.log_level.is_none() {
            self.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the config file and environment.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .safedrop directory.
    pub fn safedrop_dir(&self) -> PathBuf {
        self.workspace.join(".safedrop")
    }

    /// Resolve a configured path against the workspace.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    pub fn index_dir(&self) -> PathBuf {
        self.resolve_path(&self.rag.index_dir)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve_path(&self.rag.data_dir)
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve_path(&self.rag.template_path)
    }

    /// Resolve the generation API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        let env_var = match (&self.llm.api_key_env, self.llm.provider.as_str()) {
            (Some(name), _) => name.as_str(),
            (None, "openai") => "OPENAI_API_KEY",
            (None, _) => return None,
        };
        std::env::var(env_var).ok()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        let embedding = &self.rag.embedding;
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding.provider.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.rag.chunk_size == 0 {
            return Err(AppError::Config(
                "chunkSize must be greater than zero".to_string(),
            ));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.rag.generation_timeout_secs == 0 {
            return Err(AppError::Config(
                "generationTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "llama3:8b");
        assert_eq!(config.rag.chunk_size, 800);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.merge_policy, MergePolicy::Replace);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_resolve_against_workspace() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/safedrop");
        assert_eq!(config.index_dir(), PathBuf::from("/srv/safedrop/.safedrop/index"));
        assert_eq!(
            config.template_path(),
            PathBuf::from("/srv/safedrop/prompts/policy_aware.txt")
        );

        config.rag.index_dir = PathBuf::from("/var/lib/index");
        assert_eq!(config.index_dir(), PathBuf::from("/var/lib/index"));
    }

    #[test]
    fn test_yaml_sections_merge_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
rag:
  chunkSize: 400
  topK: 5
  mergePolicy: append
  embedding:
    provider: ollama
    model: nomic-embed-text
    dimensions: 768
llm:
  provider: openai
  model: gpt-4o-mini
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.rag.chunk_size, 400);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.rag.merge_policy, MergePolicy::Append);
        assert_eq!(config.rag.embedding.model, "nomic-embed-text");
        assert_eq!(config.rag.embedding.dimensions, 768);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "rag: [unclosed").unwrap();

        let err = AppConfig::default().merge_yaml(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.llm.provider, "openai");
        assert_eq!(overridden.llm.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_chunk_parameters() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = 800;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.rag.chunk_overlap = 100;
        config.rag.chunk_size = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_top_k() {
        let mut config = AppConfig::default();
        config.rag.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_policy_parse() {
        assert_eq!(MergePolicy::parse("replace"), Some(MergePolicy::Replace));
        assert_eq!(MergePolicy::parse("APPEND"), Some(MergePolicy::Append));
        assert_eq!(MergePolicy::parse("merge"), None);
    }
}
