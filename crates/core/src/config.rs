use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Effective runtime configuration, assembled from defaults, an optional
/// `factotum.toml`, and environment overrides (in that order).
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub index: IndexConfig,
    pub llm: LlmConfig,
    pub tools: ToolsConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub url: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ToolsConfig {
    pub sql_endpoint: String,
    pub document_endpoint: String,
    pub sql_bind_address: String,
    pub document_bind_address: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub planner: PlannerKind,
    pub max_tool_rounds: u32,
    pub trace_reasoning: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    Sequential,
    Crew,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("missing LLM credential: set GOOGLE_API_KEY")]
    MissingCredential,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://company.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            index: IndexConfig {
                url: "sqlite://document_index.db".to_string(),
                embedding_model: "all-MiniLM-L6-v2".to_string(),
                chunk_size: 1000,
                chunk_overlap: 100,
                top_k: 3,
            },
            llm: LlmConfig {
                api_key: None,
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                temperature: 0.0,
                timeout_secs: 60,
            },
            tools: ToolsConfig {
                sql_endpoint: "http://127.0.0.1:8001".to_string(),
                document_endpoint: "http://127.0.0.1:8002".to_string(),
                sql_bind_address: "127.0.0.1:8001".to_string(),
                document_bind_address: "127.0.0.1:8002".to_string(),
                request_timeout_secs: 30,
            },
            agent: AgentConfig {
                planner: PlannerKind::Sequential,
                max_tool_rounds: 8,
                trace_reasoning: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for PlannerKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sequential" | "graph" => Ok(Self::Sequential),
            "crew" => Ok(Self::Crew),
            other => Err(format!("unknown planner `{other}` (expected sequential or crew)")),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Optional-field mirror of [`AppConfig`] for TOML parsing.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<FileDatabase>,
    index: Option<FileIndex>,
    llm: Option<FileLlm>,
    tools: Option<FileTools>,
    agent: Option<FileAgent>,
    logging: Option<FileLogging>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileIndex {
    url: Option<String>,
    embedding_model: Option<String>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLlm {
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileTools {
    sql_endpoint: Option<String>,
    document_endpoint: Option<String>,
    sql_bind_address: Option<String>,
    document_bind_address: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileAgent {
    planner: Option<PlannerKind>,
    max_tool_rounds: Option<u32>,
    trace_reasoning: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .or_else(|| env::var("FACTOTUM_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("factotum.toml"));

        if path.exists() {
            config.apply_file(&path)?;
        } else if options.require_file {
            return Err(ConfigError::MissingConfigFile(path));
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        let file: FileConfig = toml::from_str(&raw)
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;

        if let Some(database) = file.database {
            merge(&mut self.database.url, database.url);
            merge(&mut self.database.max_connections, database.max_connections);
            merge(&mut self.database.timeout_secs, database.timeout_secs);
        }
        if let Some(index) = file.index {
            merge(&mut self.index.url, index.url);
            merge(&mut self.index.embedding_model, index.embedding_model);
            merge(&mut self.index.chunk_size, index.chunk_size);
            merge(&mut self.index.chunk_overlap, index.chunk_overlap);
            merge(&mut self.index.top_k, index.top_k);
        }
        if let Some(llm) = file.llm {
            merge(&mut self.llm.model, llm.model);
            merge(&mut self.llm.base_url, llm.base_url);
            merge(&mut self.llm.temperature, llm.temperature);
            merge(&mut self.llm.timeout_secs, llm.timeout_secs);
        }
        if let Some(tools) = file.tools {
            merge(&mut self.tools.sql_endpoint, tools.sql_endpoint);
            merge(&mut self.tools.document_endpoint, tools.document_endpoint);
            merge(&mut self.tools.sql_bind_address, tools.sql_bind_address);
            merge(&mut self.tools.document_bind_address, tools.document_bind_address);
            merge(&mut self.tools.request_timeout_secs, tools.request_timeout_secs);
        }
        if let Some(agent) = file.agent {
            merge(&mut self.agent.planner, agent.planner);
            merge(&mut self.agent.max_tool_rounds, agent.max_tool_rounds);
            merge(&mut self.agent.trace_reasoning, agent.trace_reasoning);
        }
        if let Some(logging) = file.logging {
            merge(&mut self.logging.level, logging.level);
            merge(&mut self.logging.format, logging.format);
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("FACTOTUM_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = env::var("FACTOTUM_INDEX_URL") {
            self.index.url = url;
        }
        // Same credential variable as the hosted-provider SDKs expect.
        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(SecretString::from(key));
            }
        }
        if let Ok(model) = env::var("FACTOTUM_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(url) = env::var("FACTOTUM_SQL_TOOL_URL") {
            self.tools.sql_endpoint = url;
        }
        if let Ok(url) = env::var("FACTOTUM_DOC_TOOL_URL") {
            self.tools.document_endpoint = url;
        }
        if let Ok(planner) = env::var("FACTOTUM_PLANNER") {
            self.agent.planner = planner.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "FACTOTUM_PLANNER".to_string(),
                value: planner,
            })?;
        }
        if let Ok(trace) = env::var("FACTOTUM_TRACE_REASONING") {
            self.agent.trace_reasoning = matches!(trace.as_str(), "1" | "true" | "yes");
        }
        if let Ok(level) = env::var("FACTOTUM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("FACTOTUM_LOG_FORMAT") {
            self.logging.format = format.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "FACTOTUM_LOG_FORMAT".to_string(),
                value: format,
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.index.url.trim().is_empty() {
            return Err(ConfigError::Validation("index.url must not be empty".to_string()));
        }
        if self.index.chunk_size == 0 {
            return Err(ConfigError::Validation("index.chunk_size must be positive".to_string()));
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(ConfigError::Validation(
                "index.chunk_overlap must be smaller than index.chunk_size".to_string(),
            ));
        }
        if self.index.top_k == 0 {
            return Err(ConfigError::Validation("index.top_k must be positive".to_string()));
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::Validation(
                "agent.max_tool_rounds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Fails when no LLM credential is configured. Surfaces that call the
    /// provider check this at startup.
    pub fn require_llm_credential(&self) -> Result<&SecretString, ConfigError> {
        self.llm.api_key.as_ref().ok_or(ConfigError::MissingCredential)
    }

    /// Effective configuration with secrets redacted, for the `config`
    /// command and doctor output.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "database": { "url": self.database.url },
            "index": {
                "url": self.index.url,
                "embedding_model": self.index.embedding_model,
                "chunk_size": self.index.chunk_size,
                "chunk_overlap": self.index.chunk_overlap,
                "top_k": self.index.top_k,
            },
            "llm": {
                "model": self.llm.model,
                "base_url": self.llm.base_url,
                "api_key": if self.llm.api_key.is_some() { "***redacted***" } else { "unset" },
            },
            "tools": {
                "sql_endpoint": self.tools.sql_endpoint,
                "document_endpoint": self.tools.document_endpoint,
            },
            "agent": {
                "planner": self.agent.planner,
                "max_tool_rounds": self.agent.max_tool_rounds,
                "trace_reasoning": self.agent.trace_reasoning,
            },
            "logging": { "level": self.logging.level, "format": self.logging.format },
        })
    }
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
