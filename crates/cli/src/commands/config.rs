use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use factotum_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: Option<&str>| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", Some("FACTOTUM_DATABASE_URL")),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", None),
    ));

    lines.push(render_line(
        "index.url",
        &config.index.url,
        source("index.url", Some("FACTOTUM_INDEX_URL")),
    ));
    lines.push(render_line(
        "index.embedding_model",
        &config.index.embedding_model,
        source("index.embedding_model", None),
    ));
    lines.push(render_line(
        "index.chunk_size",
        &config.index.chunk_size.to_string(),
        source("index.chunk_size", None),
    ));
    lines.push(render_line(
        "index.chunk_overlap",
        &config.index.chunk_overlap.to_string(),
        source("index.chunk_overlap", None),
    ));
    lines.push(render_line(
        "index.top_k",
        &config.index.top_k.to_string(),
        source("index.top_k", None),
    ));

    lines.push(render_line(
        "llm.model",
        &config.llm.model,
        source("llm.model", Some("FACTOTUM_LLM_MODEL")),
    ));
    lines.push(render_line("llm.base_url", &config.llm.base_url, source("llm.base_url", None)));
    lines.push(render_line(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        source("llm.temperature", None),
    ));
    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line("llm.api_key", api_key, source("llm.api_key", Some("GOOGLE_API_KEY"))));

    lines.push(render_line(
        "tools.sql_endpoint",
        &config.tools.sql_endpoint,
        source("tools.sql_endpoint", Some("FACTOTUM_SQL_TOOL_URL")),
    ));
    lines.push(render_line(
        "tools.document_endpoint",
        &config.tools.document_endpoint,
        source("tools.document_endpoint", Some("FACTOTUM_DOC_TOOL_URL")),
    ));
    lines.push(render_line(
        "tools.sql_bind_address",
        &config.tools.sql_bind_address,
        source("tools.sql_bind_address", None),
    ));
    lines.push(render_line(
        "tools.document_bind_address",
        &config.tools.document_bind_address,
        source("tools.document_bind_address", None),
    ));

    lines.push(render_line(
        "agent.planner",
        &format!("{:?}", config.agent.planner),
        source("agent.planner", Some("FACTOTUM_PLANNER")),
    ));
    lines.push(render_line(
        "agent.max_tool_rounds",
        &config.agent.max_tool_rounds.to_string(),
        source("agent.max_tool_rounds", None),
    ));
    lines.push(render_line(
        "agent.trace_reasoning",
        &config.agent.trace_reasoning.to_string(),
        source("agent.trace_reasoning", Some("FACTOTUM_TRACE_REASONING")),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", Some("FACTOTUM_LOG_LEVEL")),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", Some("FACTOTUM_LOG_FORMAT")),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    if let Some(from_env) = env::var_os("FACTOTUM_CONFIG") {
        let path = PathBuf::from(from_env);
        if path.exists() {
            return Some(path);
        }
    }

    let root = PathBuf::from("factotum.toml");
    if root.exists() {
        return Some(root);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
