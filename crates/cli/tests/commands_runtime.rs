use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use factotum_cli::commands::{chat, config, doctor, ingest, setup};
use serde_json::Value;

#[test]
fn setup_db_seeds_and_verifies() {
    with_env(&[("FACTOTUM_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = setup::run();
        assert_eq!(result.exit_code, 0, "output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "setup-db");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("4 employees"));
        assert!(message.contains("3 products"));
        assert!(message.contains("3 sales"));
    });
}

#[test]
fn setup_db_is_idempotent() {
    with_env(&[("FACTOTUM_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let first = setup::run();
        assert_eq!(first.exit_code, 0, "output: {}", first.output);
        let second = setup::run();
        assert_eq!(second.exit_code, 0, "output: {}", second.output);
        assert_eq!(parse_payload(&first.output)["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn ingest_rejects_missing_file() {
    with_env(&[], || {
        let result = ingest::run(Path::new("/nonexistent/report.txt"), None);
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ingest");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "read_document");
    });
}

#[test]
fn chat_rejects_unknown_planner() {
    with_env(&[("GOOGLE_API_KEY", "test-key")], || {
        let result = chat::run(Some("freeform"));
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "planner_selection");
    });
}

#[test]
fn chat_requires_credential() {
    with_env(&[], || {
        let result = chat::run(None);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "llm_credential");
        assert!(payload["message"].as_str().unwrap_or("").contains("GOOGLE_API_KEY"));
    });
}

#[test]
fn config_redacts_the_credential() {
    with_env(&[("GOOGLE_API_KEY", "super-secret-key")], || {
        let output = config::run();
        assert!(output.contains("llm.api_key = <redacted>"), "output: {output}");
        assert!(!output.contains("super-secret-key"));
        assert!(output.contains("agent.planner = Sequential"));
        assert!(output.contains("source: env (GOOGLE_API_KEY)"));
    });
}

#[test]
fn doctor_reports_failures_as_structured_json() {
    // No credential, no seeded store, nothing listening on the endpoints.
    with_env(
        &[
            ("FACTOTUM_DATABASE_URL", "sqlite::memory:?cache=shared"),
            ("FACTOTUM_INDEX_URL", "sqlite::memory:?cache=shared"),
            ("FACTOTUM_SQL_TOOL_URL", "http://127.0.0.1:1"),
            ("FACTOTUM_DOC_TOOL_URL", "http://127.0.0.1:1"),
        ],
        || {
            let output = doctor::run(true);
            let payload: Value =
                serde_json::from_str(&output).expect("doctor --json should emit valid JSON");
            assert_eq!(payload["overall_status"], "fail");

            let checks = payload["checks"].as_array().expect("checks array");
            let status_of = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .unwrap_or_default()
            };
            assert_eq!(status_of("config_validation"), "pass");
            assert_eq!(status_of("llm_credential"), "fail");
            assert_eq!(status_of("sql_tool_reachability"), "fail");
            assert_eq!(status_of("document_tool_reachability"), "fail");
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FACTOTUM_CONFIG",
        "FACTOTUM_DATABASE_URL",
        "FACTOTUM_INDEX_URL",
        "GOOGLE_API_KEY",
        "FACTOTUM_LLM_MODEL",
        "FACTOTUM_SQL_TOOL_URL",
        "FACTOTUM_DOC_TOOL_URL",
        "FACTOTUM_PLANNER",
        "FACTOTUM_TRACE_REASONING",
        "FACTOTUM_LOG_LEVEL",
        "FACTOTUM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
