use factotum_core::config::{AppConfig, LoadOptions};
use factotum_db::{connect_with_settings, SeedDataset};
use factotum_index::ChunkStore;
use factotum_tools::ToolClient;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credential(&config));
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(async {
                    checks.push(check_fact_store(&config).await);
                    checks.push(check_document_index(&config).await);
                    checks.push(
                        check_tool_reachability(
                            "sql_tool_reachability",
                            &config.tools.sql_endpoint,
                            config.tools.request_timeout_secs,
                        )
                        .await,
                    );
                    checks.push(
                        check_tool_reachability(
                            "document_tool_reachability",
                            &config.tools.document_endpoint,
                            config.tools.request_timeout_secs,
                        )
                        .await,
                    );
                }),
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "runtime_init",
                        status: CheckStatus::Fail,
                        details: format!("failed to initialize async runtime: {error}"),
                    });
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in [
                "llm_credential",
                "fact_store",
                "document_index",
                "sql_tool_reachability",
                "document_tool_reachability",
            ] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credential(config: &AppConfig) -> DoctorCheck {
    match config.require_llm_credential() {
        Ok(_) => DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Pass,
            details: "GOOGLE_API_KEY is set".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn check_fact_store(config: &AppConfig) -> DoctorCheck {
    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            return DoctorCheck {
                name: "fact_store",
                status: CheckStatus::Fail,
                details: format!("failed to connect to `{}`: {error}", config.database.url),
            };
        }
    };

    let check = match SeedDataset::verify(&pool).await {
        Ok(verification) if verification.passed => DoctorCheck {
            name: "fact_store",
            status: CheckStatus::Pass,
            details: format!("`{}` is migrated and seeded", config.database.url),
        },
        Ok(verification) => DoctorCheck {
            name: "fact_store",
            status: CheckStatus::Fail,
            details: format!(
                "seed verification failed (run `factotum setup-db`): {}",
                verification.failures.join("; ")
            ),
        },
        Err(error) => DoctorCheck {
            name: "fact_store",
            status: CheckStatus::Fail,
            details: format!("verification query failed (run `factotum setup-db`): {error}"),
        },
    };
    pool.close().await;
    check
}

async fn check_document_index(config: &AppConfig) -> DoctorCheck {
    match ChunkStore::open(&config.index.url).await {
        Ok(store) => match store.count().await {
            Ok(0) => DoctorCheck {
                name: "document_index",
                status: CheckStatus::Fail,
                details: format!("`{}` is empty (run `factotum ingest <file>`)", config.index.url),
            },
            Ok(chunks) => DoctorCheck {
                name: "document_index",
                status: CheckStatus::Pass,
                details: format!("`{}` holds {chunks} chunks", config.index.url),
            },
            Err(error) => DoctorCheck {
                name: "document_index",
                status: CheckStatus::Fail,
                details: format!("count query failed: {error}"),
            },
        },
        Err(error) => DoctorCheck {
            name: "document_index",
            status: CheckStatus::Fail,
            details: format!("failed to open `{}`: {error}", config.index.url),
        },
    }
}

async fn check_tool_reachability(
    name: &'static str,
    endpoint: &str,
    timeout_secs: u64,
) -> DoctorCheck {
    let client = match ToolClient::new(endpoint, timeout_secs) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() };
        }
    };
    match client.discover().await {
        Ok(descriptors) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "`{endpoint}` advertises: {}",
                descriptors
                    .iter()
                    .map(|descriptor| descriptor.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
