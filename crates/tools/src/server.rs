//! HTTP surface of a tool service: discovery plus invocation.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info, warn};

use factotum_core::domain::ToolDescriptor;
use factotum_core::errors::ToolErrorKind;

use crate::wire::{InvokeRequest, InvokeResponse, ToolService};

#[derive(Clone)]
struct ServiceState {
    service: Arc<dyn ToolService>,
}

pub fn router(service: Arc<dyn ToolService>) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}/invoke", post(invoke))
        .with_state(ServiceState { service })
}

/// Bind and serve until ctrl-c.
pub async fn serve(bind_address: &str, service: Arc<dyn ToolService>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    let tool = service.descriptor().name;
    info!(tool, bind_address, "tool service listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "shutdown signal handler failed");
            }
        })
        .await
}

async fn list_tools(State(state): State<ServiceState>) -> Json<Vec<ToolDescriptor>> {
    Json(vec![state.service.descriptor()])
}

async fn invoke(
    State(state): State<ServiceState>,
    Path(name): Path<String>,
    Json(request): Json<InvokeRequest>,
) -> (StatusCode, Json<InvokeResponse>) {
    let descriptor = state.service.descriptor();
    if name != descriptor.name {
        warn!(requested = name, serves = descriptor.name, "unknown tool requested");
        return (
            StatusCode::NOT_FOUND,
            Json(InvokeResponse::Error {
                kind: ToolErrorKind::Unreachable,
                message: format!("this service has no tool named `{name}`"),
            }),
        );
    }

    info!(tool = descriptor.name, question = request.question, "invoking tool");
    let outcome = state.service.answer(&request.question).await;
    if let Err(error) = &outcome {
        warn!(tool = descriptor.name, error = %error, "tool invocation failed");
    }

    // Tool-level failures are part of the contract, not transport errors.
    (StatusCode::OK, Json(InvokeResponse::from_outcome(outcome)))
}
