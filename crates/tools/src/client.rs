//! Agent-side HTTP client: discovers a tool service's descriptors at
//! startup and dispatches invocations for the session's lifetime. Every
//! transport-level problem maps to [`ToolError::Unreachable`]; tool-level
//! failures come back classified from the wire payload.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use factotum_agent::Tool;
use factotum_core::domain::ToolDescriptor;
use factotum_core::errors::ToolError;

use crate::wire::{InvokeRequest, InvokeResponse};

#[derive(Clone)]
pub struct ToolClient {
    http: reqwest::Client,
    base_url: String,
}

impl ToolClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| ToolError::Unreachable {
                name: base_url.to_string(),
                detail: format!("failed to build HTTP client: {error}"),
            })?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Fetch the tools this service advertises.
    pub async fn discover(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let url = format!("{}/tools", self.base_url);
        let response = self.http.get(&url).send().await.map_err(|error| {
            ToolError::Unreachable {
                name: self.base_url.clone(),
                detail: format!("discovery request failed: {error}"),
            }
        })?;

        if !response.status().is_success() {
            return Err(ToolError::Unreachable {
                name: self.base_url.clone(),
                detail: format!("discovery returned status {}", response.status()),
            });
        }

        let descriptors: Vec<ToolDescriptor> =
            response.json().await.map_err(|error| ToolError::Unreachable {
                name: self.base_url.clone(),
                detail: format!("discovery payload was malformed: {error}"),
            })?;
        debug!(endpoint = self.base_url, tools = descriptors.len(), "discovered tools");
        Ok(descriptors)
    }

    pub async fn invoke(&self, tool_name: &str, question: &str) -> Result<String, ToolError> {
        let url = format!("{}/tools/{tool_name}/invoke", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&InvokeRequest { question: question.to_string() })
            .send()
            .await
            .map_err(|error| ToolError::Unreachable {
                name: tool_name.to_string(),
                detail: format!("invoke request failed: {error}"),
            })?;

        let status = response.status();
        // Error payloads travel in the body even on 404, so parse first.
        let payload: InvokeResponse =
            response.json().await.map_err(|error| ToolError::Unreachable {
                name: tool_name.to_string(),
                detail: format!("invoke returned status {status} with malformed body: {error}"),
            })?;
        payload.into_outcome(tool_name)
    }
}

/// A discovered tool bound to its service, usable by the controllers.
pub struct RemoteTool {
    client: ToolClient,
    descriptor: ToolDescriptor,
}

impl RemoteTool {
    pub fn new(client: ToolClient, descriptor: ToolDescriptor) -> Self {
        Self { client, descriptor }
    }

    /// Discover every tool a service advertises and bind each one.
    pub async fn discover_all(client: &ToolClient) -> Result<Vec<RemoteTool>, ToolError> {
        let descriptors = client.discover().await?;
        Ok(descriptors
            .into_iter()
            .map(|descriptor| RemoteTool::new(client.clone(), descriptor))
            .collect())
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, question: &str) -> Result<String, ToolError> {
        self.client.invoke(&self.descriptor.name, question).await
    }
}
