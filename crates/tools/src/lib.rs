//! Tool services and their HTTP plumbing.
//!
//! Each service runs as its own process (`factotum-sql-tool`,
//! `factotum-doc-tool`) and exposes the same two-route contract:
//! `GET /tools` for discovery and `POST /tools/{name}/invoke` for the
//! single question-in, text-out operation. The agent side of the wire
//! lives in [`client`].

pub mod client;
pub mod document_service;
pub mod server;
pub mod sql_service;
pub mod wire;

pub use client::{RemoteTool, ToolClient};
pub use document_service::{DocumentToolService, NO_MATCH_MESSAGE};
pub use server::{router, serve};
pub use sql_service::SqlToolService;
pub use wire::{InvokeRequest, InvokeResponse, ToolService};
