//! Client for Azure DevOps work item tracking.
//!
//! [`client::AzureDevOpsClient`] is the core: WIQL queries, batched record
//! retrieval and revision-guarded state changes over a pluggable
//! [`client::transport::Transport`]. [`repository::WorkItemRepository`] is the
//! adapter a host uses: it owns configuration, opens a client per operation
//! and keeps the per-type state cache.

pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod repository;

pub use client::AzureDevOpsClient;
pub use error::ClientError;
pub use model::{TaskType, WorkItem, WorkItemState};
pub use repository::WorkItemRepository;
