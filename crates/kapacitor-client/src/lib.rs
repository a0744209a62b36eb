pub mod client;
pub mod config;
pub mod metrics;
pub mod script;
pub mod stats;
pub mod task;
pub mod transport;

pub use client::{KapacitorClient, Operation};
pub use config::ClientConfig;
pub use script::normalize_intervals;
pub use stats::{aggregate, aggregate_nodes, aggregate_with, AlertSummary, StatsDocument};
pub use task::{DbRp, TaskDefinition, TaskStatus, TaskType, Topic, TopicList};
pub use transport::{HttpTransport, Method, Transport, TransportRequest, TransportResponse};

use thiserror::Error;

/// Prefix shared by every error raised when a task's stats carry no alert node.
pub const NO_ALERT_NODE_PREFIX: &str = "kapacitor.status: expected alert";

#[derive(Debug, Error)]
pub enum Error {
    #[error("kapacitor.{operation}: request to {target} failed: {message}")]
    Transport {
        operation: Operation,
        target: String,
        message: String,
    },
    #[error("kapacitor.{operation}: {target} answered {actual}, expected {expected}: {body}")]
    UnexpectedStatus {
        operation: Operation,
        target: String,
        expected: u16,
        actual: u16,
        body: String,
    },
    #[error("kapacitor.{operation}: failed to decode response from {target}: {source}")]
    Decoding {
        operation: Operation,
        target: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("kapacitor.status: expected alert node in task stats, found none among {node_count} node(s)")]
    Aggregation { node_count: usize },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    /// True for connection failures and non-success status codes.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::UnexpectedStatus { .. })
    }

    pub fn is_decoding(&self) -> bool {
        matches!(self, Error::Decoding { .. })
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, Error::Aggregation { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_message_has_fixed_prefix() {
        let err = Error::Aggregation { node_count: 0 };
        assert!(err.to_string().starts_with(NO_ALERT_NODE_PREFIX));
        assert!(err.is_aggregation());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let status = Error::UnexpectedStatus {
            operation: Operation::DeleteTask,
            target: "task_id".to_string(),
            expected: 204,
            actual: 404,
            body: String::new(),
        };
        assert!(status.is_transport());
        assert!(!status.is_decoding());
        assert_eq!(
            status.to_string(),
            "kapacitor.delete_task: task_id answered 404, expected 204: "
        );

        let decoding = Error::Decoding {
            operation: Operation::Status,
            target: "task_id".to_string(),
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert!(decoding.is_decoding());
        assert!(!decoding.is_transport());
        assert!(decoding.to_string().starts_with("kapacitor.status: failed to decode"));
    }
}
