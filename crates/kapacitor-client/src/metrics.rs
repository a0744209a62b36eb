use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec_with_registry, Encoder, IntCounterVec, Registry, TextEncoder};

use crate::client::Operation;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REQUESTS_TOTAL: IntCounterVec =
        register_int_counter_vec_with_registry!(
            "kapacitor_client_requests_total",
            "Total number of Kapacitor requests by operation and outcome.",
            &["operation", "outcome"],
            REGISTRY
        ).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    UnexpectedStatus,
    TransportError,
    DecodingError,
    AggregationError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::UnexpectedStatus => "unexpected_status",
            Outcome::TransportError => "transport_error",
            Outcome::DecodingError => "decoding_error",
            Outcome::AggregationError => "aggregation_error",
        }
    }
}

pub fn record_request(operation: Operation, outcome: Outcome) {
    REQUESTS_TOTAL
        .with_label_values(&[operation.as_str(), outcome.as_str()])
        .inc();
}

pub fn request_count(operation: Operation, outcome: Outcome) -> u64 {
    REQUESTS_TOTAL
        .with_label_values(&[operation.as_str(), outcome.as_str()])
        .get()
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> String {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request_increments_counter() {
        let before = request_count(Operation::DeleteTopic, Outcome::UnexpectedStatus);
        record_request(Operation::DeleteTopic, Outcome::UnexpectedStatus);
        assert_eq!(
            request_count(Operation::DeleteTopic, Outcome::UnexpectedStatus),
            before + 1
        );
    }

    #[test]
    fn test_gather_metrics_exposes_counter() {
        record_request(Operation::ListTopics, Outcome::Success);
        let text = gather_metrics();
        assert!(text.contains("kapacitor_client_requests_total"));
        assert!(text.contains("operation=\"list_topics\""));
    }
}
