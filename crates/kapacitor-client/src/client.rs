//! Kapacitor task client
//!
//! Thin orchestration over a [`Transport`]: every operation builds one
//! request, checks the status code and, for [`KapacitorClient::status`],
//! decodes the task stats and aggregates the alert counters.

use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::metrics::{record_request, Outcome};
use crate::stats::{aggregate_with, AlertSummary, StatsDocument, DEFAULT_ALERT_NODE_PREFIX};
use crate::task::{TaskDefinition, TopicList};
use crate::transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
use crate::{Error, Result};

const TASKS_PATH: [&str; 3] = ["kapacitor", "v1", "tasks"];
const TOPICS_PATH: [&str; 4] = ["kapacitor", "v1", "alerts", "topics"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    DeleteTask,
    ListTopics,
    DeleteTopic,
    Status,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Load => "load",
            Operation::DeleteTask => "delete_task",
            Operation::ListTopics => "list_topics",
            Operation::DeleteTopic => "delete_topic",
            Operation::Status => "status",
        }
    }

    /// Status code the service answers with on success.
    pub fn success_code(&self) -> u16 {
        match self {
            Operation::Load | Operation::ListTopics | Operation::Status => 200,
            Operation::DeleteTask | Operation::DeleteTopic => 204,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct KapacitorClient<T: Transport = HttpTransport> {
    host: Url,
    transport: T,
    alert_node_prefix: String,
}

impl KapacitorClient<HttpTransport> {
    pub fn new(host: &str) -> Result<Self> {
        Self::with_transport(host, HttpTransport::new())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport =
            HttpTransport::new().with_timeout(Duration::from_secs(config.timeout_secs));
        Ok(Self::with_transport(&config.host, transport)?
            .with_alert_node_prefix(config.alert_node_prefix.clone()))
    }
}

impl<T: Transport> KapacitorClient<T> {
    pub fn with_transport(host: &str, transport: T) -> Result<Self> {
        Ok(Self {
            host: parse_host(host)?,
            transport,
            alert_node_prefix: DEFAULT_ALERT_NODE_PREFIX.to_string(),
        })
    }

    /// Select alert nodes by a different name prefix.
    pub fn with_alert_node_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.alert_node_prefix = prefix.into();
        self
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn alert_node_prefix(&self) -> &str {
        &self.alert_node_prefix
    }

    /// Create a task from `definition`.
    #[instrument(skip(self, definition), fields(task = ?definition.id()))]
    pub async fn load(&self, definition: &TaskDefinition) -> Result<()> {
        let body = serde_json::to_vec(definition)?;
        let request = TransportRequest::post_json(self.url(&TASKS_PATH, None), body);
        let target = definition.id().unwrap_or("tasks");

        self.execute(Operation::Load, target, request).await?;
        record_request(Operation::Load, Outcome::Success);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let request = TransportRequest::delete(self.url(&TASKS_PATH, Some(id)));
        self.execute(Operation::DeleteTask, id, request).await?;
        record_request(Operation::DeleteTask, Outcome::Success);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_topic(&self, id: &str) -> Result<()> {
        let request = TransportRequest::delete(self.url(&TOPICS_PATH, Some(id)));
        self.execute(Operation::DeleteTopic, id, request).await?;
        record_request(Operation::DeleteTopic, Outcome::Success);
        Ok(())
    }

    /// Clear alert topics.
    ///
    /// Issues the topic listing request and succeeds when the service accepts
    /// it. Individual topics are not enumerated or deleted here; use
    /// [`Self::list_topics`] and [`Self::delete_topic`] for that.
    #[instrument(skip(self))]
    pub async fn delete_all_topics(&self) -> Result<()> {
        let request = TransportRequest::get(self.url(&TOPICS_PATH, None));
        self.execute(Operation::ListTopics, "topics", request).await?;
        record_request(Operation::ListTopics, Outcome::Success);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_topics(&self) -> Result<TopicList> {
        let request = TransportRequest::get(self.url(&TOPICS_PATH, None));
        let response = self.execute(Operation::ListTopics, "topics", request).await?;
        let topics: TopicList = self.decode(Operation::ListTopics, "topics", &response)?;
        record_request(Operation::ListTopics, Outcome::Success);
        Ok(topics)
    }

    /// Fetch a task's stats and sum the counters of its alert nodes.
    #[instrument(skip(self))]
    pub async fn status(&self, id: &str) -> Result<AlertSummary> {
        let request = TransportRequest::get(self.url(&TASKS_PATH, Some(id)));
        let response = self.execute(Operation::Status, id, request).await?;
        let doc: StatsDocument = self.decode(Operation::Status, id, &response)?;

        let prefix = self.alert_node_prefix.as_str();
        match aggregate_with(&doc, |name| name.starts_with(prefix)) {
            Ok(summary) => {
                record_request(Operation::Status, Outcome::Success);
                debug!(
                    crits = summary.crits_triggered,
                    warns = summary.warns_triggered,
                    oks = summary.oks_triggered,
                    "Aggregated alert status"
                );
                Ok(summary)
            }
            Err(e) if e.is_aggregation() => {
                record_request(Operation::Status, Outcome::AggregationError);
                warn!("Task {} has no alert node: {}", id, e);
                Err(e)
            }
            Err(e) => {
                record_request(Operation::Status, Outcome::DecodingError);
                warn!("Task {} has a malformed alert node: {}", id, e);
                Err(e)
            }
        }
    }

    fn url(&self, base: &[&str], id: Option<&str>) -> Url {
        let mut url = self.host.clone();
        // `parse_host` rejects hosts that cannot carry path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(base);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    /// Send `request` and require the operation's success code.
    async fn execute(
        &self,
        operation: Operation,
        target: &str,
        request: TransportRequest,
    ) -> Result<TransportResponse> {
        debug!("{} {}", request.method, request.url);

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                record_request(operation, Outcome::TransportError);
                warn!("kapacitor.{} request for {} failed: {:#}", operation, target, e);
                return Err(Error::Transport {
                    operation,
                    target: target.to_string(),
                    message: format!("{:#}", e),
                });
            }
        };

        let expected = operation.success_code();
        if response.status != expected {
            record_request(operation, Outcome::UnexpectedStatus);
            warn!(
                "kapacitor.{} for {} answered {}, expected {}",
                operation, target, response.status, expected
            );
            return Err(Error::UnexpectedStatus {
                operation,
                target: target.to_string(),
                expected,
                actual: response.status,
                body: response.body_text(),
            });
        }

        Ok(response)
    }

    fn decode<D: DeserializeOwned>(
        &self,
        operation: Operation,
        target: &str,
        response: &TransportResponse,
    ) -> Result<D> {
        serde_json::from_slice(&response.body).map_err(|source| {
            record_request(operation, Outcome::DecodingError);
            warn!("kapacitor.{} response for {} did not decode: {}", operation, target, source);
            Error::Decoding {
                operation,
                target: target.to_string(),
                source,
            }
        })
    }
}

pub(crate) fn parse_host(host: &str) -> Result<Url> {
    let url = Url::parse(host).map_err(|e| Error::Config(format!("Invalid host {:?}: {}", host, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("Host {:?} cannot be used as a base URL", host)));
    }
    Ok(url)
}
