//! HTTP transport seam
//!
//! The client never talks to `reqwest` directly; it hands a [`TransportRequest`]
//! to a [`Transport`] and interprets the status code and body it gets back.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    /// JSON payload, sent with `Content-Type: application/json`.
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn get(url: Url) -> Self {
        Self { method: Method::Get, url, body: None }
    }

    pub fn delete(url: Url) -> Self {
        Self { method: Method::Delete, url, body: None }
    }

    pub fn post_json(url: Url, body: Vec<u8>) -> Self {
        Self { method: Method::Post, url, body: Some(body) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues a single HTTP request and returns the raw status and body.
///
/// Any status code is a successful exchange; only failures to complete the
/// exchange (connection errors, timeouts) are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client, timeout: None }
    }

    /// Set a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self.client.request(request.method.into(), request.url);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kapacitor/v1/tasks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":\"t1\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let response = HttpTransport::new()
            .send(TransportRequest::get(url(&server, "/kapacitor/v1/tasks/t1")))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), "{\"id\":\"t1\"}");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/kapacitor/v1/tasks"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "id": "t1" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let body = serde_json::to_vec(&json!({ "id": "t1" })).unwrap();
        let response = HttpTransport::new()
            .send(TransportRequest::post_json(url(&server, "/kapacitor/v1/tasks"), body))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such task"))
            .mount(&server)
            .await;

        let response = HttpTransport::new()
            .send(TransportRequest::delete(url(&server, "/kapacitor/v1/tasks/missing")))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body_text(), "no such task");
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().with_timeout(Duration::from_millis(50));
        let result = transport
            .send(TransportRequest::get(url(&server, "/kapacitor/v1/alerts/topics")))
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(Method::Delete), reqwest::Method::DELETE);
        assert_eq!(Method::Post.to_string(), "POST");
    }
}
