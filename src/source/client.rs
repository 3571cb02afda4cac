//! HTTP client for the telemetry API.
//!
//! ## Endpoints
//!
//! - `GET /api/telemetry/agent-flows` and `/monitor-flows` → `{ flows: [...] }`
//! - `GET /api/telemetry/traces?limit=<n>[&flow_type=<type>]` → `{ traces: [...] }`
//! - `GET /api/telemetry/traces/<trace_id>` → `{ trace: {...} | null }`
//!
//! A missing result field is an empty result, not an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::wire::{FlowsEnvelope, RawFlow, RawTrace, TraceEnvelope, TracesEnvelope};
use super::{TelemetrySource, TraceListing};
use crate::data::{Flow, Pipeline, Trace};
use crate::error::SourceError;

const API_PREFIX: &str = "/api/telemetry";

/// Telemetry API client.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    client: Client,
    base_url: String,
    description: String,
}

impl TelemetryClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> TelemetryClientBuilder {
        TelemetryClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn flows_url(&self, pipeline: Pipeline) -> String {
        let name = match pipeline {
            Pipeline::Agent => "agent-flows",
            Pipeline::Monitor => "monitor-flows",
        };
        format!("{}{}/{}", self.base_url, API_PREFIX, name)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, SourceError> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .query(query)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

#[async_trait]
impl TelemetrySource for TelemetryClient {
    async fn fetch_flows(&self, pipeline: Pipeline) -> Result<Vec<Flow>, SourceError> {
        let url = self.flows_url(pipeline);
        let envelope: FlowsEnvelope = self
            .get(&url, &[])
            .await?
            .ok_or(SourceError::Status(StatusCode::NOT_FOUND.as_u16()))?;
        Ok(decode_flows(envelope.flows, pipeline))
    }

    async fn fetch_traces(
        &self,
        limit: usize,
        filter: Option<Pipeline>,
    ) -> Result<TraceListing, SourceError> {
        let url = format!("{}{}/traces", self.base_url, API_PREFIX);
        let mut query = vec![("limit", limit.to_string())];
        if let Some(pipeline) = filter {
            query.push(("flow_type", pipeline.as_str().to_string()));
        }
        let envelope: TracesEnvelope = self
            .get(&url, &query)
            .await?
            .ok_or(SourceError::Status(StatusCode::NOT_FOUND.as_u16()))?;
        Ok(TraceListing {
            traces: decode_traces(envelope.traces),
            traces_enabled: envelope.traces_enabled,
        })
    }

    async fn fetch_trace_by_id(&self, trace_id: &str) -> Result<Option<Trace>, SourceError> {
        let url = format!(
            "{}{}/traces/{}",
            self.base_url,
            API_PREFIX,
            urlencoded(trace_id)
        );
        let Some(envelope) = self.get::<TraceEnvelope>(&url, &[]).await? else {
            return Ok(None);
        };
        Ok(envelope
            .trace
            .and_then(|value| decode_traces(vec![value]).into_iter().next()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`TelemetryClient`].
#[derive(Debug, Default)]
pub struct TelemetryClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl TelemetryClientBuilder {
    /// Set the API origin (default: "http://localhost:8000").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<TelemetryClient, SourceError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder().timeout(timeout).build()?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(TelemetryClient {
            client,
            description: format!("api: {}", base_url),
            base_url,
        })
    }
}

/// Normalize flow records one by one, skipping those that fail.
pub(crate) fn decode_flows(values: Vec<Value>, pipeline: Pipeline) -> Vec<Flow> {
    values
        .into_iter()
        .filter_map(|value| {
            let raw: RawFlow = serde_json::from_value(value)
                .map_err(|e| tracing::warn!(%pipeline, error = %e, "skipping malformed flow"))
                .ok()?;
            let id = raw.id.clone();
            Flow::from_raw(raw, pipeline)
                .map_err(|e| tracing::warn!(%pipeline, id = %id, error = %e, "skipping flow"))
                .ok()
        })
        .collect()
}

/// Normalize trace records one by one, skipping those that fail.
pub(crate) fn decode_traces(values: Vec<Value>) -> Vec<Trace> {
    values
        .into_iter()
        .filter_map(|value| {
            let raw: RawTrace = serde_json::from_value(value)
                .map_err(|e| tracing::warn!(error = %e, "skipping malformed trace"))
                .ok()?;
            let id = raw.trace_id.clone();
            Trace::from_raw(raw)
                .map_err(|e| tracing::warn!(id = %id, error = %e, "skipping trace"))
                .ok()
        })
        .collect()
}

// Escape path separators in ids used as path segments
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25").replace('/', "%2F").replace('?', "%3F").replace('#', "%23")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TelemetryClient {
        TelemetryClient::builder().base_url(server.uri()).build().unwrap()
    }

    fn agent_flow_json(id: &str, start: &str) -> Value {
        json!({
            "id": id,
            "type": "agent_analysis",
            "status": "completed",
            "startTime": start,
            "endTime": "2025-01-01T12:10:00",
            "duration": 20000,
            "request": "check pods",
            "tools": [{"name": "execute_bash", "command": "kubectl get pods", "duration": 1000}],
            "model": "us.anthropic.claude-3-5-haiku-20241022-v1:0",
            "tokens": {"input": 100, "output": 50},
            "metadata": {"scope": "cluster"},
            "trace_id": format!("mock-trace-{}", id)
        })
    }

    fn trace_json(id: &str) -> Value {
        json!({
            "trace_id": id,
            "flow_id": "flow-1",
            "type": "agent_analysis",
            "status": "success",
            "name": "agent_analysis_flow-1",
            "startTime": "2025-01-01T12:00:00",
            "endTime": "2025-01-01T12:00:10",
            "duration": 10000,
            "spans": [{"span_id": "s1", "name": "initialization", "status": "success", "duration": 500}],
            "metadata": {}
        })
    }

    #[test]
    fn test_builder_defaults() {
        let client = TelemetryClient::builder().build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.description(), "api: http://localhost:8000");
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = TelemetryClient::builder()
            .base_url("http://telemetry.local:8000/")
            .build()
            .unwrap();
        assert_eq!(
            client.flows_url(Pipeline::Monitor),
            "http://telemetry.local:8000/api/telemetry/monitor-flows"
        );
    }

    #[test]
    fn test_urlencoded() {
        assert_eq!(urlencoded("mock-trace-1"), "mock-trace-1");
        assert_eq!(urlencoded("a/b"), "a%2Fb");
    }

    #[tokio::test]
    async fn test_fetch_flows_decodes_and_skips_bad_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/agent-flows"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "flows": [
                    agent_flow_json("flow-1", "2025-01-01T12:00:00"),
                    {"id": "broken", "type": "agent_analysis", "startTime": "not a time"},
                    "not an object"
                ],
                "count": 3
            })))
            .mount(&server)
            .await;

        let flows = client_for(&server).fetch_flows(Pipeline::Agent).await.unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].id, "flow-1");
        assert_eq!(flows[0].trace_id.as_deref(), Some("mock-trace-flow-1"));
    }

    #[tokio::test]
    async fn test_fetch_flows_skips_records_of_other_pipeline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/agent-flows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flows": [
                    agent_flow_json("flow-1", "2025-01-01T12:00:00"),
                    {"id": "monitor-cycle-2", "type": "background_monitor", "status": "completed",
                     "startTime": "2025-01-01T12:05:00", "cycle": 2},
                    {"id": "flow-untyped", "status": "running", "startTime": "2025-01-01T12:06:00"}
                ]
            })))
            .mount(&server)
            .await;

        let flows = client_for(&server).fetch_flows(Pipeline::Agent).await.unwrap();
        let ids: Vec<_> = flows.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["flow-1", "flow-untyped"]);
        assert!(flows.iter().all(|f| f.pipeline() == Pipeline::Agent));
    }

    #[tokio::test]
    async fn test_missing_flows_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/monitor-flows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .mount(&server)
            .await;

        let flows = client_for(&server).fetch_flows(Pipeline::Monitor).await.unwrap();
        assert!(flows.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/agent-flows"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_flows(Pipeline::Agent).await.unwrap_err();
        assert!(matches!(err, SourceError::Status(500)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/agent-flows"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_flows(Pipeline::Agent).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_traces_sends_limit_and_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/traces"))
            .and(query_param("limit", "25"))
            .and(query_param("flow_type", "agent_analysis"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"traces": [trace_json("t-1")]})),
            )
            .mount(&server)
            .await;

        let traces = client_for(&server)
            .fetch_traces(25, Some(Pipeline::Agent))
            .await
            .unwrap();
        assert_eq!(traces.traces.len(), 1);
        assert_eq!(traces.traces[0].spans.len(), 1);
        assert_eq!(traces.traces[0].pipeline, Some(Pipeline::Agent));
        assert_eq!(traces.traces_enabled, None);
    }

    #[tokio::test]
    async fn test_fetch_traces_reports_tracing_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/traces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "traces": [],
                "count": 0,
                "traces_enabled": false
            })))
            .mount(&server)
            .await;

        let listing = client_for(&server).fetch_traces(50, None).await.unwrap();
        assert!(listing.traces.is_empty());
        assert_eq!(listing.traces_enabled, Some(false));
    }

    #[tokio::test]
    async fn test_fetch_trace_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/traces/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trace": trace_json("t-1")})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/telemetry/traces/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Trace not found"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let trace = client.fetch_trace_by_id("t-1").await.unwrap().unwrap();
        assert_eq!(trace.trace_id, "t-1");
        assert!(client.fetch_trace_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        let client = TelemetryClient::builder()
            .base_url("http://127.0.0.1:1")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        assert!(client.fetch_flows(Pipeline::Agent).await.is_err());
    }
}
