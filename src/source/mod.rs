//! Telemetry source abstraction.
//!
//! This module provides a trait-based abstraction for reading flows and
//! traces from various backends: the live HTTP API, or a previously
//! exported document replayed from disk. On top of it sit the
//! [`FlowSource`] capability, with its try-remote-else-synthetic policy,
//! and the [`Telemetry`] facade that folds every failure into an
//! "unavailable" outcome.

mod client;
mod file;
mod flow_source;
mod telemetry;
mod wire;

pub use client::{TelemetryClient, TelemetryClientBuilder};
pub use file::FileSource;
pub use flow_source::{
    FallbackFlowSource, FlowBatch, FlowSource, Origin, RemoteFlowSource, SyntheticFlowSource,
};
pub use telemetry::{Telemetry, TraceBatch};
pub use wire::{
    ExportDocument, FlowsEnvelope, RawFlow, RawInsights, RawSpan, RawTokens, RawToolCall,
    RawTrace, TraceEnvelope, TracesEnvelope,
};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::data::{Flow, Pipeline, Trace};
use crate::error::SourceError;

/// A trace list as returned by a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceListing {
    pub traces: Vec<Trace>,
    /// `Some(false)` when the backend reports tracing as switched off.
    pub traces_enabled: Option<bool>,
}

impl From<Vec<Trace>> for TraceListing {
    fn from(traces: Vec<Trace>) -> Self {
        Self {
            traces,
            traces_enabled: None,
        }
    }
}

/// Trait for reading telemetry from a backend.
///
/// Implementations return normalized records. Records that fail to
/// normalize are skipped, so one bad record never discards a batch.
///
/// # Example
///
/// ```no_run
/// use flowwatch::{Pipeline, TelemetryClient, TelemetrySource};
///
/// # tokio_test::block_on(async {
/// let client = TelemetryClient::builder()
///     .base_url("http://localhost:8000")
///     .build()
///     .unwrap();
/// let flows = client.fetch_flows(Pipeline::Agent).await.unwrap();
/// println!("{} agent flows", flows.len());
/// # });
/// ```
#[async_trait]
pub trait TelemetrySource: Send + Sync + Debug {
    /// Fetch the flow list of one pipeline.
    async fn fetch_flows(&self, pipeline: Pipeline) -> Result<Vec<Flow>, SourceError>;

    /// Fetch up to `limit` traces, optionally restricted to one pipeline.
    async fn fetch_traces(
        &self,
        limit: usize,
        filter: Option<Pipeline>,
    ) -> Result<TraceListing, SourceError>;

    /// Fetch a single trace. `Ok(None)` means the id does not resolve.
    async fn fetch_trace_by_id(&self, trace_id: &str) -> Result<Option<Trace>, SourceError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI header.
    fn description(&self) -> &str;
}
