//! Facade over a [`TelemetrySource`] that never fails.
//!
//! Errors are logged here and folded into "unavailable": synthetic flows,
//! an empty trace list, or a trace that is not found.

use std::sync::Arc;

use super::flow_source::{FallbackFlowSource, FlowBatch};
use super::TelemetrySource;
use crate::data::{Pipeline, Trace};

/// Trace list result. `available` is false when the fetch failed.
#[derive(Debug, Clone, Default)]
pub struct TraceBatch {
    pub traces: Vec<Trace>,
    pub available: bool,
    /// `Some(false)` when the backend answered but records no traces.
    pub traces_enabled: Option<bool>,
}

#[derive(Debug)]
pub struct Telemetry {
    source: Arc<dyn TelemetrySource>,
    flows: FallbackFlowSource,
}

impl Telemetry {
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self {
            flows: FallbackFlowSource::remote_or_synthetic(source.clone()),
            source,
        }
    }

    pub fn description(&self) -> &str {
        self.source.description()
    }

    pub async fn flows(&self, pipeline: Pipeline) -> FlowBatch {
        self.flows.fetch(pipeline).await
    }

    /// Fetch both pipelines concurrently. Returns (agent, monitor).
    pub async fn all_flows(&self) -> (FlowBatch, FlowBatch) {
        tokio::join!(self.flows(Pipeline::Agent), self.flows(Pipeline::Monitor))
    }

    pub async fn traces(&self, limit: usize, filter: Option<Pipeline>) -> TraceBatch {
        match self.source.fetch_traces(limit, filter).await {
            Ok(listing) => {
                if listing.traces_enabled == Some(false) {
                    tracing::debug!("backend reports tracing disabled");
                }
                TraceBatch {
                    traces: listing.traces,
                    available: true,
                    traces_enabled: listing.traces_enabled,
                }
            }
            Err(err) => {
                tracing::warn!(limit, ?filter, error = %err, "traces unavailable");
                TraceBatch::default()
            }
        }
    }

    /// Resolve a trace by id; unavailable and unknown ids are both `None`.
    pub async fn trace(&self, trace_id: &str) -> Option<Trace> {
        match self.source.fetch_trace_by_id(trace_id).await {
            Ok(Some(trace)) => Some(trace),
            Ok(None) => {
                tracing::info!(trace_id, "trace not found");
                None
            }
            Err(err) => {
                tracing::warn!(trace_id, error = %err, "trace lookup failed");
                None
            }
        }
    }
}
