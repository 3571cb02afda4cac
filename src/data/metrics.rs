//! Aggregate statistics over the loaded snapshot.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::format::format_duration;
use super::model::{Flow, FlowStatus, Pipeline};
use super::store::FlowStore;

/// Summary statistics recomputed after every reload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowMetrics {
    /// Agent plus monitor flows.
    pub total_flows: usize,
    /// Number of pipeline kinds being observed.
    pub active_pipelines: usize,
    /// Mean duration over all loaded flows, zero when there are none.
    pub avg_duration: Duration,
    /// Completed flows as a percentage of all flows, zero when there are none.
    pub success_rate: f64,
    pub total_traces: usize,
}

impl FlowMetrics {
    /// Compute metrics for the current store contents.
    pub fn compute(store: &FlowStore) -> Self {
        let mut metrics = Self::from_flows(store.agent_flows().iter().chain(store.monitor_flows()));
        metrics.total_traces = store.traces().len();
        metrics
    }

    /// Compute flow statistics over an arbitrary set of flows.
    pub fn from_flows<'a>(flows: impl IntoIterator<Item = &'a Flow>) -> Self {
        let mut total = 0usize;
        let mut completed = 0usize;
        let mut total_ms: u128 = 0;

        for flow in flows {
            total += 1;
            total_ms += flow.duration.as_millis();
            if flow.status == FlowStatus::Completed {
                completed += 1;
            }
        }

        let (avg_duration, success_rate) = if total == 0 {
            (Duration::ZERO, 0.0)
        } else {
            (
                Duration::from_millis((total_ms / total as u128) as u64),
                completed as f64 * 100.0 / total as f64,
            )
        };

        Self {
            total_flows: total,
            active_pipelines: Pipeline::ALL.len(),
            avg_duration,
            success_rate,
            total_traces: 0,
        }
    }

    pub fn avg_duration_label(&self) -> String {
        format_duration(self.avg_duration)
    }

    /// Success rate with one decimal place, e.g. "50.0%".
    pub fn success_rate_label(&self) -> String {
        format!("{:.1}%", self.success_rate)
    }

    /// Serializable form embedded in export documents.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_flows: self.total_flows,
            active_pipelines: self.active_pipelines,
            avg_duration: self.avg_duration_label(),
            avg_duration_ms: self.avg_duration.as_millis() as u64,
            success_rate: self.success_rate_label(),
            total_traces: self.total_traces,
        }
    }
}

/// The metrics block of an export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_flows: usize,
    pub active_pipelines: usize,
    pub avg_duration: String,
    #[serde(default)]
    pub avg_duration_ms: u64,
    pub success_rate: String,
    pub total_traces: usize,
}
