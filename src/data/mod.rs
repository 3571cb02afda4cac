//! Domain model and processing for telemetry snapshots.
//!
//! This module turns wire records into typed flows and traces, holds the
//! latest poll, and derives everything the renderer needs from it.
//!
//! ## Submodules
//!
//! - [`format`]: Duration and timestamp parsing/formatting ("1.5s", "2m ago")
//! - [`model`]: Core records ([`Flow`], [`Trace`], [`Span`]) and their normalization
//! - [`store`]: The [`FlowStore`] holding the current lists and selections
//! - [`metrics`]: Aggregate statistics ([`FlowMetrics`])
//! - [`synthetic`]: Placeholder flows used when the endpoints are unavailable
//! - [`export`]: JSON export of the current snapshot
//!
//! ## Data Flow
//!
//! ```text
//! RawFlow / RawTrace (JSON)
//!        │
//!        ▼
//! Flow::from_raw() / Trace::from_raw()
//!        │
//!        ▼
//! FlowStore::replace_flows() / replace_traces()
//!        │
//!        ├──▶ FlowMetrics::compute()
//!        │
//!        └──▶ ui::projection (timeline items, detail panel)
//! ```

pub mod export;
pub mod format;
pub mod metrics;
pub mod model;
pub mod store;
pub mod synthetic;

pub use metrics::{FlowMetrics, MetricsSummary};
pub use model::{
    Flow, FlowPayload, FlowStatus, Insights, Pipeline, RecordError, Span, TokenUsage, ToolAction,
    ToolCall, Trace, TraceStatus,
};
pub use store::{FlowSelection, FlowStore};
