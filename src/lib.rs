//! # flowwatch
//!
//! A terminal visualizer and library for agent and background-monitor
//! telemetry.
//!
//! This crate polls a telemetry HTTP API for the two flow pipelines (agent
//! flows and monitor flows) and for traces, keeps the latest snapshot in
//! memory, aggregates a few headline metrics, and renders everything as an
//! interactive timeline with a flow → trace → span drill-down. When the flow
//! endpoints are unreachable it fills the timelines with synthetic flows so
//! the UI stays populated.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Application                            │
//! │  ┌───────────┐    ┌──────────┐    ┌─────────────┐   ┌──────────┐ │
//! │  │ scheduler │───▶│   app    │───▶│     ui      │──▶│ Terminal │ │
//! │  │  (ticks)  │    │ (state)  │    │ projection  │   │          │ │
//! │  └───────────┘    └────┬─────┘    │   + paint   │   └──────────┘ │
//! │                        │          └─────────────┘                │
//! │                        ▼                                         │
//! │  ┌──────────────────────────────┐    ┌─────────┐                 │
//! │  │ source::Telemetry            │───▶│  data   │                 │
//! │  │ TelemetryClient | FileSource │    │ (store) │                 │
//! │  │ + synthetic fallback         │    └─────────┘                 │
//! │  └──────────────────────────────┘                                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, view state machine, detail navigation
//! - **[`source`]**: The [`TelemetrySource`] trait, the HTTP client, the
//!   replay file source, and the flow fallback chain
//! - **[`data`]**: Flow and trace models, the [`FlowStore`], metrics, synthetic
//!   data, and JSON export
//! - **[`scheduler`]**: The single auto-refresh timer
//! - **[`ui`]**: Pure render models plus ratatui painting
//! - **[`config`]**: Layered settings (defaults, file, environment, CLI)
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a local telemetry API
//! flowwatch --base-url http://localhost:8000
//!
//! # Replay a previous export
//! flowwatch --file flow-telemetry-2024-05-01.json
//!
//! # Fetch once and write an export
//! flowwatch --export snapshot.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowwatch::{FlowStore, Pipeline, Telemetry, TelemetryClient};
//!
//! # tokio_test::block_on(async {
//! let client = TelemetryClient::builder()
//!     .base_url("http://localhost:8000")
//!     .build()?;
//! let telemetry = Telemetry::new(Arc::new(client));
//!
//! let (agent, monitor) = telemetry.all_flows().await;
//! let mut store = FlowStore::new();
//! store.replace_flows(agent.flows, monitor.flows);
//! println!("{} agent flows", store.flows(Pipeline::Agent).len());
//! # Ok::<_, flowwatch::SourceError>(())
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, Detail, LoadStatus, View};
pub use config::{Overrides, Settings};
pub use data::{Flow, FlowMetrics, FlowStatus, FlowStore, Pipeline, Span, Trace, TraceStatus};
pub use error::SourceError;
pub use scheduler::RefreshScheduler;
pub use source::{
    ExportDocument, FileSource, FlowBatch, Origin, Telemetry, TelemetryClient, TelemetrySource,
    TraceBatch, TraceListing,
};
