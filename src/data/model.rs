//! Flow, trace and span records.
//!
//! This module turns lenient wire records into typed domain records. Flows
//! and traces are read-only once normalized; the store replaces them
//! wholesale on every poll.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::format::parse_timestamp;
use crate::source::{RawFlow, RawInsights, RawSpan, RawTokens, RawToolCall, RawTrace};

/// The two monitored execution pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pipeline {
    /// Interactive agent analysis requests.
    Agent,
    /// Recurring background monitor cycles.
    Monitor,
}

impl Pipeline {
    pub const ALL: [Pipeline; 2] = [Pipeline::Agent, Pipeline::Monitor];

    /// Wire name, also used as the `flow_type` query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Agent => "agent_analysis",
            Pipeline::Monitor => "background_monitor",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "agent_analysis" => Some(Pipeline::Agent),
            "background_monitor" => Some(Pipeline::Monitor),
            _ => None,
        }
    }

    /// Short display label.
    pub fn label(&self) -> &'static str {
        match self {
            Pipeline::Agent => "Agent",
            Pipeline::Monitor => "Monitor",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a flow.
///
/// Agent flows use `Completed | Error`, monitor flows `Completed | Timeout`.
/// Live data may also report flows that are still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    Completed,
    Error,
    Timeout,
    Running,
    Unknown(String),
}

impl FlowStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => FlowStatus::Completed,
            "error" => FlowStatus::Error,
            "timeout" => FlowStatus::Timeout,
            "running" => FlowStatus::Running,
            other => FlowStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FlowStatus::Completed => "completed",
            FlowStatus::Error => "error",
            FlowStatus::Timeout => "timeout",
            FlowStatus::Running => "running",
            FlowStatus::Unknown(s) => s,
        }
    }
}

/// Outcome of a trace or span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStatus {
    Success,
    Error,
    Unknown(String),
}

impl TraceStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" | "completed" => TraceStatus::Success,
            "error" => TraceStatus::Error,
            other => TraceStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TraceStatus::Success => "success",
            TraceStatus::Error => "error",
            TraceStatus::Unknown(s) => s,
        }
    }
}

/// Token usage of a model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// Insight counts produced by a monitor cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Insights {
    pub anomalies: u64,
    pub warnings: u64,
    pub recommendations: u64,
}

/// What a tool invocation operated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    /// A single shell command.
    Command(String),
    /// A batch of commands, by count.
    Batch(u64),
    /// A file path.
    File(String),
    None,
}

/// One tool invocation within a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub action: ToolAction,
    pub duration: Duration,
}

impl ToolCall {
    /// Human-readable summary of the invocation target.
    pub fn describe(&self) -> String {
        match &self.action {
            ToolAction::Command(cmd) => cmd.clone(),
            ToolAction::Batch(1) => "1 command".to_string(),
            ToolAction::Batch(n) => format!("{} commands", n),
            ToolAction::File(path) => path.clone(),
            ToolAction::None => String::new(),
        }
    }
}

/// Pipeline-specific part of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowPayload {
    Agent {
        request: String,
        scope: String,
        namespace: Option<String>,
    },
    Monitor {
        cycle: u64,
        insights: Insights,
    },
}

/// One execution of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub status: FlowStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Never negative; zero while a flow is still running.
    pub duration: Duration,
    /// Weak reference to a [`Trace`], resolved on demand.
    pub trace_id: Option<String>,
    pub model: String,
    pub tokens: TokenUsage,
    pub tools: Vec<ToolCall>,
    pub error: Option<String>,
    pub payload: FlowPayload,
}

/// A detailed execution record, optionally linked from a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub trace_id: String,
    pub flow_id: String,
    pub pipeline: Option<Pipeline>,
    pub status: TraceStatus,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Duration,
    /// Execution order, not necessarily sorted by time.
    pub spans: Vec<Span>,
    pub metadata: Map<String, Value>,
}

/// One unit of work inside a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub span_id: String,
    pub name: String,
    pub status: TraceStatus,
    pub duration: Option<Duration>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub metadata: Map<String, Value>,
}

/// Why a wire record could not be normalized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record has no id")]
    MissingId,
    #[error("unknown flow type: {0}")]
    UnknownType(String),
    #[error("unparseable start time: {0:?}")]
    BadTimestamp(Option<String>),
    #[error("{found} record served as {expected}")]
    WrongPipeline { expected: Pipeline, found: Pipeline },
}

impl Flow {
    /// Normalize a wire record.
    ///
    /// `expected` is the pipeline of the list the record was served in. It
    /// is assumed when the record carries no `type`, and a record typed as
    /// the other pipeline is rejected.
    pub fn from_raw(raw: RawFlow, expected: Pipeline) -> Result<Self, RecordError> {
        if raw.id.is_empty() {
            return Err(RecordError::MissingId);
        }
        let pipeline = if raw.flow_type.is_empty() {
            expected
        } else {
            Pipeline::parse(&raw.flow_type)
                .ok_or_else(|| RecordError::UnknownType(raw.flow_type.clone()))?
        };
        if pipeline != expected {
            return Err(RecordError::WrongPipeline {
                expected,
                found: pipeline,
            });
        }
        let start_time = raw
            .start_time
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| RecordError::BadTimestamp(raw.start_time.clone()))?;
        let end_time = raw.end_time.as_deref().and_then(parse_timestamp);
        let duration = resolve_duration(raw.duration, start_time, end_time);

        let payload = match pipeline {
            Pipeline::Agent => {
                let metadata = raw.metadata.unwrap_or_default();
                FlowPayload::Agent {
                    request: raw.request.unwrap_or_default(),
                    scope: metadata
                        .get("scope")
                        .and_then(Value::as_str)
                        .unwrap_or("cluster")
                        .to_string(),
                    namespace: metadata
                        .get("namespace")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                }
            }
            Pipeline::Monitor => {
                let insights = raw.insights.unwrap_or_default();
                FlowPayload::Monitor {
                    cycle: raw.cycle.unwrap_or_default(),
                    insights: Insights {
                        anomalies: insights.anomalies,
                        warnings: insights.warnings,
                        recommendations: insights.recommendations,
                    },
                }
            }
        };

        Ok(Self {
            id: raw.id,
            status: FlowStatus::parse(&raw.status),
            start_time,
            end_time,
            duration,
            trace_id: raw.trace_id.filter(|id| !id.is_empty()),
            model: raw.model.unwrap_or_else(|| "unknown".to_string()),
            tokens: TokenUsage {
                input: raw.tokens.input,
                output: raw.tokens.output,
            },
            tools: raw.tools.into_iter().map(ToolCall::from_raw).collect(),
            error: raw.error,
            payload,
        })
    }

    /// Convert back into the wire shape (used for export).
    pub fn to_raw(&self) -> RawFlow {
        let mut raw = RawFlow {
            id: self.id.clone(),
            flow_type: self.pipeline().as_str().to_string(),
            status: self.status.as_str().to_string(),
            start_time: Some(format_wire_time(self.start_time)),
            end_time: self.end_time.map(format_wire_time),
            duration: Some(self.duration.as_millis() as u64),
            trace_id: self.trace_id.clone(),
            tools: self.tools.iter().map(ToolCall::to_raw).collect(),
            model: Some(self.model.clone()),
            tokens: RawTokens {
                input: self.tokens.input,
                output: self.tokens.output,
            },
            error: self.error.clone(),
            ..RawFlow::default()
        };
        match &self.payload {
            FlowPayload::Agent {
                request,
                scope,
                namespace,
            } => {
                let mut metadata = Map::new();
                metadata.insert("scope".to_string(), Value::String(scope.clone()));
                if let Some(ns) = namespace {
                    metadata.insert("namespace".to_string(), Value::String(ns.clone()));
                }
                raw.request = Some(request.clone());
                raw.metadata = Some(metadata);
            }
            FlowPayload::Monitor { cycle, insights } => {
                raw.cycle = Some(*cycle);
                raw.insights = Some(RawInsights {
                    anomalies: insights.anomalies,
                    warnings: insights.warnings,
                    recommendations: insights.recommendations,
                });
            }
        }
        raw
    }

    pub fn pipeline(&self) -> Pipeline {
        match self.payload {
            FlowPayload::Agent { .. } => Pipeline::Agent,
            FlowPayload::Monitor { .. } => Pipeline::Monitor,
        }
    }

    /// One-line title for timeline rows.
    pub fn title(&self) -> String {
        match &self.payload {
            FlowPayload::Agent { request, .. } if !request.is_empty() => request.clone(),
            FlowPayload::Agent { .. } => self.id.clone(),
            FlowPayload::Monitor { cycle, .. } => format!("Monitor cycle #{}", cycle),
        }
    }
}

impl ToolCall {
    fn from_raw(raw: RawToolCall) -> Self {
        let action = if let Some(cmd) = raw.command {
            ToolAction::Command(cmd)
        } else if let Some(n) = raw.commands {
            ToolAction::Batch(n)
        } else if let Some(path) = raw.file {
            ToolAction::File(path)
        } else {
            ToolAction::None
        };
        Self {
            name: raw.name,
            action,
            duration: Duration::from_millis(raw.duration.unwrap_or_default()),
        }
    }

    fn to_raw(&self) -> RawToolCall {
        let mut raw = RawToolCall {
            name: self.name.clone(),
            duration: Some(self.duration.as_millis() as u64),
            ..RawToolCall::default()
        };
        match &self.action {
            ToolAction::Command(cmd) => raw.command = Some(cmd.clone()),
            ToolAction::Batch(n) => raw.commands = Some(*n),
            ToolAction::File(path) => raw.file = Some(path.clone()),
            ToolAction::None => {}
        }
        raw
    }
}

impl Trace {
    pub fn from_raw(raw: RawTrace) -> Result<Self, RecordError> {
        if raw.trace_id.is_empty() {
            return Err(RecordError::MissingId);
        }
        let start_time = raw
            .start_time
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| RecordError::BadTimestamp(raw.start_time.clone()))?;
        let end_time = raw.end_time.as_deref().and_then(parse_timestamp);

        Ok(Self {
            duration: resolve_duration(raw.duration, start_time, end_time),
            trace_id: raw.trace_id,
            flow_id: raw.flow_id,
            pipeline: raw.trace_type.as_deref().and_then(Pipeline::parse),
            status: TraceStatus::parse(&raw.status),
            name: raw.name,
            start_time,
            end_time,
            spans: raw.spans.into_iter().map(Span::from_raw).collect(),
            metadata: raw.metadata,
        })
    }

    pub fn to_raw(&self) -> RawTrace {
        RawTrace {
            trace_id: self.trace_id.clone(),
            flow_id: self.flow_id.clone(),
            trace_type: self.pipeline.map(|p| p.as_str().to_string()),
            status: self.status.as_str().to_string(),
            name: self.name.clone(),
            start_time: Some(format_wire_time(self.start_time)),
            end_time: self.end_time.map(format_wire_time),
            duration: Some(self.duration.as_millis() as u64),
            spans: self.spans.iter().map(Span::to_raw).collect(),
            metadata: self.metadata.clone(),
        }
    }
}

impl Span {
    fn from_raw(raw: RawSpan) -> Self {
        Self {
            span_id: raw.span_id,
            name: raw.name,
            status: TraceStatus::parse(&raw.status),
            duration: raw.duration.map(Duration::from_millis),
            start_time: raw.start_time.as_deref().and_then(parse_timestamp),
            end_time: raw.end_time.as_deref().and_then(parse_timestamp),
            metadata: raw.metadata,
        }
    }

    fn to_raw(&self) -> RawSpan {
        RawSpan {
            span_id: self.span_id.clone(),
            name: self.name.clone(),
            status: self.status.as_str().to_string(),
            duration: self.duration.map(|d| d.as_millis() as u64),
            start_time: self.start_time.map(format_wire_time),
            end_time: self.end_time.map(format_wire_time),
            metadata: self.metadata.clone(),
        }
    }

    /// Reported duration, or the distance between the timestamps.
    pub fn effective_duration(&self) -> Option<Duration> {
        self.duration.or_else(|| match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        })
    }
}

/// Sort flows most recent first.
pub fn sort_recent_first(flows: &mut [Flow]) {
    flows.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));
}

fn resolve_duration(
    reported_ms: Option<u64>,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Duration {
    if let Some(ms) = reported_ms {
        return Duration::from_millis(ms);
    }
    // chrono -> std conversion fails for negative spans
    end.and_then(|end| (end - start).to_std().ok()).unwrap_or_default()
}

fn format_wire_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
