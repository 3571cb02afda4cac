//! Wire types for the telemetry API.
//!
//! These types match the JSON served by the telemetry endpoints field for
//! field (`startTime`, `endTime`, `type`, ...). They are deliberately lenient:
//! every optional field defaults, and numeric durations accept integers or
//! floats. Conversion into typed domain records happens in [`crate::data`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::data::MetricsSummary;

/// Response of `GET /api/telemetry/{agent,monitor}-flows`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowsEnvelope {
    /// Individual records are decoded one by one so a single bad record
    /// does not discard the batch.
    #[serde(default, deserialize_with = "nullable")]
    pub flows: Vec<Value>,
}

/// Response of `GET /api/telemetry/traces`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TracesEnvelope {
    #[serde(default, deserialize_with = "nullable")]
    pub traces: Vec<Value>,
    /// Whether the backend records traces at all. Absent on older backends.
    #[serde(default)]
    pub traces_enabled: Option<bool>,
}

/// Response of `GET /api/telemetry/traces/<trace_id>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceEnvelope {
    #[serde(default)]
    pub trace: Option<Value>,
}

/// A flow record as served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFlow {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub flow_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", default)]
    pub end_time: Option<String>,
    /// Milliseconds.
    #[serde(default, deserialize_with = "lenient_millis")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub tools: Vec<RawToolCall>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub tokens: RawTokens,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<RawInsights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One tool invocation inside a flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Number of commands in a batch invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTokens {
    #[serde(default, deserialize_with = "nullable")]
    pub input: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub output: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInsights {
    #[serde(default, deserialize_with = "nullable")]
    pub anomalies: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub warnings: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub recommendations: u64,
}

/// A trace record as served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrace {
    #[serde(default, deserialize_with = "nullable")]
    pub trace_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub flow_id: String,
    #[serde(rename = "type", default)]
    pub trace_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub duration: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub spans: Vec<RawSpan>,
    #[serde(default, deserialize_with = "nullable")]
    pub metadata: Map<String, Value>,
}

/// A span record nested in a trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(default, deserialize_with = "nullable")]
    pub span_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub metadata: Map<String, Value>,
}

/// A saved view of the current snapshot.
///
/// Written by the export action and readable by [`super::FileSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub exported_at: String,
    pub metrics: MetricsSummary,
    #[serde(default, deserialize_with = "nullable")]
    pub agent_flows: Vec<RawFlow>,
    #[serde(default, deserialize_with = "nullable")]
    pub monitor_flows: Vec<RawFlow>,
    #[serde(default, deserialize_with = "nullable")]
    pub traces: Vec<RawTrace>,
}

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept integer or float milliseconds; negative and non-finite values
/// are clamped or dropped.
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map(|v| v.max(0.0).round() as u64))
}
