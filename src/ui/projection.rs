//! Pure projection from store state to render models.
//!
//! Nothing here touches the terminal. The paint modules turn these models
//! into widgets; the same snapshot always projects to the same model.

use serde_json::Value;

use crate::app::Detail;
use crate::data::format::{format_clock, format_duration};
use crate::data::{Flow, FlowPayload, FlowStatus, FlowStore, Span, ToolCall, Trace, TraceStatus};

/// Visual class of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Neutral,
    Error,
    Warning,
}

impl StatusClass {
    /// `completed`/`success` → neutral, `error`/`timeout` → error, else warning.
    pub fn from_status(status: &str) -> Self {
        match status {
            "completed" | "success" => StatusClass::Neutral,
            "error" | "timeout" => StatusClass::Error,
            _ => StatusClass::Warning,
        }
    }

    pub fn of_flow(status: &FlowStatus) -> Self {
        Self::from_status(status.as_str())
    }

    pub fn of_trace(status: &TraceStatus) -> Self {
        Self::from_status(status.as_str())
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            StatusClass::Neutral => "●",
            StatusClass::Error => "✖",
            StatusClass::Warning => "◐",
        }
    }
}

/// One row of a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    /// Flow id or trace id.
    pub key: String,
    pub time: String,
    pub title: String,
    pub subtitle: String,
    pub duration: String,
    pub status: String,
    pub class: StatusClass,
    /// Whether a trace can be opened from this item.
    pub linked: bool,
}

/// Timeline rows for a flow list, in list order.
pub fn flow_timeline(flows: &[Flow]) -> Vec<TimelineItem> {
    flows.iter().map(flow_item).collect()
}

fn flow_item(flow: &Flow) -> TimelineItem {
    let subtitle = match &flow.payload {
        FlowPayload::Agent { .. } => format!(
            "{} tools · {} tokens",
            flow.tools.len(),
            flow.tokens.total()
        ),
        FlowPayload::Monitor { insights, .. } => format!(
            "{} anomalies · {} warnings · {} recs",
            insights.anomalies, insights.warnings, insights.recommendations
        ),
    };
    TimelineItem {
        key: flow.id.clone(),
        time: format_clock(flow.start_time),
        title: flow.title(),
        subtitle,
        duration: flow_duration(flow),
        status: flow.status.as_str().to_string(),
        class: StatusClass::of_flow(&flow.status),
        linked: flow.trace_id.is_some(),
    }
}

/// Timeline rows for a trace list, in list order.
pub fn trace_timeline(traces: &[Trace]) -> Vec<TimelineItem> {
    traces
        .iter()
        .map(|trace| TimelineItem {
            key: trace.trace_id.clone(),
            time: format_clock(trace.start_time),
            title: trace.name.clone(),
            subtitle: format!(
                "{} · {} spans · flow {}",
                trace.pipeline.map(|p| p.label()).unwrap_or("?"),
                trace.spans.len(),
                trace.flow_id
            ),
            duration: format_duration(trace.duration),
            status: trace.status.as_str().to_string(),
            class: StatusClass::of_trace(&trace.status),
            linked: true,
        })
        .collect()
}

/// Title of the trace list panel.
pub fn trace_list_title(
    count: usize,
    filter: &str,
    limit: usize,
    traces_enabled: Option<bool>,
) -> String {
    let mut title = format!(" Traces ({}) │ filter: {} │ limit {} ", count, filter, limit);
    if traces_enabled == Some(false) {
        title.push_str("│ tracing disabled ");
    }
    title
}

/// A table inside a detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTable {
    pub title: String,
    pub header: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    /// Per-row class, used to color the status column.
    pub classes: Vec<StatusClass>,
}

/// Everything the detail overlay shows for one stack level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    pub title: String,
    pub class: StatusClass,
    pub fields: Vec<(&'static str, String)>,
    pub table: Option<DetailTable>,
    pub hint: &'static str,
}

/// Project the panel for `detail`, or `None` if its target is not selected.
pub fn detail_panel(store: &FlowStore, detail: Detail) -> Option<DetailPanel> {
    match detail {
        Detail::Flow => store.selected_flow().map(flow_panel),
        Detail::Trace => store.selected_trace().map(trace_panel),
        Detail::Span(index) => {
            let trace = store.selected_trace()?;
            trace.spans.get(index).map(|span| span_panel(trace, span))
        }
    }
}

fn flow_panel(flow: &Flow) -> DetailPanel {
    let mut fields = vec![
        ("ID", flow.id.clone()),
        ("Type", flow.pipeline().as_str().to_string()),
        ("Status", flow.status.as_str().to_string()),
        ("Started", flow.start_time.format("%Y-%m-%d %H:%M:%S").to_string()),
        (
            "Ended",
            flow.end_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Duration", flow_duration(flow)),
        ("Model", flow.model.clone()),
        (
            "Tokens",
            format!(
                "{} in / {} out ({} total)",
                flow.tokens.input,
                flow.tokens.output,
                flow.tokens.total()
            ),
        ),
    ];

    match &flow.payload {
        FlowPayload::Agent {
            request,
            scope,
            namespace,
        } => {
            fields.push(("Request", request.clone()));
            let scope = match namespace {
                Some(ns) => format!("{} ({})", scope, ns),
                None => scope.clone(),
            };
            fields.push(("Scope", scope));
        }
        FlowPayload::Monitor { cycle, insights } => {
            fields.push(("Cycle", format!("#{}", cycle)));
            fields.push((
                "Insights",
                format!(
                    "{} anomalies, {} warnings, {} recommendations",
                    insights.anomalies, insights.warnings, insights.recommendations
                ),
            ));
        }
    }

    fields.push((
        "Trace",
        flow.trace_id.clone().unwrap_or_else(|| "-".to_string()),
    ));
    if let Some(err) = &flow.error {
        fields.push(("Error", err.clone()));
    }

    let table = DetailTable {
        title: format!("Tools ({})", flow.tools.len()),
        header: vec!["Tool", "Target", "Duration"],
        rows: flow.tools.iter().map(tool_row).collect(),
        classes: vec![StatusClass::Neutral; flow.tools.len()],
    };

    DetailPanel {
        title: flow.title(),
        class: StatusClass::of_flow(&flow.status),
        fields,
        table: Some(table),
        hint: if flow.trace_id.is_some() {
            "t/Enter:open trace  Esc:back"
        } else {
            "Esc:back"
        },
    }
}

fn tool_row(tool: &ToolCall) -> Vec<String> {
    vec![
        tool.name.clone(),
        tool.describe(),
        format_duration(tool.duration),
    ]
}

fn trace_panel(trace: &Trace) -> DetailPanel {
    let mut fields = vec![
        ("Trace ID", trace.trace_id.clone()),
        ("Flow ID", trace.flow_id.clone()),
        (
            "Type",
            trace
                .pipeline
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Status", trace.status.as_str().to_string()),
        ("Started", trace.start_time.format("%Y-%m-%d %H:%M:%S").to_string()),
        ("Duration", format_duration(trace.duration)),
    ];
    fields.extend(metadata_fields(&trace.metadata));

    let table = DetailTable {
        title: format!("Spans ({})", trace.spans.len()),
        header: vec!["#", "Span", "Status", "Duration"],
        rows: trace
            .spans
            .iter()
            .enumerate()
            .map(|(i, span)| {
                vec![
                    (i + 1).to_string(),
                    span.name.clone(),
                    span.status.as_str().to_string(),
                    span_duration(span),
                ]
            })
            .collect(),
        classes: trace
            .spans
            .iter()
            .map(|s| StatusClass::of_trace(&s.status))
            .collect(),
    };

    DetailPanel {
        title: trace.name.clone(),
        class: StatusClass::of_trace(&trace.status),
        fields,
        table: Some(table),
        hint: "↑↓:select span  Enter:open  Esc:back",
    }
}

fn span_panel(trace: &Trace, span: &Span) -> DetailPanel {
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let mut fields = vec![
        ("Span ID", span.span_id.clone()),
        ("Trace", trace.trace_id.clone()),
        ("Status", span.status.as_str().to_string()),
        ("Duration", span_duration(span)),
        ("Start", time(span.start_time)),
        ("End", time(span.end_time)),
    ];
    fields.extend(metadata_fields(&span.metadata));

    DetailPanel {
        title: span.name.clone(),
        class: StatusClass::of_trace(&span.status),
        fields,
        table: None,
        hint: "Esc:back",
    }
}

fn metadata_fields(metadata: &serde_json::Map<String, Value>) -> Vec<(&'static str, String)> {
    if metadata.is_empty() {
        return Vec::new();
    }
    let joined = metadata
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect::<Vec<_>>()
        .join(", ");
    vec![("Metadata", joined)]
}

fn flow_duration(flow: &Flow) -> String {
    if flow.status == FlowStatus::Running {
        "running".to_string()
    } else {
        format_duration(flow.duration)
    }
}

fn span_duration(span: &Span) -> String {
    span.effective_duration()
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::generate_flows_with;
    use crate::data::Pipeline;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Map;
    use std::time::Duration;

    fn store() -> FlowStore {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut store = FlowStore::new();
        store.replace_flows(
            generate_flows_with(Pipeline::Agent, now, &mut rng),
            generate_flows_with(Pipeline::Monitor, now, &mut rng),
        );
        store
    }

    fn trace() -> Trace {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut metadata = Map::new();
        metadata.insert("component".to_string(), Value::String("agent_setup".to_string()));
        Trace {
            trace_id: "t-1".to_string(),
            flow_id: "flow-1".to_string(),
            pipeline: Some(Pipeline::Agent),
            status: TraceStatus::Error,
            name: "agent_analysis_flow-1".to_string(),
            start_time: start,
            end_time: None,
            duration: Duration::from_millis(1500),
            spans: vec![Span {
                span_id: "s-1".to_string(),
                name: "initialization".to_string(),
                status: TraceStatus::Success,
                duration: Some(Duration::from_millis(500)),
                start_time: Some(start),
                end_time: None,
                metadata,
            }],
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(StatusClass::of_flow(&FlowStatus::Completed), StatusClass::Neutral);
        assert_eq!(StatusClass::of_flow(&FlowStatus::Error), StatusClass::Error);
        assert_eq!(StatusClass::of_flow(&FlowStatus::Timeout), StatusClass::Error);
        assert_eq!(StatusClass::of_flow(&FlowStatus::Running), StatusClass::Warning);
        assert_eq!(StatusClass::from_status("queued"), StatusClass::Warning);
        assert_eq!(StatusClass::of_trace(&TraceStatus::Success), StatusClass::Neutral);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let store = store();
        assert_eq!(
            flow_timeline(store.agent_flows()),
            flow_timeline(store.agent_flows())
        );
        assert_eq!(
            flow_timeline(store.monitor_flows()),
            flow_timeline(store.monitor_flows())
        );

        let mut store = store;
        let id = store.agent_flows()[0].id.clone();
        store.select_flow(&id, Pipeline::Agent);
        assert_eq!(
            detail_panel(&store, Detail::Flow),
            detail_panel(&store, Detail::Flow)
        );
    }

    #[test]
    fn test_timeline_follows_list_order() {
        let store = store();
        let items = flow_timeline(store.monitor_flows());
        assert_eq!(items.len(), 8);
        for (item, flow) in items.iter().zip(store.monitor_flows()) {
            assert_eq!(item.key, flow.id);
            assert!(item.title.starts_with("Monitor cycle #"));
        }
    }

    #[test]
    fn test_trace_and_span_panels() {
        let mut store = FlowStore::new();
        assert!(detail_panel(&store, Detail::Trace).is_none());

        store.select_trace(trace());
        let panel = detail_panel(&store, Detail::Trace).unwrap();
        assert_eq!(panel.class, StatusClass::Error);
        let table = panel.table.unwrap();
        assert_eq!(table.rows[0], vec!["1", "initialization", "success", "500ms"]);

        let span = detail_panel(&store, Detail::Span(0)).unwrap();
        assert_eq!(span.title, "initialization");
        assert!(span
            .fields
            .contains(&("Metadata", "component=agent_setup".to_string())));
        assert!(detail_panel(&store, Detail::Span(3)).is_none());
    }

    #[test]
    fn test_trace_list_title_flags_disabled_tracing() {
        assert_eq!(
            trace_list_title(2, "all", 50, None),
            " Traces (2) │ filter: all │ limit 50 "
        );
        assert_eq!(
            trace_list_title(2, "all", 50, Some(true)),
            trace_list_title(2, "all", 50, None)
        );
        assert_eq!(
            trace_list_title(0, "agent_analysis", 50, Some(false)),
            " Traces (0) │ filter: agent_analysis │ limit 50 │ tracing disabled "
        );
    }

    #[test]
    fn test_trace_timeline_row() {
        let items = trace_timeline(&[trace()]);
        assert_eq!(items[0].duration, "1.5s");
        assert_eq!(items[0].subtitle, "Agent · 1 spans · flow flow-1");
        assert_eq!(items[0].time, "12:00:00");
    }
}
