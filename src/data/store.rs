//! In-memory holder of the latest poll.
//!
//! The store never merges: every successful reload replaces a whole list
//! and the previous snapshot is dropped. Selections survive a reload only
//! when the selected id is still present.

use chrono::{DateTime, Utc};

use super::model::{sort_recent_first, Flow, Pipeline, Trace};

/// Identifies the flow shown in the detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSelection {
    pub id: String,
    pub pipeline: Pipeline,
}

/// Current flow lists, trace list and detail selections.
#[derive(Debug, Clone, Default)]
pub struct FlowStore {
    agent: Vec<Flow>,
    monitor: Vec<Flow>,
    traces: Vec<Trace>,
    selected_flow: Option<FlowSelection>,
    /// Held by value: a trace opened from a flow link need not be in the list.
    selected_trace: Option<Trace>,
    last_updated: Option<DateTime<Utc>>,
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flows(&self, pipeline: Pipeline) -> &[Flow] {
        match pipeline {
            Pipeline::Agent => &self.agent,
            Pipeline::Monitor => &self.monitor,
        }
    }

    pub fn agent_flows(&self) -> &[Flow] {
        &self.agent
    }

    pub fn monitor_flows(&self) -> &[Flow] {
        &self.monitor
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Time of the last successful replace.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn is_empty(&self) -> bool {
        self.agent.is_empty() && self.monitor.is_empty() && self.traces.is_empty()
    }

    /// Replace both flow lists at once.
    ///
    /// Returns `true` if a flow selection was dropped because its id is
    /// no longer present.
    pub fn replace_flows(&mut self, mut agent: Vec<Flow>, mut monitor: Vec<Flow>) -> bool {
        sort_recent_first(&mut agent);
        sort_recent_first(&mut monitor);
        self.agent = agent;
        self.monitor = monitor;
        self.last_updated = Some(Utc::now());

        let stale = self
            .selected_flow
            .as_ref()
            .is_some_and(|sel| self.find_flow(&sel.id, sel.pipeline).is_none());
        if stale {
            self.selected_flow = None;
        }
        stale
    }

    /// Replace the trace list.
    ///
    /// Returns `true` if the trace selection was dropped.
    pub fn replace_traces(&mut self, traces: Vec<Trace>) -> bool {
        self.traces = traces;
        self.last_updated = Some(Utc::now());

        let stale = self
            .selected_trace
            .as_ref()
            .is_some_and(|sel| !self.traces.iter().any(|t| t.trace_id == sel.trace_id));
        if stale {
            self.selected_trace = None;
        }
        stale
    }

    pub fn find_flow(&self, id: &str, pipeline: Pipeline) -> Option<&Flow> {
        self.flows(pipeline).iter().find(|f| f.id == id)
    }

    pub fn find_trace(&self, trace_id: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.trace_id == trace_id)
    }

    /// Select a flow for the detail panel. Returns `false` if it is not loaded.
    pub fn select_flow(&mut self, id: &str, pipeline: Pipeline) -> bool {
        if self.find_flow(id, pipeline).is_none() {
            return false;
        }
        self.selected_flow = Some(FlowSelection {
            id: id.to_string(),
            pipeline,
        });
        true
    }

    /// Set the selected trace. The selected flow is left untouched.
    pub fn select_trace(&mut self, trace: Trace) {
        self.selected_trace = Some(trace);
    }

    pub fn selected_flow(&self) -> Option<&Flow> {
        let sel = self.selected_flow.as_ref()?;
        self.find_flow(&sel.id, sel.pipeline)
    }

    pub fn selected_flow_id(&self) -> Option<&FlowSelection> {
        self.selected_flow.as_ref()
    }

    pub fn selected_trace(&self) -> Option<&Trace> {
        self.selected_trace.as_ref()
    }

    pub fn clear_flow_selection(&mut self) {
        self.selected_flow = None;
    }

    pub fn clear_trace_selection(&mut self) {
        self.selected_trace = None;
    }

    /// Empty every list and selection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{FlowPayload, FlowStatus, TokenUsage, TraceStatus};
    use chrono::TimeZone;
    use serde_json::Map;
    use std::time::Duration;

    fn flow(id: &str, minute: u32) -> Flow {
        Flow {
            id: id.to_string(),
            status: FlowStatus::Completed,
            start_time: Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap(),
            end_time: None,
            duration: Duration::from_secs(20),
            trace_id: None,
            model: "m".to_string(),
            tokens: TokenUsage::default(),
            tools: Vec::new(),
            error: None,
            payload: FlowPayload::Agent {
                request: "req".to_string(),
                scope: "cluster".to_string(),
                namespace: None,
            },
        }
    }

    fn trace(id: &str) -> Trace {
        Trace {
            trace_id: id.to_string(),
            flow_id: "f".to_string(),
            pipeline: Some(Pipeline::Agent),
            status: TraceStatus::Success,
            name: id.to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            end_time: None,
            duration: Duration::from_secs(1),
            spans: Vec::new(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_replace_sorts_recent_first() {
        let mut store = FlowStore::new();
        store.replace_flows(vec![flow("old", 1), flow("new", 5)], Vec::new());
        assert_eq!(store.agent_flows()[0].id, "new");
        assert!(store.last_updated().is_some());
    }

    #[test]
    fn test_selection_survives_when_id_present() {
        let mut store = FlowStore::new();
        store.replace_flows(vec![flow("a", 1)], Vec::new());
        assert!(store.select_flow("a", Pipeline::Agent));

        let dropped = store.replace_flows(vec![flow("a", 1), flow("b", 2)], Vec::new());
        assert!(!dropped);
        assert_eq!(store.selected_flow().unwrap().id, "a");
    }

    #[test]
    fn test_stale_selection_dropped_silently() {
        let mut store = FlowStore::new();
        store.replace_flows(vec![flow("a", 1)], Vec::new());
        store.select_flow("a", Pipeline::Agent);

        assert!(store.replace_flows(vec![flow("b", 2)], Vec::new()));
        assert!(store.selected_flow().is_none());
    }

    #[test]
    fn test_select_unknown_flow_is_rejected() {
        let mut store = FlowStore::new();
        assert!(!store.select_flow("missing", Pipeline::Monitor));
        assert!(store.selected_flow_id().is_none());
    }

    #[test]
    fn test_trace_selection_keeps_flow() {
        let mut store = FlowStore::new();
        store.replace_flows(vec![flow("a", 1)], Vec::new());
        store.select_flow("a", Pipeline::Agent);
        store.select_trace(trace("t-1"));

        assert_eq!(store.selected_flow().unwrap().id, "a");
        assert_eq!(store.selected_trace().unwrap().trace_id, "t-1");

        assert!(store.replace_traces(vec![trace("t-2")]));
        assert!(store.selected_trace().is_none());
        assert!(store.selected_flow().is_some());
    }

    #[test]
    fn test_clear() {
        let mut store = FlowStore::new();
        store.replace_flows(vec![flow("a", 1)], vec![flow("m", 2)]);
        store.replace_traces(vec![trace("t")]);
        store.clear();
        assert!(store.is_empty());
        assert!(store.last_updated().is_none());
    }
}
