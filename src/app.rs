//! Application state and navigation logic.
//!
//! [`App`] is the single context object: it owns the store, the refresh
//! scheduler and the telemetry facade, and every component reaches them
//! through it. Reloads run as tokio tasks and report back over a channel;
//! [`App::process_updates`] applies whatever has arrived, in arrival order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::data::export::export_to_dir;
use crate::data::{FlowMetrics, FlowStore, Pipeline, Trace};
use crate::scheduler::{next_interval, RefreshScheduler, Tick};
use crate::source::{FlowBatch, Origin, Telemetry, TraceBatch};
use crate::ui::Theme;

/// How long a status message stays visible.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Agent and monitor flow timelines side by side.
    Flows,
    /// Trace list, optionally filtered by pipeline.
    Traces,
}

impl View {
    /// Cycle to the other view.
    pub fn next(self) -> Self {
        match self {
            View::Flows => View::Traces,
            View::Traces => View::Flows,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Flows => "Flows",
            View::Traces => "Traces",
        }
    }
}

/// One level of the detail navigation stack.
///
/// Flow and trace entries refer to the store's selections; a span entry
/// indexes into the selected trace's spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    Flow,
    Trace,
    Span(usize),
}

impl Detail {
    pub fn label(&self) -> &'static str {
        match self {
            Detail::Flow => "Flow",
            Detail::Trace => "Trace",
            Detail::Span(_) => "Span",
        }
    }
}

/// Global status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Active,
    Error,
}

impl LoadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LoadStatus::Loading => "loading",
            LoadStatus::Active => "active",
            LoadStatus::Error => "error",
        }
    }
}

/// Result of a background fetch, applied by [`App::apply_update`].
#[derive(Debug)]
pub enum Update {
    Flows { agent: FlowBatch, monitor: FlowBatch },
    Traces(TraceBatch),
    TraceResolved { trace_id: String, trace: Option<Trace> },
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub view: View,
    pub show_help: bool,

    telemetry: Arc<Telemetry>,
    pub store: FlowStore,
    pub metrics: FlowMetrics,
    pub status: LoadStatus,
    /// Origin of the last applied flow batch.
    pub origin: Option<Origin>,

    // Navigation state
    /// Pane with keyboard focus in the flows view.
    pub focus: Pipeline,
    pub selected_index: usize,
    pub detail_stack: Vec<Detail>,
    /// Highlighted span while a trace detail is open.
    pub span_index: usize,

    // Traces view
    pub trace_filter: Option<Pipeline>,
    pub trace_limit: usize,
    /// Backend tracing switch from the last successful trace fetch.
    pub traces_enabled: Option<bool>,

    pub scheduler: RefreshScheduler,
    tick_rx: mpsc::UnboundedReceiver<Tick>,
    update_tx: mpsc::UnboundedSender<Update>,
    update_rx: mpsc::UnboundedReceiver<Update>,

    pub export_dir: PathBuf,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App. Nothing is fetched until [`App::start`].
    pub fn new(telemetry: Telemetry, settings: &Settings, theme: Theme) -> Self {
        let (scheduler, tick_rx) = RefreshScheduler::new(settings.refresh_interval);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            running: true,
            view: View::Flows,
            show_help: false,
            telemetry: Arc::new(telemetry),
            store: FlowStore::new(),
            metrics: FlowMetrics::default(),
            status: LoadStatus::Loading,
            origin: None,
            focus: Pipeline::Agent,
            selected_index: 0,
            detail_stack: Vec::new(),
            span_index: 0,
            trace_filter: None,
            trace_limit: settings.trace_limit,
            traces_enabled: None,
            scheduler,
            tick_rx,
            update_tx,
            update_rx,
            export_dir: settings.export_dir.clone(),
            theme,
            status_message: None,
        }
    }

    /// Issue the first reload and start the timer if auto-refresh is on.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, auto_refresh: bool) {
        self.reload();
        if auto_refresh {
            self.scheduler.start(self.scheduler.interval());
        }
    }

    /// Returns a description of the current telemetry source.
    pub fn source_description(&self) -> &str {
        self.telemetry.description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_MESSAGE_TTL {
                return Some(msg);
            }
        }
        None
    }

    // ----- reloads -----

    /// Reload the data for the current view in the background.
    pub fn reload(&mut self) {
        self.status = LoadStatus::Loading;
        let telemetry = Arc::clone(&self.telemetry);
        let tx = self.update_tx.clone();
        let view = self.view;
        let (limit, filter) = (self.trace_limit, self.trace_filter);
        tracing::debug!(view = view.label(), ?filter, "reload issued");

        tokio::spawn(async move {
            let update = fetch_view(&telemetry, view, limit, filter).await;
            // Receiver gone means the app is shutting down
            let _ = tx.send(update);
        });
    }

    /// Reload the current view and apply the result before returning.
    pub async fn reload_now(&mut self) {
        self.status = LoadStatus::Loading;
        let update =
            fetch_view(&self.telemetry, self.view, self.trace_limit, self.trace_filter).await;
        self.apply_update(update);
    }

    /// Turn pending timer ticks into at most one reload.
    pub fn process_ticks(&mut self) -> bool {
        let mut ticked = false;
        while self.tick_rx.try_recv().is_ok() {
            ticked = true;
        }
        if ticked {
            self.reload();
        }
        ticked
    }

    /// Apply every finished fetch. Returns true if anything changed.
    pub fn process_updates(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.update_rx.try_recv() {
            self.apply_update(update);
            changed = true;
        }
        changed
    }

    /// Apply one fetch result. Results land in the store whichever view is
    /// active; the last one applied wins.
    pub fn apply_update(&mut self, update: Update) {
        match update {
            Update::Flows { agent, monitor } => {
                let live = agent.origin == Origin::Live && monitor.origin == Origin::Live;
                self.origin = Some(if live { Origin::Live } else { Origin::Synthetic });
                self.status = if live {
                    LoadStatus::Active
                } else {
                    LoadStatus::Error
                };
                if self.store.replace_flows(agent.flows, monitor.flows) {
                    tracing::debug!("selected flow no longer present");
                }
            }
            Update::Traces(batch) => {
                self.status = if batch.available {
                    LoadStatus::Active
                } else {
                    LoadStatus::Error
                };
                if batch.available {
                    self.traces_enabled = batch.traces_enabled;
                }
                if self.store.replace_traces(batch.traces) {
                    tracing::debug!("selected trace no longer present");
                }
            }
            Update::TraceResolved { trace_id, trace } => match trace {
                Some(trace) => self.show_trace(trace),
                None => self.set_status_message(format!("Trace {} not found", trace_id)),
            },
        }
        self.prune_detail_stack();
        self.clamp_selection();
        self.metrics = FlowMetrics::compute(&self.store);
    }

    // ----- view controller -----

    /// Switch to a specific view. Every transition reloads.
    pub fn set_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.selected_index = 0;
        self.close_detail();
        self.reload();
    }

    pub fn next_view(&mut self) {
        self.set_view(self.view.next());
    }

    /// Set the trace-type filter; re-fetches when the traces view is active.
    pub fn set_trace_filter(&mut self, filter: Option<Pipeline>) {
        if self.trace_filter == filter {
            return;
        }
        self.trace_filter = filter;
        if self.view == View::Traces {
            self.selected_index = 0;
            self.reload();
        }
    }

    /// Cycle the filter: none → agent → monitor → none.
    pub fn cycle_trace_filter(&mut self) {
        let next = match self.trace_filter {
            None => Some(Pipeline::Agent),
            Some(Pipeline::Agent) => Some(Pipeline::Monitor),
            Some(Pipeline::Monitor) => None,
        };
        self.set_trace_filter(next);
        let label = next.map(|p| p.label()).unwrap_or("all");
        self.set_status_message(format!("Trace filter: {}", label));
    }

    pub fn filter_label(&self) -> &'static str {
        self.trace_filter.map(|p| p.as_str()).unwrap_or("all")
    }

    // ----- scheduler controls -----

    pub fn toggle_auto_refresh(&mut self) {
        let enabled = !self.scheduler.is_enabled();
        self.scheduler.set_enabled(enabled);
        self.set_status_message(format!(
            "Auto-refresh {}",
            if enabled { "on" } else { "off" }
        ));
    }

    /// Step through the interval choices.
    pub fn cycle_refresh_interval(&mut self) {
        let next = next_interval(self.scheduler.interval());
        self.scheduler.set_interval(next);
        self.set_status_message(format!(
            "Refresh interval: {}",
            crate::data::format::format_interval(next)
        ));
    }

    // ----- list navigation -----

    /// Length of the list the cursor moves over.
    pub fn visible_len(&self) -> usize {
        match self.detail_stack.last() {
            Some(Detail::Trace) => self.store.selected_trace().map_or(0, |t| t.spans.len()),
            Some(_) => 0,
            None => match self.view {
                View::Flows => self.store.flows(self.focus).len(),
                View::Traces => self.store.traces().len(),
            },
        }
    }

    fn cursor(&mut self) -> &mut usize {
        if self.detail_stack.last() == Some(&Detail::Trace) {
            &mut self.span_index
        } else {
            &mut self.selected_index
        }
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible_len().saturating_sub(1);
        let cursor = self.cursor();
        *cursor = (*cursor + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        let cursor = self.cursor();
        *cursor = cursor.saturating_sub(n);
    }

    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    pub fn select_first(&mut self) {
        *self.cursor() = 0;
    }

    pub fn select_last(&mut self) {
        let last = self.visible_len().saturating_sub(1);
        *self.cursor() = last;
    }

    /// Move focus to the other flow pane.
    pub fn switch_focus(&mut self) {
        if self.view == View::Flows && self.detail_stack.is_empty() {
            self.focus = match self.focus {
                Pipeline::Agent => Pipeline::Monitor,
                Pipeline::Monitor => Pipeline::Agent,
            };
            self.selected_index = 0;
        }
    }

    fn clamp_selection(&mut self) {
        let list_len = match self.view {
            View::Flows => self.store.flows(self.focus).len(),
            View::Traces => self.store.traces().len(),
        };
        self.selected_index = self.selected_index.min(list_len.saturating_sub(1));
        let spans = self.store.selected_trace().map_or(0, |t| t.spans.len());
        self.span_index = self.span_index.min(spans.saturating_sub(1));
    }

    // ----- detail navigation -----

    /// Open detail for the highlighted item, or drill one level deeper.
    pub fn enter_detail(&mut self) {
        match self.detail_stack.last().copied() {
            None => match self.view {
                View::Flows => {
                    let Some(id) = self
                        .store
                        .flows(self.focus)
                        .get(self.selected_index)
                        .map(|f| f.id.clone())
                    else {
                        return;
                    };
                    self.select_flow(&id, self.focus);
                }
                View::Traces => {
                    if let Some(id) = self
                        .store
                        .traces()
                        .get(self.selected_index)
                        .map(|t| t.trace_id.clone())
                    {
                        self.open_trace(id);
                    }
                }
            },
            Some(Detail::Flow) => self.open_linked_trace(),
            Some(Detail::Trace) => {
                let spans = self.store.selected_trace().map_or(0, |t| t.spans.len());
                if self.span_index < spans {
                    self.detail_stack.push(Detail::Span(self.span_index));
                }
            }
            Some(Detail::Span(_)) => {}
        }
    }

    /// Show a flow's detail. Returns false if the flow is not loaded.
    pub fn select_flow(&mut self, id: &str, pipeline: Pipeline) -> bool {
        if !self.store.select_flow(id, pipeline) {
            return false;
        }
        self.detail_stack.clear();
        self.detail_stack.push(Detail::Flow);
        true
    }

    /// Resolve the selected flow's trace in the background.
    pub fn open_linked_trace(&mut self) {
        let Some(flow) = self.store.selected_flow() else {
            return;
        };
        match flow.trace_id.clone() {
            Some(trace_id) => self.open_trace(trace_id),
            None => self.set_status_message("No trace linked to this flow".to_string()),
        }
    }

    /// Resolve a trace in the background; the result arrives as an update.
    pub fn open_trace(&mut self, trace_id: String) {
        let telemetry = Arc::clone(&self.telemetry);
        let tx = self.update_tx.clone();
        tokio::spawn(async move {
            let trace = telemetry.trace(&trace_id).await;
            let _ = tx.send(Update::TraceResolved { trace_id, trace });
        });
    }

    /// Resolve a trace and show it before returning.
    ///
    /// On not-found the detail target is unchanged and a notice is shown.
    pub async fn select_trace(&mut self, trace_id: &str) -> bool {
        let trace = self.telemetry.trace(trace_id).await;
        let found = trace.is_some();
        self.apply_update(Update::TraceResolved {
            trace_id: trace_id.to_string(),
            trace,
        });
        found
    }

    /// Push a trace onto the stack, above the flow entry if there is one.
    fn show_trace(&mut self, trace: Trace) {
        self.store.select_trace(trace);
        self.detail_stack.retain(|d| *d == Detail::Flow);
        self.detail_stack.push(Detail::Trace);
        self.span_index = 0;
    }

    /// Drop stack entries whose target vanished in the last poll.
    fn prune_detail_stack(&mut self) {
        let has_flow = self.store.selected_flow().is_some();
        let spans = self.store.selected_trace().map(|t| t.spans.len());
        let before = self.detail_stack.len();
        self.detail_stack.retain(|d| match d {
            Detail::Flow => has_flow,
            Detail::Trace => spans.is_some(),
            Detail::Span(i) => spans.is_some_and(|n| *i < n),
        });
        if self.detail_stack.len() != before {
            tracing::debug!(before, after = self.detail_stack.len(), "pruned detail stack");
        }
    }

    /// Navigate back: close help first, then pop one detail level.
    pub fn go_back(&mut self) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        match self.detail_stack.pop() {
            Some(Detail::Flow) => self.store.clear_flow_selection(),
            Some(Detail::Trace) => self.store.clear_trace_selection(),
            Some(Detail::Span(_)) | None => {}
        }
    }

    /// Close every detail level.
    pub fn close_detail(&mut self) {
        self.detail_stack.clear();
        self.store.clear_flow_selection();
        self.store.clear_trace_selection();
    }

    /// Get breadcrumb trail for current navigation.
    pub fn breadcrumb(&self) -> String {
        let mut parts: Vec<&str> = vec![self.view.label()];
        parts.extend(self.detail_stack.iter().map(Detail::label));
        parts.join(" > ")
    }

    // ----- actions -----

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Empty the in-memory lists and the detail panel.
    pub fn clear(&mut self) {
        self.store.clear();
        self.detail_stack.clear();
        self.selected_index = 0;
        self.span_index = 0;
        self.metrics = FlowMetrics::compute(&self.store);
        self.set_status_message("Cleared".to_string());
    }

    /// Export the current snapshot to the export directory.
    pub fn export_state(&mut self) {
        match export_to_dir(&self.store, &self.export_dir, Utc::now()) {
            Ok(path) => self.set_status_message(format!("Exported to {}", path.display())),
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                self.set_status_message(format!("Export failed: {}", e));
            }
        }
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

/// Fetch what `view` shows. Both flow pipelines are fetched concurrently
/// and returned together.
pub async fn fetch_view(
    telemetry: &Telemetry,
    view: View,
    limit: usize,
    filter: Option<Pipeline>,
) -> Update {
    match view {
        View::Flows => {
            let (agent, monitor) = telemetry.all_flows().await;
            Update::Flows { agent, monitor }
        }
        View::Traces => Update::Traces(telemetry.traces(limit, filter).await),
    }
}
