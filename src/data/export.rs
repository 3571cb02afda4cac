//! Export of the current snapshot to a JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use super::metrics::FlowMetrics;
use super::model::{Flow, Trace};
use super::store::FlowStore;
use crate::source::ExportDocument;

/// Default file name for an export made at `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("flow-telemetry-{}.json", now.format("%Y-%m-%d"))
}

/// Build the export document from the store. The store is not modified.
pub fn build_document(store: &FlowStore, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        exported_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        metrics: FlowMetrics::compute(store).summary(),
        agent_flows: store.agent_flows().iter().map(Flow::to_raw).collect(),
        monitor_flows: store.monitor_flows().iter().map(Flow::to_raw).collect(),
        traces: store.traces().iter().map(Trace::to_raw).collect(),
    }
}

/// Write the snapshot into `dir` under the dated default name.
pub fn export_to_dir(store: &FlowStore, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let path = dir.join(export_file_name(now));
    write_document(&build_document(store, now), &path)?;
    Ok(path)
}

/// Serialize a document as pretty JSON.
pub fn write_document(doc: &ExportDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::generate_flows;
    use crate::data::Pipeline;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_uses_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(export_file_name(now), "flow-telemetry-2025-03-09.json");
    }

    #[test]
    fn test_document_carries_snapshot_and_metrics() {
        let now = Utc::now();
        let mut store = FlowStore::new();
        store.replace_flows(
            generate_flows(Pipeline::Agent, now),
            generate_flows(Pipeline::Monitor, now),
        );

        let doc = build_document(&store, now);
        assert_eq!(doc.agent_flows.len(), 5);
        assert_eq!(doc.monitor_flows.len(), 8);
        assert_eq!(doc.metrics.total_flows, 13);
        assert_eq!(doc.monitor_flows[0].flow_type, "background_monitor");
        assert!(doc.traces.is_empty());
    }

    #[test]
    fn test_export_writes_parseable_json() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let mut store = FlowStore::new();
        store.replace_flows(generate_flows(Pipeline::Agent, now), Vec::new());

        let path = export_to_dir(&store, dir.path(), now).unwrap();
        assert!(path.ends_with("flow-telemetry-2025-01-02.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        let doc: ExportDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(doc.agent_flows.len(), 5);
        assert_eq!(doc.exported_at, "2025-01-02T00:00:00Z");
    }
}
