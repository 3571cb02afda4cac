//! File-based telemetry source.
//!
//! Replays a previously exported document from disk.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;

use super::wire::ExportDocument;
use super::{TelemetrySource, TraceListing};
use crate::data::{Flow, Pipeline, Trace};
use crate::error::SourceError;

/// A telemetry source that reads an export document from a JSON file.
///
/// The source tracks the file's modification time and only re-parses it
/// when the file has been updated, so repeated polls of an unchanged file
/// are cheap.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    cache: Mutex<Option<(Option<SystemTime>, ExportDocument)>>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            cache: Mutex::new(None),
        }
    }

    /// Returns the path being replayed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, re-reading only if the file changed.
    async fn document(&self) -> Result<ExportDocument, SourceError> {
        let modified = tokio::fs::metadata(&self.path).await?.modified().ok();

        if let Ok(cache) = self.cache.lock() {
            if let Some((cached_at, doc)) = cache.as_ref() {
                if modified.is_some() && *cached_at == modified {
                    return Ok(doc.clone());
                }
            }
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let doc: ExportDocument = serde_json::from_str(&content)?;
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some((modified, doc.clone()));
        }
        Ok(doc)
    }
}

#[async_trait]
impl TelemetrySource for FileSource {
    async fn fetch_flows(&self, pipeline: Pipeline) -> Result<Vec<Flow>, SourceError> {
        let doc = self.document().await?;
        let raw = match pipeline {
            Pipeline::Agent => doc.agent_flows,
            Pipeline::Monitor => doc.monitor_flows,
        };
        Ok(raw
            .into_iter()
            .filter_map(|raw| {
                Flow::from_raw(raw, pipeline)
                    .map_err(|e| tracing::warn!(%pipeline, error = %e, "skipping flow"))
                    .ok()
            })
            .collect())
    }

    async fn fetch_traces(
        &self,
        limit: usize,
        filter: Option<Pipeline>,
    ) -> Result<TraceListing, SourceError> {
        let doc = self.document().await?;
        Ok(doc
            .traces
            .into_iter()
            .filter_map(|raw| Trace::from_raw(raw).ok())
            .filter(|t| filter.is_none() || t.pipeline == filter)
            .take(limit)
            .collect::<Vec<_>>()
            .into())
    }

    async fn fetch_trace_by_id(&self, trace_id: &str) -> Result<Option<Trace>, SourceError> {
        let doc = self.document().await?;
        Ok(doc
            .traces
            .into_iter()
            .find(|raw| raw.trace_id == trace_id)
            .and_then(|raw| Trace::from_raw(raw).ok()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "exported_at": "2025-01-01T12:00:00Z",
            "metrics": {
                "total_flows": 2, "active_pipelines": 2, "avg_duration": "20.0s",
                "success_rate": "50.0%", "total_traces": 2
            },
            "agent_flows": [{
                "id": "flow-1", "type": "agent_analysis", "status": "completed",
                "startTime": "2025-01-01T11:59:00Z", "duration": 20000,
                "request": "list pods", "trace_id": "t-agent"
            }],
            "monitor_flows": [{
                "id": "monitor-cycle-7", "type": "background_monitor", "status": "timeout",
                "startTime": "2025-01-01T11:50:00Z", "duration": 20000, "cycle": 7
            }],
            "traces": [
                {"trace_id": "t-agent", "flow_id": "flow-1", "type": "agent_analysis",
                 "status": "success", "name": "a", "startTime": "2025-01-01T11:59:00Z"},
                {"trace_id": "t-monitor", "flow_id": "monitor-cycle-7", "type": "background_monitor",
                 "status": "error", "name": "m", "startTime": "2025-01-01T11:50:00Z"}
            ]
        }"#
    }

    fn sample_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();
        file
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/export.json");
        assert_eq!(source.path(), Path::new("/tmp/export.json"));
        assert_eq!(source.description(), "file: /tmp/export.json");
    }

    #[tokio::test]
    async fn test_replays_flows_per_pipeline() {
        let file = sample_file();
        let source = FileSource::new(file.path());

        let agent = source.fetch_flows(Pipeline::Agent).await.unwrap();
        assert_eq!(agent.len(), 1);
        assert_eq!(agent[0].trace_id.as_deref(), Some("t-agent"));

        let monitor = source.fetch_flows(Pipeline::Monitor).await.unwrap();
        assert_eq!(monitor[0].title(), "Monitor cycle #7");
    }

    #[tokio::test]
    async fn test_flow_in_wrong_list_is_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        let doc = sample_json().replace(
            r#""agent_flows": ["#,
            r#""agent_flows": [{"id": "monitor-cycle-9", "type": "background_monitor",
                "status": "completed", "startTime": "2025-01-01T11:40:00Z", "cycle": 9},"#,
        );
        writeln!(file, "{}", doc).unwrap();
        let source = FileSource::new(file.path());

        let agent = source.fetch_flows(Pipeline::Agent).await.unwrap();
        assert_eq!(agent.len(), 1);
        assert_eq!(agent[0].id, "flow-1");
    }

    #[tokio::test]
    async fn test_trace_filter_and_lookup() {
        let file = sample_file();
        let source = FileSource::new(file.path());

        assert_eq!(source.fetch_traces(50, None).await.unwrap().traces.len(), 2);
        let monitor = source
            .fetch_traces(50, Some(Pipeline::Monitor))
            .await
            .unwrap()
            .traces;
        assert_eq!(monitor.len(), 1);
        assert_eq!(monitor[0].trace_id, "t-monitor");
        assert_eq!(source.fetch_traces(1, None).await.unwrap().traces.len(), 1);

        assert!(source.fetch_trace_by_id("t-agent").await.unwrap().is_some());
        assert!(source.fetch_trace_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = FileSource::new("/nonexistent/path/export.json");
        let err = source.fetch_flows(Pipeline::Agent).await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let source = FileSource::new(file.path());
        let err = source.fetch_traces(10, None).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
