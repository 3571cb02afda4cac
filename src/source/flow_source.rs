//! Flow capability with a synthetic fallback.
//!
//! [`FallbackFlowSource`] asks the remote source first and, when it is
//! unavailable, answers from the synthetic generator instead. Callers get
//! a [`FlowBatch`] saying which one answered.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::TelemetrySource;
use crate::data::synthetic::generate_flows;
use crate::data::{Flow, Pipeline};
use crate::error::SourceError;

/// Where a batch of flows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Live,
    Synthetic,
}

impl Origin {
    pub fn label(&self) -> &'static str {
        match self {
            Origin::Live => "live",
            Origin::Synthetic => "synthetic",
        }
    }
}

/// Something that can produce the flow list of a pipeline.
#[async_trait]
pub trait FlowSource: Send + Sync + fmt::Debug {
    async fn flows(&self, pipeline: Pipeline) -> Result<Vec<Flow>, SourceError>;

    fn origin(&self) -> Origin;
}

/// Flows from a [`TelemetrySource`].
#[derive(Debug, Clone)]
pub struct RemoteFlowSource {
    source: Arc<dyn TelemetrySource>,
}

impl RemoteFlowSource {
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl FlowSource for RemoteFlowSource {
    async fn flows(&self, pipeline: Pipeline) -> Result<Vec<Flow>, SourceError> {
        self.source.fetch_flows(pipeline).await
    }

    fn origin(&self) -> Origin {
        Origin::Live
    }
}

/// Generated placeholder flows. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticFlowSource;

#[async_trait]
impl FlowSource for SyntheticFlowSource {
    async fn flows(&self, pipeline: Pipeline) -> Result<Vec<Flow>, SourceError> {
        Ok(generate_flows(pipeline, Utc::now()))
    }

    fn origin(&self) -> Origin {
        Origin::Synthetic
    }
}

/// The flows of one pipeline and the source that produced them.
#[derive(Debug, Clone)]
pub struct FlowBatch {
    pub pipeline: Pipeline,
    pub flows: Vec<Flow>,
    pub origin: Origin,
}

/// Try the primary source, else the fallback.
#[derive(Debug)]
pub struct FallbackFlowSource {
    primary: Box<dyn FlowSource>,
    fallback: Box<dyn FlowSource>,
}

impl FallbackFlowSource {
    pub fn new(primary: Box<dyn FlowSource>, fallback: Box<dyn FlowSource>) -> Self {
        Self { primary, fallback }
    }

    /// Remote first, synthetic when the remote is unavailable.
    pub fn remote_or_synthetic(source: Arc<dyn TelemetrySource>) -> Self {
        Self::new(
            Box::new(RemoteFlowSource::new(source)),
            Box::new(SyntheticFlowSource),
        )
    }

    /// Fetch one pipeline. Never fails; unavailability shows in the origin.
    pub async fn fetch(&self, pipeline: Pipeline) -> FlowBatch {
        match self.primary.flows(pipeline).await {
            Ok(flows) => FlowBatch {
                pipeline,
                flows,
                origin: self.primary.origin(),
            },
            Err(err) => {
                tracing::warn!(%pipeline, error = %err, "flows unavailable, using fallback");
                let flows = match self.fallback.flows(pipeline).await {
                    Ok(flows) => flows,
                    Err(err) => {
                        tracing::warn!(%pipeline, error = %err, "fallback failed");
                        Vec::new()
                    }
                };
                FlowBatch {
                    pipeline,
                    flows,
                    origin: self.fallback.origin(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::flow_count;

    #[derive(Debug)]
    struct Down;

    #[async_trait]
    impl FlowSource for Down {
        async fn flows(&self, _pipeline: Pipeline) -> Result<Vec<Flow>, SourceError> {
            Err(SourceError::Timeout)
        }

        fn origin(&self) -> Origin {
            Origin::Live
        }
    }

    #[derive(Debug)]
    struct Empty;

    #[async_trait]
    impl FlowSource for Empty {
        async fn flows(&self, _pipeline: Pipeline) -> Result<Vec<Flow>, SourceError> {
            Ok(Vec::new())
        }

        fn origin(&self) -> Origin {
            Origin::Live
        }
    }

    #[tokio::test]
    async fn test_unavailable_remote_falls_back() {
        let source = FallbackFlowSource::new(Box::new(Down), Box::new(SyntheticFlowSource));
        for pipeline in Pipeline::ALL {
            let batch = source.fetch(pipeline).await;
            assert_eq!(batch.origin, Origin::Synthetic);
            assert_eq!(batch.flows.len(), flow_count(pipeline));
            assert!(batch.flows.iter().all(|f| f.pipeline() == pipeline));
        }
    }

    #[tokio::test]
    async fn test_empty_live_result_is_not_fallback() {
        let source = FallbackFlowSource::new(Box::new(Empty), Box::new(SyntheticFlowSource));
        let batch = source.fetch(Pipeline::Agent).await;
        assert_eq!(batch.origin, Origin::Live);
        assert!(batch.flows.is_empty());
    }
}
