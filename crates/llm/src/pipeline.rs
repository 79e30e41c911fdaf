//! Three-stage explanation pipeline: reason → severity → action.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::provider::{LlmError, LlmProvider};
use crate::stages::{AnomalyContext, StageKind, StageOutput, STAGES};

/// A pipeline run failed for one sample. Never fatal to the batch.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: LlmError,
    },
    #[error("{stage} stage timed out after {}s", .after.as_secs())]
    StageTimeout { stage: StageKind, after: Duration },
    #[error("explanation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("malformed pipeline result: {0}")]
    Malformed(String),
}

/// Produces the raw stage outputs for one anomaly.
///
/// Implementations may return fewer outputs than there are stages; the
/// orchestrator degrades the missing fields instead of failing.
#[async_trait]
pub trait ExplanationPipeline: Send + Sync {
    async fn run(&self, ctx: &AnomalyContext) -> Result<Vec<StageOutput>, BackendError>;
}

/// Runs [`STAGES`] in order against an LLM provider. Each stage receives the
/// shared context plus every earlier stage's output.
pub struct StagedPipeline {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
    stage_timeout: Duration,
}

impl StagedPipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
            stage_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Build from config, creating the appropriate provider.
    pub fn from_config(config: &sentinel_core::Config) -> Result<Self, LlmError> {
        let provider = crate::providers::create_provider(&config.llm, &config.ollama)?;
        Ok(Self::new(
            Arc::from(provider),
            config.llm.temperature,
            config.llm.max_tokens,
        )
        .with_stage_timeout(Duration::from_secs(config.explain.stage_timeout_secs)))
    }
}

#[async_trait]
impl ExplanationPipeline for StagedPipeline {
    async fn run(&self, ctx: &AnomalyContext) -> Result<Vec<StageOutput>, BackendError> {
        let mut outputs: Vec<StageOutput> = Vec::with_capacity(STAGES.len());

        for spec in STAGES.iter() {
            let messages = spec.messages(ctx, &outputs);
            debug!(
                block_id = %ctx.block_id,
                stage = %spec.kind,
                provider = self.provider.name(),
                "running explanation stage"
            );

            let call = self
                .provider
                .complete(messages, self.temperature, self.max_tokens);
            let text = tokio::time::timeout(self.stage_timeout, call)
                .await
                .map_err(|_| BackendError::StageTimeout {
                    stage: spec.kind,
                    after: self.stage_timeout,
                })?
                .map_err(|source| BackendError::Stage {
                    stage: spec.kind,
                    source,
                })?;

            if text.trim().is_empty() {
                return Err(BackendError::Malformed(format!(
                    "{} stage returned an empty completion",
                    spec.kind
                )));
            }
            outputs.push(StageOutput::text(spec.kind, text));
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sentinel_core::BlockId;

    use super::*;
    use crate::provider::{Message, Role};

    /// Records every request and answers with a per-call canned reply.
    struct ScriptedProvider {
        replies: Vec<&'static str>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            let mut seen = self.seen.lock().unwrap();
            let idx = seen.len();
            seen.push(messages);
            self.replies
                .get(idx)
                .map(|r| r.to_string())
                .ok_or_else(|| LlmError::ParseError("no scripted reply".into()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Err(LlmError::ApiError {
                status: 503,
                body: "overloaded".into(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".into())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn ctx() -> AnomalyContext {
        AnomalyContext {
            block_id: BlockId::new("17"),
            reconstruction_error: 64.0,
            sequence: vec!["8".into()],
        }
    }

    #[tokio::test]
    async fn stages_run_in_order_with_accumulated_context() {
        let provider = Arc::new(ScriptedProvider {
            replies: vec!["Write failures spiked.", "Critical", "Check the datanode disk."],
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = StagedPipeline::new(provider.clone(), 0.0, 64);

        let outputs = pipeline.run(&ctx()).await.unwrap();
        let kinds: Vec<StageKind> = outputs.iter().map(|o| o.stage).collect();
        assert_eq!(kinds, vec![StageKind::Reason, StageKind::Severity, StageKind::Action]);
        assert_eq!(outputs[2].raw.as_deref(), Some("Check the datanode disk."));

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0][0].role, Role::System);
        assert!(seen[0][0].content.contains("Detection Explainer"));
        assert!(!seen[0][1].content.contains("Write failures spiked."));
        assert!(seen[1][1].content.contains("Write failures spiked."));
        assert!(seen[2][1].content.contains("Severity Classifier: Critical"));
    }

    #[tokio::test]
    async fn provider_error_names_the_stage() {
        let pipeline = StagedPipeline::new(Arc::new(FailingProvider), 0.0, 64);
        let err = pipeline.run(&ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Stage {
                stage: StageKind::Reason,
                ..
            }
        ));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn empty_completion_is_malformed() {
        let provider = Arc::new(ScriptedProvider {
            replies: vec!["Write failures spiked.", "  \n", "unused"],
            seen: Mutex::new(Vec::new()),
        });
        let pipeline = StagedPipeline::new(provider.clone(), 0.0, 64);

        let err = pipeline.run(&ctx()).await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
        assert_eq!(
            err.to_string(),
            "malformed pipeline result: severity stage returned an empty completion"
        );
        // The action stage never runs.
        assert_eq!(provider.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stage_times_out() {
        let pipeline = StagedPipeline::new(Arc::new(SlowProvider), 0.0, 64)
            .with_stage_timeout(Duration::from_secs(5));
        let err = pipeline.run(&ctx()).await.unwrap_err();
        assert!(matches!(err, BackendError::StageTimeout { .. }));
        assert_eq!(err.to_string(), "reason stage timed out after 5s");
    }
}
