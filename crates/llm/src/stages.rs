//! Stage definitions for the explanation pipeline.
//!
//! Each stage is a fixed role with a goal and backstory plus an instruction.
//! Prompts are built from an explicit [`AnomalyContext`] and the outputs of
//! earlier stages; nothing is carried between samples.

use std::fmt::Write as _;

use sentinel_core::{BlockId, ScoredRecord};
use serde::{Deserialize, Serialize};

use crate::provider::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Reason,
    Severity,
    Action,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Reason => write!(f, "reason"),
            StageKind::Severity => write!(f, "severity"),
            StageKind::Action => write!(f, "action"),
        }
    }
}

/// Static description of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub kind: StageKind,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub instruction: &'static str,
}

pub const REASON_STAGE: StageSpec = StageSpec {
    kind: StageKind::Reason,
    role: "Detection Explainer",
    goal: "Explain anomalies briefly in logs.",
    backstory: "Expert in log analysis. Explains root causes in 1-2 lines.",
    instruction: "In 2 short lines, explain why this log block was flagged as an anomaly.",
};

pub const SEVERITY_STAGE: StageSpec = StageSpec {
    kind: StageKind::Severity,
    role: "Severity Classifier",
    goal: "Label severity as Critical / Major / Minor.",
    backstory: "Cyber defense specialist. Uses error thresholds for severity.",
    instruction: "Label the severity of this anomaly as Critical, Major or Minor. Reply with the label only.",
};

pub const ACTION_STAGE: StageSpec = StageSpec {
    kind: StageKind::Action,
    role: "Action Advisor",
    goal: "Suggest 1-2 short practical actions for anomalies.",
    backstory: "System reliability engineer. Suggests clear next steps.",
    instruction: "Suggest 1-2 short actions the ops team should take.",
};

/// Stages in execution order. Later stages see earlier outputs.
pub static STAGES: [StageSpec; 3] = [REASON_STAGE, SEVERITY_STAGE, ACTION_STAGE];

/// Inputs shared by every stage for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyContext {
    pub block_id: BlockId,
    pub reconstruction_error: f64,
    /// Feature values rendered as strings, in column order.
    pub sequence: Vec<String>,
}

impl AnomalyContext {
    pub fn from_record(record: &ScoredRecord) -> Self {
        Self {
            block_id: record.block_id().clone(),
            reconstruction_error: record.reconstruction_error,
            sequence: record.record.features.iter().map(f64::to_string).collect(),
        }
    }
}

/// Raw output of one stage. `raw` is `None` when the backend returned no
/// textual payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: StageKind,
    pub raw: Option<String>,
}

impl StageOutput {
    pub fn text(stage: StageKind, text: impl Into<String>) -> Self {
        Self {
            stage,
            raw: Some(text.into()),
        }
    }
}

impl StageSpec {
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}. Goal: {}\n{}",
            self.role, self.goal, self.backstory
        )
    }

    pub fn user_prompt(&self, ctx: &AnomalyContext, previous: &[StageOutput]) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "BlockId: {}", ctx.block_id);
        let _ = writeln!(prompt, "Reconstruction error: {}", ctx.reconstruction_error);
        let _ = writeln!(prompt, "Event sequence: [{}]", ctx.sequence.join(", "));

        let earlier: Vec<(&StageSpec, &str)> = previous
            .iter()
            .filter_map(|o| {
                let spec = STAGES.iter().find(|s| s.kind == o.stage)?;
                Some((spec, o.raw.as_deref()?))
            })
            .collect();
        if !earlier.is_empty() {
            prompt.push_str("\nContext from earlier analysis:\n");
            for (spec, text) in earlier {
                let _ = writeln!(prompt, "- {}: {}", spec.role, text.trim());
            }
        }

        prompt.push('\n');
        prompt.push_str(self.instruction);
        prompt
    }

    pub fn messages(&self, ctx: &AnomalyContext, previous: &[StageOutput]) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt(ctx, previous)),
        ]
    }
}
