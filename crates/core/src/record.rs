use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the identifier column in input and output tables.
pub const BLOCK_ID_COLUMN: &str = "BlockId";

/// Placeholder for explanation fields the backend did not produce.
pub const NOT_AVAILABLE: &str = "N/A";

/// Stable per-record identifier, either supplied by the input or synthesized
/// as a 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Synthesized id for the row at zero-based `index`.
    pub fn sequential(index: usize) -> Self {
        Self((index + 1).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized input row: its key plus the numeric feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub block_id: BlockId,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    Normal,
    Anomaly,
}

impl Prediction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Normal => "Normal",
            Prediction::Anomaly => "Anomaly",
        }
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tier of an anomaly. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Tiers in reporting order, most severe first.
    pub const REPORT_ORDER: [Severity; 3] = [Severity::Critical, Severity::Major, Severity::Minor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Major => "Major",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record after scoring. `severity` is set only for anomalies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: LogRecord,
    pub reconstruction_error: f64,
    pub prediction: Prediction,
    pub severity: Option<Severity>,
}

impl ScoredRecord {
    pub fn block_id(&self) -> &BlockId {
        &self.record.block_id
    }

    pub fn is_anomaly(&self) -> bool {
        self.prediction == Prediction::Anomaly
    }
}

/// Explanation for one representative anomaly. Refers to its record by
/// `block_id` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub block_id: BlockId,
    pub reason: String,
    pub severity: Severity,
    pub suggested_action: String,
}

/// Counts over one scored batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub anomalies: usize,
    pub normal: usize,
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
}

impl BatchSummary {
    pub fn from_records(records: &[ScoredRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for r in records {
            match (r.prediction, r.severity) {
                (Prediction::Normal, _) => summary.normal += 1,
                (Prediction::Anomaly, severity) => {
                    summary.anomalies += 1;
                    match severity {
                        Some(Severity::Critical) => summary.critical += 1,
                        Some(Severity::Major) => summary.major += 1,
                        Some(Severity::Minor) | None => summary.minor += 1,
                    }
                }
            }
        }
        summary
    }
}

/// Transient working set for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub threshold: f64,
    pub feature_names: Vec<String>,
    pub records: Vec<ScoredRecord>,
    pub explanations: Vec<ExplanationResult>,
}

impl Batch {
    pub fn new(threshold: f64, feature_names: Vec<String>, records: Vec<ScoredRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            threshold,
            feature_names,
            records,
            explanations: Vec::new(),
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_records(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: usize, prediction: Prediction, severity: Option<Severity>) -> ScoredRecord {
        ScoredRecord {
            record: LogRecord {
                block_id: BlockId::sequential(id),
                features: vec![0.0],
            },
            reconstruction_error: 0.0,
            prediction,
            severity,
        }
    }

    #[test]
    fn sequential_block_ids_start_at_one() {
        assert_eq!(BlockId::sequential(0).as_str(), "1");
        assert_eq!(BlockId::sequential(41).to_string(), "42");
    }

    #[test]
    fn report_order_is_most_severe_first() {
        assert_eq!(
            Severity::REPORT_ORDER,
            [Severity::Critical, Severity::Major, Severity::Minor]
        );
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);
    }

    #[test]
    fn summary_counts_tiers() {
        let records = vec![
            scored(0, Prediction::Normal, None),
            scored(1, Prediction::Anomaly, Some(Severity::Critical)),
            scored(2, Prediction::Anomaly, Some(Severity::Minor)),
            scored(3, Prediction::Anomaly, Some(Severity::Minor)),
        ];
        let summary = BatchSummary::from_records(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.anomalies, 3);
        assert_eq!(summary.normal, 1);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.major, 0);
        assert_eq!(summary.minor, 2);
    }

    #[test]
    fn block_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&BlockId::new("blk_7")).unwrap();
        assert_eq!(json, "\"blk_7\"");
    }
}
