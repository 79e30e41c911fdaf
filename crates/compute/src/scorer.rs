//! Reconstruction-error anomaly scorer.
//!
//! Each row is scored independently: error is the mean squared difference
//! between the row and its reconstruction, and a row is an anomaly when the
//! error is strictly above the threshold. Rows are scored in parallel; the
//! output keeps input order.

use std::sync::Arc;

use rayon::prelude::*;
use sentinel_core::{
    BatchSummary, LogRecord, ModelError, Prediction, SchemaError, ScoredRecord, SentinelError,
};
use tracing::info;

use crate::model::Reconstructor;
use crate::severity::classify_severity;

/// Mean squared difference over feature dimensions. Zero for empty input.
pub fn reconstruction_error(input: &[f64], reconstruction: &[f64]) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    let sum: f64 = input
        .iter()
        .zip(reconstruction)
        .map(|(x, r)| (x - r).powi(2))
        .sum();
    sum / input.len() as f64
}

/// Score a single record against the model.
pub fn score_record<R: Reconstructor + ?Sized>(
    record: LogRecord,
    model: &R,
    threshold: f64,
) -> Result<ScoredRecord, ModelError> {
    let reconstruction = model.reconstruct(&record.features)?;
    if reconstruction.len() != record.features.len() {
        return Err(ModelError::OutputWidth {
            expected: record.features.len(),
            found: reconstruction.len(),
        });
    }

    let error = reconstruction_error(&record.features, &reconstruction);
    let (prediction, severity) = if error > threshold {
        (Prediction::Anomaly, Some(classify_severity(error, threshold)))
    } else {
        (Prediction::Normal, None)
    };

    Ok(ScoredRecord {
        record,
        reconstruction_error: error,
        prediction,
        severity,
    })
}

/// Score every record. Fails before scoring if any record's width differs
/// from the model's input width.
pub fn score_batch<R: Reconstructor + ?Sized>(
    records: Vec<LogRecord>,
    model: &R,
    threshold: f64,
) -> Result<Vec<ScoredRecord>, SentinelError> {
    let expected = model.input_dim();
    if let Some(bad) = records.iter().find(|r| r.features.len() != expected) {
        return Err(SchemaError::DimensionMismatch {
            expected,
            found: bad.features.len(),
        }
        .into());
    }

    let scored = records
        .into_par_iter()
        .map(|record| score_record(record, model, threshold))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(scored)
}

/// Scorer bound to a shared model and a fixed threshold.
#[derive(Clone)]
pub struct AnomalyScorer {
    model: Arc<dyn Reconstructor>,
    threshold: f64,
}

impl AnomalyScorer {
    pub fn new(model: Arc<dyn Reconstructor>, threshold: f64) -> Self {
        Self { model, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, records: Vec<LogRecord>) -> Result<Vec<ScoredRecord>, SentinelError> {
        let scored = score_batch(records, self.model.as_ref(), self.threshold)?;
        let summary = BatchSummary::from_records(&scored);
        info!(
            "Scored {} records: {} anomalies ({} critical, {} major, {} minor), {} normal",
            summary.total,
            summary.anomalies,
            summary.critical,
            summary.major,
            summary.minor,
            summary.normal
        );
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use sentinel_core::{BlockId, Severity};

    use super::*;

    /// Reconstructs everything as zeros.
    struct Zeros(usize);

    impl Reconstructor for Zeros {
        fn input_dim(&self) -> usize {
            self.0
        }

        fn reconstruct(&self, input: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![0.0; input.len()])
        }
    }

    /// Returns a vector of the wrong width.
    struct Truncating;

    impl Reconstructor for Truncating {
        fn input_dim(&self) -> usize {
            2
        }

        fn reconstruct(&self, _input: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![0.0])
        }
    }

    fn rec(id: usize, features: Vec<f64>) -> LogRecord {
        LogRecord {
            block_id: BlockId::sequential(id),
            features,
        }
    }

    #[test]
    fn error_is_mean_squared_difference() {
        assert_eq!(reconstruction_error(&[1.0, 3.0], &[0.0, 0.0]), 5.0);
        assert_eq!(reconstruction_error(&[2.0, 2.0], &[2.0, 2.0]), 0.0);
        assert_eq!(reconstruction_error(&[], &[]), 0.0);
    }

    #[test]
    fn single_feature_of_100_is_critical() {
        let scored = score_record(rec(0, vec![100.0]), &Zeros(1), 20.0).unwrap();
        assert_eq!(scored.reconstruction_error, 10_000.0);
        assert_eq!(scored.prediction, Prediction::Anomaly);
        assert_eq!(scored.severity, Some(Severity::Critical));
    }

    #[test]
    fn error_equal_to_threshold_is_normal() {
        // (16 + 4) / 2 == 10 exactly
        let scored = score_record(rec(0, vec![4.0, 2.0]), &Zeros(2), 10.0).unwrap();
        assert_eq!(scored.reconstruction_error, 10.0);
        assert_eq!(scored.prediction, Prediction::Normal);
        assert_eq!(scored.severity, None);
    }

    #[test]
    fn row_scores_do_not_depend_on_the_batch() {
        let rows = vec![
            rec(0, vec![1.0, 1.0]),
            rec(1, vec![7.0, 0.0]),
            rec(2, vec![10.0, 10.0]),
        ];
        let model = Zeros(2);
        let together = score_batch(rows.clone(), &model, 20.0).unwrap();
        for (row, batched) in rows.into_iter().zip(&together) {
            let alone = score_record(row, &model, 20.0).unwrap();
            assert_eq!(&alone, batched);
        }
    }

    #[test]
    fn batch_keeps_input_order() {
        let rows: Vec<LogRecord> = (0..500).map(|i| rec(i, vec![i as f64])).collect();
        let scored = score_batch(rows, &Zeros(1), 20.0).unwrap();
        for (i, s) in scored.iter().enumerate() {
            assert_eq!(s.block_id(), &BlockId::sequential(i));
        }
    }

    #[test]
    fn width_mismatch_is_a_schema_error() {
        let err = score_batch(vec![rec(0, vec![1.0, 2.0, 3.0])], &Zeros(2), 20.0).unwrap_err();
        assert!(matches!(
            err,
            SentinelError::Schema(SchemaError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn wrong_reconstruction_width_is_a_model_error() {
        let err = score_batch(vec![rec(0, vec![1.0, 2.0])], &Truncating, 20.0).unwrap_err();
        assert!(matches!(err, SentinelError::Model(ModelError::OutputWidth { .. })));
    }

    #[test]
    fn scorer_uses_shared_model() {
        let scorer = AnomalyScorer::new(Arc::new(Zeros(1)), 20.0);
        let scored = scorer
            .score(vec![rec(0, vec![1.0]), rec(1, vec![6.0])])
            .unwrap();
        assert_eq!(scored[0].prediction, Prediction::Normal);
        // 36 > 30 -> Major
        assert_eq!(scored[1].severity, Some(Severity::Major));
    }
}
