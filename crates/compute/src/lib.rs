pub mod model;
pub mod scorer;
pub mod severity;

pub use model::{DenseAutoencoder, Reconstructor};
pub use scorer::{reconstruction_error, score_batch, score_record, AnomalyScorer};
pub use severity::classify_severity;
