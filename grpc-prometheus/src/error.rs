use crate::labels::MetricKind;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Configuration errors.
///
/// None of these depend on traffic: they mean the metric schema is broken
/// and the server should not start with it.
#[derive(Debug, Error)]
pub enum Error {
    /// The metrics engine rejected a definition or a registration,
    /// for example an invalid label name or a collector registered twice.
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),

    #[error("extension declared different custom labels for {metric} on consecutive calls: {first:?} then {second:?}")]
    InconsistentLabels {
        metric: MetricKind,
        first: Vec<String>,
        second: Vec<String>,
    },

    #[error("extension produced {actual} custom label values for {metric}, but declared {expected} custom labels")]
    LabelCardinality {
        metric: MetricKind,
        expected: usize,
        actual: usize,
    },

    #[error("failed to decode file descriptor set: {0}")]
    Descriptor(#[from] prost::DecodeError),
}
