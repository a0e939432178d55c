//! Custom labels for the server metrics.
//!
//! An extension adds deployment-specific dimensions to the metrics without
//! changing the core definitions. Custom labels are placed in front of the
//! fixed `grpc_*` labels of each metric, and each metric can have its own set.
//!
//! The label *names* are read once, when the [`ServerMetrics`] are built.
//! The label *values* are computed for every call from its [`CallContext`].
//!
//! [`ServerMetrics`]: crate::ServerMetrics

use crate::constants::SOURCE_KEY;
use crate::context::{CallContext, Source};
use crate::labels::MetricKind;

pub trait ServerExtension: Send + Sync {
    /// The names of the custom labels for the given metric.
    ///
    /// This must return the same names every time it is called.
    fn custom_labels(&self, metric: MetricKind) -> Vec<String> {
        let _ = metric;
        Vec::new()
    }

    /// Combinations of custom label values to initialize at zero when
    /// pre-registering a server's methods.
    ///
    /// Each tuple must have one value per custom label. By default, metrics
    /// without custom labels are pre-registered (with a single empty tuple)
    /// and metrics with custom labels are not.
    fn pre_register_values(&self, metric: MetricKind) -> Vec<Vec<String>> {
        if self.custom_labels(metric).is_empty() {
            vec![Vec::new()]
        } else {
            Vec::new()
        }
    }

    /// The custom label values for one call.
    ///
    /// ## Panics
    ///
    /// Returning a different number of values than [`custom_labels`] declared
    /// is a configuration error: the call that hits it panics rather than
    /// emitting a malformed series.
    ///
    /// [`custom_labels`]: ServerExtension::custom_labels
    fn values_for_call(&self, metric: MetricKind, ctx: &CallContext) -> Vec<String> {
        let _ = (metric, ctx);
        Vec::new()
    }

    /// Rewrite metric names, for example to add a tenant prefix.
    ///
    /// Applied once per metric when the [`ServerMetrics`](crate::ServerMetrics) are built.
    fn adjust_metric_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// No custom labels and unchanged metric names.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtension;

impl ServerExtension for DefaultExtension {}

/// Labels every metric with the [`Source`] of the call (`source="internal"`
/// or `source="external"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceExtension;

impl ServerExtension for SourceExtension {
    fn custom_labels(&self, _metric: MetricKind) -> Vec<String> {
        vec![SOURCE_KEY.to_string()]
    }

    fn pre_register_values(&self, _metric: MetricKind) -> Vec<Vec<String>> {
        [Source::Internal, Source::External]
            .iter()
            .map(|source| vec![source.as_str().to_string()])
            .collect()
    }

    fn values_for_call(&self, _metric: MetricKind, ctx: &CallContext) -> Vec<String> {
        vec![ctx.source().as_str().to_string()]
    }
}
