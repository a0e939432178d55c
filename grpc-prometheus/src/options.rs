//! Options for the metric definitions.

use crate::constants::DEFAULT_HISTOGRAM_BUCKETS;
use prometheus::{HistogramOpts, Opts};
use std::collections::HashMap;

/// Options applied to every counter of the [`ServerMetrics`](crate::ServerMetrics).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterOptions {
    namespace: Option<String>,
    subsystem: Option<String>,
    const_labels: HashMap<String, String>,
}

impl CounterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix the metric names with `{namespace}_`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Prefix the metric names with `{subsystem}_` (after the namespace).
    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Add a label with the same value on every series.
    pub fn const_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.const_labels.insert(name.into(), value.into());
        self
    }

    pub(crate) fn to_opts(&self, name: &str, help: &str) -> Opts {
        let mut opts = Opts::new(name, help).const_labels(self.const_labels.clone());
        if let Some(namespace) = &self.namespace {
            opts = opts.namespace(namespace.clone());
        }
        if let Some(subsystem) = &self.subsystem {
            opts = opts.subsystem(subsystem.clone());
        }
        opts
    }
}

/// Options for the `grpc_server_handling_seconds` histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOptions {
    buckets: Vec<f64>,
    namespace: Option<String>,
    subsystem: Option<String>,
    const_labels: HashMap<String, String>,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_HISTOGRAM_BUCKETS.to_vec(),
            namespace: None,
            subsystem: None,
            const_labels: HashMap::new(),
        }
    }
}

impl HistogramOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the buckets, represented in seconds, used for the latency histogram.
    ///
    /// If this is not set, the buckets recommended by the [OpenTelemetry specification] are used.
    ///
    /// [OpenTelemetry specification]: https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/metrics/sdk.md#explicit-bucket-histogram-aggregation
    pub fn buckets(mut self, buckets: impl Into<Vec<f64>>) -> Self {
        self.buckets = buckets.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    pub fn const_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.const_labels.insert(name.into(), value.into());
        self
    }

    pub(crate) fn to_opts(&self, name: &str, help: &str) -> HistogramOpts {
        let mut opts = HistogramOpts::new(name, help)
            .const_labels(self.const_labels.clone())
            .buckets(self.buckets.clone());
        if let Some(namespace) = &self.namespace {
            opts = opts.namespace(namespace.clone());
        }
        if let Some(subsystem) = &self.subsystem {
            opts = opts.subsystem(subsystem.clone());
        }
        opts
    }
}
