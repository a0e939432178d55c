use crate::codes::{code_label, ALL_CODES};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::extension::{DefaultExtension, ServerExtension};
use crate::labels::{label_values, MetricKind};
use crate::options::{CounterOptions, HistogramOptions};
use crate::service_info::{MethodInfo, ServiceInfoProvider};
use once_cell::sync::OnceCell;
use prometheus::core::{Collector, Desc};
use prometheus::{proto, Histogram, HistogramVec, IntCounterVec, Registry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The metrics of a gRPC server.
///
/// This is a cheap handle: clones share the same underlying metrics. Pass it
/// to the interceptors (see [`unary_server_interceptor`] and
/// [`stream_server_interceptor`]) and register it on a Prometheus [`Registry`]
/// to export the metrics.
///
/// [`unary_server_interceptor`]: ServerMetrics::unary_server_interceptor
/// [`stream_server_interceptor`]: ServerMetrics::stream_server_interceptor
#[derive(Clone)]
pub struct ServerMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    extension: Arc<dyn ServerExtension>,
    started: Family<IntCounterVec>,
    handled: Family<IntCounterVec>,
    msg_received: Family<IntCounterVec>,
    msg_sent: Family<IntCounterVec>,
    // Name and labels are resolved at construction so enabling the histogram
    // later doesn't consult the extension again.
    histogram_name: String,
    histogram_labels: Vec<String>,
    histogram: OnceCell<(Family<HistogramVec>, HistogramOptions)>,
}

/// Custom label values to pre-register, checked against every family up front.
struct PreRegisterTuples {
    started: Vec<Vec<String>>,
    handled: Vec<Vec<String>>,
    msg_received: Vec<Vec<String>>,
    msg_sent: Vec<Vec<String>>,
    histogram: Vec<Vec<String>>,
}

/// A metric vector together with the custom label names it was defined with.
struct Family<V> {
    kind: MetricKind,
    vec: V,
    custom_labels: Vec<String>,
}

impl Family<IntCounterVec> {
    fn new(
        kind: MetricKind,
        extension: &dyn ServerExtension,
        options: &CounterOptions,
    ) -> Result<Self> {
        let custom_labels = custom_labels(extension, kind)?;
        let name = extension.adjust_metric_name(kind.default_name());
        let vec = IntCounterVec::new(
            options.to_opts(&name, kind.description()),
            &label_values(&custom_labels, kind.fixed_labels()),
        )?;
        Ok(Family {
            kind,
            vec,
            custom_labels,
        })
    }
}

/// Query the extension for the custom labels of a metric, making sure it
/// answers the same way twice.
fn custom_labels(extension: &dyn ServerExtension, metric: MetricKind) -> Result<Vec<String>> {
    let first = extension.custom_labels(metric);
    let second = extension.custom_labels(metric);
    if first != second {
        return Err(Error::InconsistentLabels {
            metric,
            first,
            second,
        });
    }
    Ok(first)
}

impl ServerMetrics {
    /// Create the server metrics with no custom labels.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("default gRPC server metric definitions are valid")
    }

    pub fn builder() -> ServerMetricsBuilder {
        ServerMetricsBuilder::default()
    }

    /// Turn on the `grpc_server_handling_seconds` histogram.
    ///
    /// Histograms can be expensive for Prometheus to store and query, so this is
    /// off by default. Enable it before registering the metrics on a registry.
    ///
    /// Only the first call has an effect. Later calls, including ones racing
    /// against in-flight requests, leave the existing histogram untouched and
    /// ignore their options.
    pub fn enable_handling_time_histogram(&self, options: HistogramOptions) -> Result<()> {
        let mut created = false;
        let (_, current) = self.inner.histogram.get_or_try_init(|| {
            created = true;
            let family = self.build_histogram(&options)?;
            Ok::<_, Error>((family, options.clone()))
        })?;

        if created {
            debug!(
                name = %self.inner.histogram_name,
                "enabled gRPC server handling time histogram"
            );
        } else if *current != options {
            warn!(
                name = %self.inner.histogram_name,
                "handling time histogram is already enabled, ignoring new options"
            );
        }
        Ok(())
    }

    fn build_histogram(&self, options: &HistogramOptions) -> Result<Family<HistogramVec>> {
        let kind = MetricKind::HandlingSeconds;
        let opts = options.to_opts(&self.inner.histogram_name, kind.description());
        // The vec only checks the buckets when it creates its first series,
        // so build a standalone histogram to surface bad buckets here.
        Histogram::with_opts(opts.clone())?;
        let family = Family {
            kind,
            vec: HistogramVec::new(
                opts,
                &label_values(&self.inner.histogram_labels, kind.fixed_labels()),
            )?,
            custom_labels: self.inner.histogram_labels.clone(),
        };
        Ok(family)
    }

    pub fn is_handling_time_histogram_enabled(&self) -> bool {
        self.inner.histogram.get().is_some()
    }

    /// Register these metrics on the given registry.
    ///
    /// Registering the same metrics twice on one registry is an error.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.clone()))?;
        Ok(())
    }

    /// Initialize every metric of every method the server exposes to zero.
    ///
    /// This should be called after all services have been added to the server
    /// and before it starts taking traffic, so that dashboards and alerts
    /// see zeros instead of missing series. Methods added afterwards are still
    /// counted, they just won't have zero-valued series until they're called.
    ///
    /// Calling this several times is harmless. If the extension supplies
    /// value tuples of the wrong length, nothing is pre-registered.
    pub fn initialize_metrics<P>(&self, server: &P) -> Result<()>
    where
        P: ServiceInfoProvider + ?Sized,
    {
        let inner = &self.inner;
        let tuples = PreRegisterTuples {
            started: self.pre_register_values(&inner.started)?,
            handled: self.pre_register_values(&inner.handled)?,
            msg_received: self.pre_register_values(&inner.msg_received)?,
            msg_sent: self.pre_register_values(&inner.msg_sent)?,
            histogram: match inner.histogram.get() {
                Some((histogram, _)) => self.pre_register_values(histogram)?,
                None => Vec::new(),
            },
        };

        let mut methods = 0;
        for (service_name, info) in server.service_info() {
            for method in &info.methods {
                self.pre_register_method(&service_name, method, &tuples)?;
                methods += 1;
            }
        }
        debug!(methods, "pre-registered gRPC server metrics");
        Ok(())
    }

    fn pre_register_method(
        &self,
        service_name: &str,
        method: &MethodInfo,
        tuples: &PreRegisterTuples,
    ) -> Result<()> {
        let grpc_type = method.grpc_type();
        let fixed = [grpc_type.as_str(), service_name, method.name.as_str()];
        let inner = &self.inner;

        // Requesting the series creates it at zero without incrementing it.
        for (family, tuples) in [
            (&inner.started, &tuples.started),
            (&inner.msg_received, &tuples.msg_received),
            (&inner.msg_sent, &tuples.msg_sent),
        ] {
            for values in tuples {
                family
                    .vec
                    .get_metric_with_label_values(&label_values(values, &fixed))?;
            }
        }

        if let Some((histogram, _)) = inner.histogram.get() {
            for values in &tuples.histogram {
                histogram
                    .vec
                    .get_metric_with_label_values(&label_values(values, &fixed))?;
            }
        }

        for values in &tuples.handled {
            for code in ALL_CODES {
                let fixed = [
                    grpc_type.as_str(),
                    service_name,
                    method.name.as_str(),
                    code_label(code),
                ];
                inner
                    .handled
                    .vec
                    .get_metric_with_label_values(&label_values(values, &fixed))?;
            }
        }
        Ok(())
    }

    fn pre_register_values<V>(&self, family: &Family<V>) -> Result<Vec<Vec<String>>> {
        let tuples = self.inner.extension.pre_register_values(family.kind);
        for values in &tuples {
            check_cardinality(family, values.len())?;
        }
        Ok(tuples)
    }

    /// Compute the custom label values of a call for one metric.
    ///
    /// ## Panics
    ///
    /// If the extension returns the wrong number of values.
    fn custom_values<V>(&self, family: &Family<V>, ctx: &CallContext) -> Vec<String> {
        let values = self.inner.extension.values_for_call(family.kind, ctx);
        if let Err(err) = check_cardinality(family, values.len()) {
            error!(%err, "invalid gRPC server metrics extension");
            panic!("{err}");
        }
        values
    }

    pub(crate) fn inc_started(&self, ctx: &CallContext, fixed: &[&str; 3]) {
        self.inc(&self.inner.started, ctx, fixed);
    }

    pub(crate) fn inc_msg_received(&self, ctx: &CallContext, fixed: &[&str; 3]) {
        self.inc(&self.inner.msg_received, ctx, fixed);
    }

    pub(crate) fn inc_msg_sent(&self, ctx: &CallContext, fixed: &[&str; 3]) {
        self.inc(&self.inner.msg_sent, ctx, fixed);
    }

    pub(crate) fn inc_handled(&self, ctx: &CallContext, fixed: &[&str; 4]) {
        self.inc(&self.inner.handled, ctx, fixed);
    }

    /// Does nothing while the histogram is disabled.
    pub(crate) fn observe_handling_seconds(
        &self,
        ctx: &CallContext,
        fixed: &[&str; 3],
        seconds: f64,
    ) {
        if let Some((histogram, _)) = self.inner.histogram.get() {
            let custom = self.custom_values(histogram, ctx);
            histogram
                .vec
                .with_label_values(&label_values(&custom, fixed))
                .observe(seconds);
        }
    }

    fn inc(&self, family: &Family<IntCounterVec>, ctx: &CallContext, fixed: &[&str]) {
        let custom = self.custom_values(family, ctx);
        family
            .vec
            .with_label_values(&label_values(&custom, fixed))
            .inc();
    }

    fn families(&self) -> [&Family<IntCounterVec>; 4] {
        let inner = &self.inner;
        [
            &inner.started,
            &inner.handled,
            &inner.msg_received,
            &inner.msg_sent,
        ]
    }
}

fn check_cardinality<V>(family: &Family<V>, actual: usize) -> Result<()> {
    let expected = family.custom_labels.len();
    if actual != expected {
        return Err(Error::LabelCardinality {
            metric: family.kind,
            expected,
            actual,
        });
    }
    Ok(())
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServerMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerMetrics")
            .field(
                "handling_time_histogram",
                &self.is_handling_time_histogram_enabled(),
            )
            .finish_non_exhaustive()
    }
}

impl Collector for ServerMetrics {
    /// Describes every metric family, plus the histogram if it is enabled.
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = Vec::new();
        for family in self.families() {
            descs.extend(family.vec.desc());
        }
        if let Some((histogram, _)) = self.inner.histogram.get() {
            descs.extend(histogram.vec.desc());
        }
        descs
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let mut families = Vec::new();
        for family in self.families() {
            families.extend(family.vec.collect());
        }
        if let Some((histogram, _)) = self.inner.histogram.get() {
            families.extend(histogram.vec.collect());
        }
        families
    }
}

/// Builder for [`ServerMetrics`].
#[derive(Default)]
pub struct ServerMetricsBuilder {
    extension: Option<Arc<dyn ServerExtension>>,
    counter_options: CounterOptions,
}

impl ServerMetricsBuilder {
    /// Use an extension to add custom labels to the metrics.
    pub fn extension(mut self, extension: impl ServerExtension + 'static) -> Self {
        self.extension = Some(Arc::new(extension));
        self
    }

    pub fn counter_options(mut self, counter_options: CounterOptions) -> Self {
        self.counter_options = counter_options;
        self
    }

    /// Define the metrics.
    ///
    /// This fails if the extension declares invalid or inconsistent labels.
    pub fn build(self) -> Result<ServerMetrics> {
        let extension: Arc<dyn ServerExtension> = match self.extension {
            Some(extension) => extension,
            None => Arc::new(DefaultExtension),
        };
        let ext = extension.as_ref();
        let options = &self.counter_options;

        let started = Family::new(MetricKind::Started, ext, options)?;
        let handled = Family::new(MetricKind::Handled, ext, options)?;
        let msg_received = Family::new(MetricKind::MsgReceived, ext, options)?;
        let msg_sent = Family::new(MetricKind::MsgSent, ext, options)?;
        let histogram_labels = custom_labels(ext, MetricKind::HandlingSeconds)?;
        let histogram_name = ext.adjust_metric_name(MetricKind::HandlingSeconds.default_name());

        debug!(
            started = ?started.custom_labels,
            handled = ?handled.custom_labels,
            msg_received = ?msg_received.custom_labels,
            msg_sent = ?msg_sent.custom_labels,
            handling_seconds = ?histogram_labels,
            "defined gRPC server metrics with custom labels"
        );

        Ok(ServerMetrics {
            inner: Arc::new(Inner {
                extension,
                started,
                handled,
                msg_received,
                msg_sent,
                histogram_name,
                histogram_labels,
                histogram: OnceCell::new(),
            }),
        })
    }
}

impl fmt::Debug for ServerMetricsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerMetricsBuilder")
            .field("extension", &self.extension.is_some())
            .field("counter_options", &self.counter_options)
            .finish()
    }
}
