//! A process-wide [`ServerMetrics`] instance for servers that don't want to
//! pass one around.

use crate::error::Result;
use crate::metrics::ServerMetrics;
use crate::options::HistogramOptions;
use crate::service_info::ServiceInfoProvider;
use crate::settings::get_settings;
use once_cell::sync::OnceCell;
use tracing::debug;

static DEFAULT_SERVER_METRICS: OnceCell<ServerMetrics> = OnceCell::new();

/// The default server metrics, created and registered on first use.
///
/// They are configured from the global [settings](crate::settings) and
/// registered on the settings' Prometheus registry
/// ([`prometheus::default_registry`] unless configured otherwise).
///
/// ## Panics
///
/// If registering the metrics fails, for example because metrics with the
/// same names were already registered on that registry.
pub fn default_server_metrics() -> &'static ServerMetrics {
    DEFAULT_SERVER_METRICS.get_or_init(|| {
        let settings = get_settings();
        let metrics = ServerMetrics::builder()
            .counter_options(settings.counter_options.clone())
            .build()
            .expect("Failed to define default gRPC server metrics");
        if settings.handling_time_histogram {
            metrics
                .enable_handling_time_histogram(settings.histogram_options.clone())
                .expect("Failed to enable grpc_server_handling_seconds histogram");
        }
        metrics
            .register(&settings.prometheus_registry)
            .expect("Failed to register default gRPC server metrics");
        debug!("registered default gRPC server metrics");
        metrics
    })
}

/// Pre-register every method of the server on the default server metrics.
///
/// This should be called *after* all services have been added to the server.
/// See [`ServerMetrics::initialize_metrics`].
pub fn register<P>(server: &P) -> Result<()>
where
    P: ServiceInfoProvider + ?Sized,
{
    default_server_metrics().initialize_metrics(server)
}

/// Turn on the handling time histogram of the default server metrics.
///
/// Prefer enabling it through the settings, so that it is in place before
/// the metrics are first scraped.
pub fn enable_handling_time_histogram(options: HistogramOptions) -> Result<()> {
    default_server_metrics().enable_handling_time_histogram(options)
}
