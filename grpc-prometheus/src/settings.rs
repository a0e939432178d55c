//! Customize the global settings used by the default [`ServerMetrics`] instance.
//!
//! These settings only affect [`default_server_metrics`] and the free functions
//! built on it. Servers that construct their own [`ServerMetrics`] configure
//! them through [`ServerMetrics::builder`] instead.
//!
//! See [`ServerMetricsSettingsBuilder`] for more details on the available options.
//!
//! [`ServerMetrics`]: crate::ServerMetrics
//! [`ServerMetrics::builder`]: crate::ServerMetrics::builder
//! [`default_server_metrics`]: crate::default_server_metrics

use crate::constants::ENABLE_HISTOGRAM_ENV;
use crate::options::{CounterOptions, HistogramOptions};
use once_cell::sync::OnceCell;
use prometheus::Registry;
use std::{env, fmt};
use thiserror::Error;

pub(crate) static SERVER_METRICS_SETTINGS: OnceCell<ServerMetricsSettings> = OnceCell::new();

/// Load the settings configured by the user or use the defaults.
///
/// Note that attempting to set the settings after this function is called will fail.
pub(crate) fn get_settings() -> &'static ServerMetricsSettings {
    SERVER_METRICS_SETTINGS.get_or_init(|| ServerMetricsSettingsBuilder::default().build())
}

pub struct ServerMetricsSettings {
    pub(crate) prometheus_registry: Registry,
    pub(crate) counter_options: CounterOptions,
    pub(crate) histogram_options: HistogramOptions,
    pub(crate) handling_time_histogram: bool,
}

impl ServerMetricsSettings {
    pub fn builder() -> ServerMetricsSettingsBuilder {
        ServerMetricsSettingsBuilder::default()
    }

    /// The registry the default metrics are registered on.
    pub fn prometheus_registry(&self) -> &Registry {
        &self.prometheus_registry
    }

    pub fn handling_time_histogram(&self) -> bool {
        self.handling_time_histogram
    }
}

#[derive(Default)]
pub struct ServerMetricsSettingsBuilder {
    prometheus_registry: Option<Registry>,
    counter_options: Option<CounterOptions>,
    histogram_options: Option<HistogramOptions>,
    handling_time_histogram: Option<bool>,
}

impl ServerMetricsSettingsBuilder {
    /// Register the default metrics on this registry instead of
    /// [`prometheus::default_registry`].
    pub fn prometheus_registry(mut self, registry: Registry) -> Self {
        self.prometheus_registry = Some(registry);
        self
    }

    pub fn counter_options(mut self, counter_options: CounterOptions) -> Self {
        self.counter_options = Some(counter_options);
        self
    }

    /// Options for the handling time histogram, if it gets enabled.
    pub fn histogram_options(mut self, histogram_options: HistogramOptions) -> Self {
        self.histogram_options = Some(histogram_options);
        self
    }

    /// Enable the `grpc_server_handling_seconds` histogram.
    ///
    /// The priority for where this is loaded from is:
    /// 1. This method
    /// 2. `GRPC_PROMETHEUS_ENABLE_HANDLING_TIME_HISTOGRAM` (`true` or `1`, at runtime)
    /// 3. Disabled
    pub fn enable_handling_time_histogram(mut self, enabled: bool) -> Self {
        self.handling_time_histogram = Some(enabled);
        self
    }

    /// Set the global settings. This returns an error if the
    /// settings have already been initialized.
    ///
    /// Note: this function should only be called once and MUST be called before
    /// the default server metrics are used.
    pub fn try_init(self) -> Result<&'static ServerMetricsSettings, SettingsInitializationError> {
        let mut initialized = false;
        let settings = SERVER_METRICS_SETTINGS.get_or_init(|| {
            initialized = true;
            self.build()
        });
        if !initialized {
            return Err(SettingsInitializationError::AlreadyInitialized);
        }
        Ok(settings)
    }

    /// Set the global settings.
    ///
    /// Note: this function can only be called once and MUST be called before
    /// the default server metrics are used.
    ///
    /// ## Panics
    ///
    /// This function will panic if the settings have already been initialized.
    pub fn init(self) -> &'static ServerMetricsSettings {
        self.try_init().unwrap()
    }

    fn build(self) -> ServerMetricsSettings {
        ServerMetricsSettings {
            prometheus_registry: self
                .prometheus_registry
                .unwrap_or_else(|| prometheus::default_registry().clone()),
            counter_options: self.counter_options.unwrap_or_default(),
            histogram_options: self.histogram_options.unwrap_or_default(),
            handling_time_histogram: self
                .handling_time_histogram
                .unwrap_or_else(histogram_enabled_from_env),
        }
    }
}

impl fmt::Debug for ServerMetricsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerMetricsSettings")
            .field("counter_options", &self.counter_options)
            .field("histogram_options", &self.histogram_options)
            .field("handling_time_histogram", &self.handling_time_histogram)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ServerMetricsSettingsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerMetricsSettingsBuilder")
            .field("prometheus_registry", &self.prometheus_registry.is_some())
            .field("counter_options", &self.counter_options)
            .field("histogram_options", &self.histogram_options)
            .field("handling_time_histogram", &self.handling_time_histogram)
            .finish()
    }
}

fn histogram_enabled_from_env() -> bool {
    env::var(ENABLE_HISTOGRAM_ENV)
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

#[derive(Debug, Error)]
pub enum SettingsInitializationError {
    #[error("gRPC server metrics settings have already been initialized")]
    AlreadyInitialized,
}
