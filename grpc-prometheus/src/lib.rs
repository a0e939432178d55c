// Use the unstable `doc_cfg` feature when docs.rs is building the documentation
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]

mod codes;
mod constants;
mod context;
mod error;
mod extension;
mod global;
mod interceptor;
mod labels;
mod metrics;
mod options;
mod reporter;
mod service_info;
pub mod settings;
mod stream;

pub use codes::{code_from_error, code_label, ToGrpcCode, ALL_CODES};
pub use context::{CallContext, Source};
pub use error::{Error, Result};
pub use extension::{DefaultExtension, ServerExtension, SourceExtension};
pub use global::{default_server_metrics, enable_handling_time_histogram, register};
pub use interceptor::{StreamServerInfo, UnaryServerInfo};
pub use labels::{split_method_name, GrpcType, MetricKind};
pub use metrics::{ServerMetrics, ServerMetricsBuilder};
pub use options::{CounterOptions, HistogramOptions};
pub use reporter::{MessageCounter, ServerReporter};
pub use service_info::{MethodInfo, ServiceInfo, ServiceInfoProvider, ServiceTable};
pub use stream::{MonitoredServerStream, ServerStream, TonicServerStream};

/// Names of the exported metrics and their labels.
pub mod names {
    pub use crate::constants::{
        CODE_KEY, HANDLED_COUNTER_NAME, HANDLING_HISTOGRAM_NAME, METHOD_KEY,
        MSG_RECEIVED_COUNTER_NAME, MSG_SENT_COUNTER_NAME, SERVICE_KEY, SOURCE_KEY,
        STARTED_COUNTER_NAME, TYPE_KEY,
    };
}
