use crate::constants::*;
use std::fmt;

/// The shape of an RPC, as seen from the server.
///
/// This is the value of the `grpc_type` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrpcType {
    Unary,
    ClientStream,
    ServerStream,
    BidiStream,
}

impl GrpcType {
    /// Classify a method from its streaming flags.
    ///
    /// ```rust
    /// use grpc_prometheus::GrpcType;
    ///
    /// assert_eq!(GrpcType::from_streaming(false, false), GrpcType::Unary);
    /// assert_eq!(GrpcType::from_streaming(true, true), GrpcType::BidiStream);
    /// ```
    pub const fn from_streaming(is_client_stream: bool, is_server_stream: bool) -> Self {
        match (is_client_stream, is_server_stream) {
            (false, false) => GrpcType::Unary,
            (true, false) => GrpcType::ClientStream,
            (false, true) => GrpcType::ServerStream,
            (true, true) => GrpcType::BidiStream,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            GrpcType::Unary => "unary",
            GrpcType::ClientStream => "client_stream",
            GrpcType::ServerStream => "server_stream",
            GrpcType::BidiStream => "bidi_stream",
        }
    }
}

impl fmt::Display for GrpcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one of the metric families exported for a server.
///
/// Extensions receive this to decide which custom labels apply to which metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// `grpc_server_started_total`
    Started,
    /// `grpc_server_handled_total`
    Handled,
    /// `grpc_server_msg_received_total`
    MsgReceived,
    /// `grpc_server_msg_sent_total`
    MsgSent,
    /// `grpc_server_handling_seconds`, only present once the histogram is enabled
    HandlingSeconds,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Started,
        MetricKind::Handled,
        MetricKind::MsgReceived,
        MetricKind::MsgSent,
        MetricKind::HandlingSeconds,
    ];

    /// The metric name before any extension adjusts it.
    pub const fn default_name(&self) -> &'static str {
        match self {
            MetricKind::Started => STARTED_COUNTER_NAME,
            MetricKind::Handled => HANDLED_COUNTER_NAME,
            MetricKind::MsgReceived => MSG_RECEIVED_COUNTER_NAME,
            MetricKind::MsgSent => MSG_SENT_COUNTER_NAME,
            MetricKind::HandlingSeconds => HANDLING_HISTOGRAM_NAME,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            MetricKind::Started => STARTED_COUNTER_DESCRIPTION,
            MetricKind::Handled => HANDLED_COUNTER_DESCRIPTION,
            MetricKind::MsgReceived => MSG_RECEIVED_COUNTER_DESCRIPTION,
            MetricKind::MsgSent => MSG_SENT_COUNTER_DESCRIPTION,
            MetricKind::HandlingSeconds => HANDLING_HISTOGRAM_DESCRIPTION,
        }
    }

    /// The labels every series of this family carries, after the custom ones.
    pub const fn fixed_labels(&self) -> &'static [&'static str] {
        match self {
            MetricKind::Handled => &[TYPE_KEY, SERVICE_KEY, METHOD_KEY, CODE_KEY],
            _ => &[TYPE_KEY, SERVICE_KEY, METHOD_KEY],
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

/// Split a full gRPC method name (`/package.Service/Method`) into
/// its service and method parts.
///
/// Names that don't contain a separator are reported as `unknown`.
pub fn split_method_name(full_method: &str) -> (&str, &str) {
    let full_method = full_method.strip_prefix('/').unwrap_or(full_method);
    match full_method.split_once('/') {
        Some((service, method)) => (service, method),
        None => (UNKNOWN_VALUE, UNKNOWN_VALUE),
    }
}

/// Put the custom label values in front of the fixed ones, in the same
/// order as the keys in the metric definition.
pub(crate) fn label_values<'a>(custom: &'a [String], fixed: &[&'a str]) -> Vec<&'a str> {
    let mut values = Vec::with_capacity(custom.len() + fixed.len());
    values.extend(custom.iter().map(String::as_str));
    values.extend_from_slice(fixed);
    values
}
