// Metrics
pub const STARTED_COUNTER_NAME: &str = "grpc_server_started_total";
pub const HANDLED_COUNTER_NAME: &str = "grpc_server_handled_total";
pub const MSG_RECEIVED_COUNTER_NAME: &str = "grpc_server_msg_received_total";
pub const MSG_SENT_COUNTER_NAME: &str = "grpc_server_msg_sent_total";
pub const HANDLING_HISTOGRAM_NAME: &str = "grpc_server_handling_seconds";

// Descriptions
pub const STARTED_COUNTER_DESCRIPTION: &str = "Total number of RPCs started on the server.";
pub const HANDLED_COUNTER_DESCRIPTION: &str =
    "Total number of RPCs completed on the server, regardless of success or failure.";
pub const MSG_RECEIVED_COUNTER_DESCRIPTION: &str =
    "Total number of RPC stream messages received on the server.";
pub const MSG_SENT_COUNTER_DESCRIPTION: &str =
    "Total number of gRPC stream messages sent by the server.";
pub const HANDLING_HISTOGRAM_DESCRIPTION: &str = "Histogram of response latency (seconds) of gRPC that had been application-level handled by the server.";

// Labels
pub const TYPE_KEY: &str = "grpc_type";
pub const SERVICE_KEY: &str = "grpc_service";
pub const METHOD_KEY: &str = "grpc_method";
pub const CODE_KEY: &str = "grpc_code";
pub const SOURCE_KEY: &str = "source";

// Values
pub const UNKNOWN_VALUE: &str = "unknown";

// Environment
pub const ENABLE_HISTOGRAM_ENV: &str = "GRPC_PROMETHEUS_ENABLE_HANDLING_TIME_HISTOGRAM";

/// We use the histogram buckets recommended by the OpenTelemetry specification
/// https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/metrics/sdk.md#explicit-bucket-histogram-aggregation
pub const DEFAULT_HISTOGRAM_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];
