use crate::codes::code_label;
use crate::context::CallContext;
use crate::labels::{split_method_name, GrpcType};
use crate::metrics::ServerMetrics;
use std::sync::Arc;
use std::time::Instant;
use tonic::Code;

/// Records the lifecycle of a single call.
///
/// [`start`](ServerReporter::start) counts the call as started, and
/// [`handled`](ServerReporter::handled) consumes the reporter so that a call
/// can only be counted as handled once. A reporter that is dropped without
/// being handled leaves the call counted as started only.
///
/// The interceptors create one of these per call. Use it directly only when
/// wiring the metrics into a transport the interceptors don't cover.
#[derive(Debug)]
pub struct ServerReporter {
    messages: MessageCounter,
    start: Option<Instant>,
}

impl ServerReporter {
    pub fn start(
        metrics: &ServerMetrics,
        ctx: &CallContext,
        grpc_type: GrpcType,
        full_method: &str,
    ) -> Self {
        let (service, method) = split_method_name(full_method);
        let messages = MessageCounter {
            metrics: metrics.clone(),
            labels: Arc::new(MethodLabels {
                grpc_type,
                service: service.to_string(),
                method: method.to_string(),
            }),
        };

        // Only read the clock if the latency is going to be recorded
        let start = metrics
            .is_handling_time_histogram_enabled()
            .then(Instant::now);
        metrics.inc_started(ctx, &messages.labels.values());

        Self { messages, start }
    }

    pub fn received_message(&self, ctx: &CallContext) {
        self.messages.received_message(ctx);
    }

    pub fn sent_message(&self, ctx: &CallContext) {
        self.messages.sent_message(ctx);
    }

    /// A handle to count the messages of this call from a stream wrapper.
    pub fn message_counter(&self) -> MessageCounter {
        self.messages.clone()
    }

    pub fn handled(self, ctx: &CallContext, code: Code) {
        let labels = &self.messages.labels;
        let metrics = &self.messages.metrics;
        let [grpc_type, service, method] = labels.values();
        metrics.inc_handled(ctx, &[grpc_type, service, method, code_label(code)]);

        if let Some(start) = self.start {
            metrics.observe_handling_seconds(
                ctx,
                &labels.values(),
                start.elapsed().as_secs_f64(),
            );
        }
    }
}

/// Counts the messages of one call.
///
/// Cloning it is cheap; every clone counts against the same call labels.
#[derive(Debug, Clone)]
pub struct MessageCounter {
    metrics: ServerMetrics,
    labels: Arc<MethodLabels>,
}

impl MessageCounter {
    pub fn received_message(&self, ctx: &CallContext) {
        self.metrics.inc_msg_received(ctx, &self.labels.values());
    }

    pub fn sent_message(&self, ctx: &CallContext) {
        self.metrics.inc_msg_sent(ctx, &self.labels.values());
    }
}

#[derive(Debug)]
struct MethodLabels {
    grpc_type: GrpcType,
    service: String,
    method: String,
}

impl MethodLabels {
    /// Values for the `grpc_type`, `grpc_service` and `grpc_method` labels
    fn values(&self) -> [&str; 3] {
        [self.grpc_type.as_str(), &self.service, &self.method]
    }
}
