mod common;

use common::{counter, init_logging, series_count, MockStream};
use grpc_prometheus::{
    CallContext, MetricKind, ServerExtension, ServerMetrics, ServerStream, Source,
    SourceExtension, StreamServerInfo, UnaryServerInfo,
};
use tonic::{Request, Response, Status};

fn ping_labels<'a>(source: &'a str, code: &'a str) -> [(&'a str, &'a str); 5] {
    [
        ("source", source),
        ("grpc_type", "unary"),
        ("grpc_service", "echo.v1.Echo"),
        ("grpc_method", "Ping"),
        ("grpc_code", code),
    ]
}

#[tokio::test]
async fn sources_get_their_own_series() {
    let metrics = ServerMetrics::builder()
        .extension(SourceExtension)
        .build()
        .unwrap();
    let info = UnaryServerInfo::new("/echo.v1.Echo/Ping");

    for source in [Source::Internal, Source::External] {
        let mut request = Request::new(());
        request.extensions_mut().insert(source);
        metrics
            .tonic_unary_interceptor(request, &info, |_| async { Ok(Response::new(())) })
            .await
            .unwrap();
    }

    let handled = "grpc_server_handled_total";
    assert_eq!(counter(&metrics, handled, &ping_labels("internal", "OK")), Some(1));
    assert_eq!(counter(&metrics, handled, &ping_labels("external", "OK")), Some(1));
    assert_eq!(series_count(&metrics, handled), 2);
}

#[tokio::test]
async fn requests_without_a_source_are_internal() {
    let metrics = ServerMetrics::builder()
        .extension(SourceExtension)
        .build()
        .unwrap();
    let info = UnaryServerInfo::new("/echo.v1.Echo/Ping");

    metrics
        .tonic_unary_interceptor(Request::new(()), &info, |_| async {
            Err::<Response<()>, _>(Status::permission_denied("nope"))
        })
        .await
        .unwrap_err();

    assert_eq!(
        counter(
            &metrics,
            "grpc_server_handled_total",
            &ping_labels("internal", "PermissionDenied")
        ),
        Some(1)
    );
}

struct TooManyValues;

impl ServerExtension for TooManyValues {
    fn custom_labels(&self, _metric: MetricKind) -> Vec<String> {
        vec!["tenant".to_string()]
    }

    fn values_for_call(&self, _metric: MetricKind, _ctx: &CallContext) -> Vec<String> {
        vec!["acme".to_string(), "eu-west".to_string()]
    }
}

#[tokio::test]
#[should_panic(expected = "custom label values")]
async fn wrong_number_of_values_panics() {
    init_logging();
    let metrics = ServerMetrics::builder()
        .extension(TooManyValues)
        .build()
        .unwrap();
    let info = UnaryServerInfo::new("/echo.v1.Echo/Ping");
    let _ = metrics
        .unary_server_interceptor(CallContext::new(), (), &info, |_, _| async {
            Ok::<_, Status>(())
        })
        .await;
}

/// Labels only the message counters, using a request header.
struct ClientExtension;

impl ServerExtension for ClientExtension {
    fn custom_labels(&self, metric: MetricKind) -> Vec<String> {
        match metric {
            MetricKind::MsgReceived | MetricKind::MsgSent => vec!["client".to_string()],
            _ => Vec::new(),
        }
    }

    fn values_for_call(&self, metric: MetricKind, ctx: &CallContext) -> Vec<String> {
        if self.custom_labels(metric).is_empty() {
            return Vec::new();
        }
        let client = ctx
            .metadata()
            .get("x-client")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("anonymous");
        vec![client.to_string()]
    }

    fn adjust_metric_name(&self, name: &str) -> String {
        format!("edge_{name}")
    }
}

#[tokio::test]
async fn message_counters_use_the_stream_context() {
    let metrics = ServerMetrics::builder()
        .extension(ClientExtension)
        .build()
        .unwrap();
    let info = StreamServerInfo::new("/echo.v1.Echo/Chat", true, true);

    let mut request = Request::new(());
    request
        .metadata_mut()
        .insert("x-client", "mobile".parse().unwrap());
    let ctx = CallContext::from_request(&request);
    let stream = MockStream::new(ctx).with_requests(["hi"]);

    metrics
        .stream_server_interceptor(stream, &info, |mut stream| async move {
            if let Some(message) = stream.receive_message().await? {
                stream.send_message(message).await?;
            }
            Ok::<_, Status>(())
        })
        .await
        .unwrap();

    let message_labels = [
        ("client", "mobile"),
        ("grpc_type", "bidi_stream"),
        ("grpc_service", "echo.v1.Echo"),
        ("grpc_method", "Chat"),
    ];
    assert_eq!(
        counter(&metrics, "edge_grpc_server_msg_received_total", &message_labels),
        Some(1)
    );
    assert_eq!(
        counter(&metrics, "edge_grpc_server_msg_sent_total", &message_labels),
        Some(1)
    );
    // The other metrics keep only the fixed labels
    assert_eq!(
        counter(
            &metrics,
            "edge_grpc_server_started_total",
            &message_labels[1..]
        ),
        Some(1)
    );
    assert_eq!(series_count(&metrics, "grpc_server_started_total"), 0);
}
