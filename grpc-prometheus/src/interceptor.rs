use crate::codes::{result_code, ToGrpcCode};
use crate::context::CallContext;
use crate::labels::GrpcType;
use crate::metrics::ServerMetrics;
use crate::reporter::ServerReporter;
use crate::stream::{MonitoredServerStream, ServerStream};
use std::future::Future;

/// Describes a unary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryServerInfo {
    /// The full method name, `/package.Service/Method`
    pub full_method: String,
}

impl UnaryServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
        }
    }
}

/// Describes a streaming call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamServerInfo {
    /// The full method name, `/package.Service/Method`
    pub full_method: String,
    pub is_client_stream: bool,
    pub is_server_stream: bool,
}

impl StreamServerInfo {
    pub fn new(
        full_method: impl Into<String>,
        is_client_stream: bool,
        is_server_stream: bool,
    ) -> Self {
        Self {
            full_method: full_method.into(),
            is_client_stream,
            is_server_stream,
        }
    }

    /// A streaming call that streams in neither direction is treated as
    /// bidirectional.
    pub fn grpc_type(&self) -> GrpcType {
        match (self.is_client_stream, self.is_server_stream) {
            (true, false) => GrpcType::ClientStream,
            (false, true) => GrpcType::ServerStream,
            _ => GrpcType::BidiStream,
        }
    }
}

impl ServerMetrics {
    /// Monitor a unary call.
    ///
    /// The request counts as one received message and a successful response as
    /// one sent message. The handler's error, if any, determines the `grpc_code`.
    pub async fn unary_server_interceptor<Req, Resp, E, H, Fut>(
        &self,
        ctx: CallContext,
        request: Req,
        info: &UnaryServerInfo,
        handler: H,
    ) -> Result<Resp, E>
    where
        H: FnOnce(CallContext, Req) -> Fut,
        Fut: Future<Output = Result<Resp, E>>,
        E: ToGrpcCode,
    {
        let reporter = ServerReporter::start(self, &ctx, GrpcType::Unary, &info.full_method);
        reporter.received_message(&ctx);

        let result = handler(ctx.clone(), request).await;

        let succeeded = result.is_ok();
        let messages = reporter.message_counter();
        reporter.handled(&ctx, result_code(&result));
        if succeeded {
            messages.sent_message(&ctx);
        }
        result
    }

    /// Monitor a unary tonic handler.
    ///
    /// The call context is taken from the request's metadata and extensions.
    pub async fn tonic_unary_interceptor<Req, Resp, H, Fut>(
        &self,
        request: tonic::Request<Req>,
        info: &UnaryServerInfo,
        handler: H,
    ) -> Result<tonic::Response<Resp>, tonic::Status>
    where
        H: FnOnce(tonic::Request<Req>) -> Fut,
        Fut: Future<Output = Result<tonic::Response<Resp>, tonic::Status>>,
    {
        let ctx = CallContext::from_request(&request);
        self.unary_server_interceptor(ctx, request, info, |_, request| handler(request))
            .await
    }

    /// Monitor a streaming call.
    ///
    /// The handler gets the stream wrapped in a [`MonitoredServerStream`] so
    /// that every message it successfully sends or receives is counted.
    pub async fn stream_server_interceptor<S, T, E, H, Fut>(
        &self,
        stream: S,
        info: &StreamServerInfo,
        handler: H,
    ) -> Result<T, E>
    where
        S: ServerStream,
        H: FnOnce(MonitoredServerStream<S>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ToGrpcCode,
    {
        let ctx = stream.context().clone();
        let reporter = ServerReporter::start(self, &ctx, info.grpc_type(), &info.full_method);

        let result = handler(MonitoredServerStream::new(stream, reporter.message_counter())).await;

        reporter.handled(&ctx, result_code(&result));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_flags_map_to_types() {
        let info = |client, server| StreamServerInfo::new("/Echo/Chat", client, server).grpc_type();
        assert_eq!(info(true, false), GrpcType::ClientStream);
        assert_eq!(info(false, true), GrpcType::ServerStream);
        assert_eq!(info(true, true), GrpcType::BidiStream);
        assert_eq!(info(false, false), GrpcType::BidiStream);
    }
}
