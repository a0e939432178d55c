//! Counting the messages of streaming calls.

use crate::context::CallContext;
use crate::reporter::MessageCounter;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tonic::Status;

/// The server side of a streaming call.
#[async_trait]
pub trait ServerStream: Send {
    type Request: Send;
    type Response: Send;

    fn context(&self) -> &CallContext;

    async fn send_message(&mut self, message: Self::Response) -> Result<(), Status>;

    /// Returns `Ok(None)` once the client has finished sending.
    async fn receive_message(&mut self) -> Result<Option<Self::Request>, Status>;
}

/// Wraps a [`ServerStream`] and counts every message successfully sent or
/// received through it.
///
/// Errors and the end of the stream are passed through unchanged and are not
/// counted.
#[derive(Debug)]
pub struct MonitoredServerStream<S> {
    inner: S,
    counter: MessageCounter,
}

impl<S: ServerStream> MonitoredServerStream<S> {
    pub fn new(inner: S, counter: MessageCounter) -> Self {
        Self { inner, counter }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: ServerStream> ServerStream for MonitoredServerStream<S> {
    type Request = S::Request;
    type Response = S::Response;

    fn context(&self) -> &CallContext {
        self.inner.context()
    }

    async fn send_message(&mut self, message: Self::Response) -> Result<(), Status> {
        let result = self.inner.send_message(message).await;
        if result.is_ok() {
            self.counter.sent_message(self.inner.context());
        }
        result
    }

    async fn receive_message(&mut self) -> Result<Option<Self::Request>, Status> {
        let result = self.inner.receive_message().await;
        if let Ok(Some(_)) = result {
            self.counter.received_message(self.inner.context());
        }
        result
    }
}

/// A [`ServerStream`] for tonic handlers.
///
/// Requests are read from the inbound stream (a [`tonic::Streaming`] or any
/// other stream of results) and responses are written to the channel whose
/// receiver is returned to tonic as the response stream.
#[derive(Debug)]
pub struct TonicServerStream<In, Resp> {
    context: CallContext,
    inbound: In,
    outbound: mpsc::Sender<Result<Resp, Status>>,
}

impl<In, Resp> TonicServerStream<In, Resp> {
    pub fn new(
        context: CallContext,
        inbound: In,
        outbound: mpsc::Sender<Result<Resp, Status>>,
    ) -> Self {
        Self {
            context,
            inbound,
            outbound,
        }
    }

    /// Take the inbound stream out of a tonic request, keeping its context.
    pub fn from_request(
        request: tonic::Request<In>,
        outbound: mpsc::Sender<Result<Resp, Status>>,
    ) -> Self {
        let context = CallContext::from_request(&request);
        Self::new(context, request.into_inner(), outbound)
    }
}

#[async_trait]
impl<In, Req, Resp> ServerStream for TonicServerStream<In, Resp>
where
    In: Stream<Item = Result<Req, Status>> + Unpin + Send,
    Req: Send,
    Resp: Send,
{
    type Request = Req;
    type Response = Resp;

    fn context(&self) -> &CallContext {
        &self.context
    }

    async fn send_message(&mut self, message: Resp) -> Result<(), Status> {
        self.outbound
            .send(Ok(message))
            .await
            .map_err(|_| Status::cancelled("response stream was dropped"))
    }

    async fn receive_message(&mut self) -> Result<Option<Req>, Status> {
        self.inbound.next().await.transpose()
    }
}
