#![allow(dead_code)]

use async_trait::async_trait;
use grpc_prometheus::{CallContext, ServerStream};
use prometheus::core::Collector;
use prometheus::proto::{Metric, MetricFamily};
use std::collections::VecDeque;
use tonic::Status;

/// Show the crate's logs in the output of failing tests.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Find the series of a metric with exactly these labels.
pub fn find<'a>(
    families: &'a [MetricFamily],
    name: &str,
    labels: &[(&str, &str)],
) -> Option<&'a Metric> {
    families
        .iter()
        .filter(|family| family.get_name() == name)
        .flat_map(|family| family.get_metric())
        .find(|metric| {
            let pairs = metric.get_label();
            pairs.len() == labels.len()
                && labels.iter().all(|(key, value)| {
                    pairs
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                })
        })
}

pub fn counter(collector: &impl Collector, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
    find(&collector.collect(), name, labels).map(|metric| metric.get_counter().get_value() as u64)
}

pub fn histogram_count(
    collector: &impl Collector,
    name: &str,
    labels: &[(&str, &str)],
) -> Option<u64> {
    find(&collector.collect(), name, labels)
        .map(|metric| metric.get_histogram().get_sample_count())
}

pub fn series_count(collector: &impl Collector, name: &str) -> usize {
    collector
        .collect()
        .iter()
        .filter(|family| family.get_name() == name)
        .map(|family| family.get_metric().len())
        .sum()
}

/// Sum of a counter over every series matching the given labels.
pub fn counter_sum(collector: &impl Collector, name: &str, labels: &[(&str, &str)]) -> u64 {
    collector
        .collect()
        .iter()
        .filter(|family| family.get_name() == name)
        .flat_map(|family| family.get_metric().to_vec())
        .filter(|metric| {
            labels.iter().all(|(key, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
            })
        })
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

/// An in-memory stream that replays scripted requests and records responses.
pub struct MockStream {
    context: CallContext,
    incoming: VecDeque<Result<String, Status>>,
    pub sent: Vec<String>,
    /// Sends with these (zero-based) indexes fail with `Unavailable`.
    failing_sends: Vec<usize>,
    send_attempts: usize,
}

impl MockStream {
    pub fn new(context: CallContext) -> Self {
        Self {
            context,
            incoming: VecDeque::new(),
            sent: Vec::new(),
            failing_sends: Vec::new(),
            send_attempts: 0,
        }
    }

    pub fn with_requests<'a>(mut self, requests: impl IntoIterator<Item = &'a str>) -> Self {
        self.incoming
            .extend(requests.into_iter().map(|r| Ok(r.to_string())));
        self
    }

    pub fn with_receive_error(mut self, status: Status) -> Self {
        self.incoming.push_back(Err(status));
        self
    }

    pub fn failing_send(mut self, index: usize) -> Self {
        self.failing_sends.push(index);
        self
    }
}

#[async_trait]
impl ServerStream for MockStream {
    type Request = String;
    type Response = String;

    fn context(&self) -> &CallContext {
        &self.context
    }

    async fn send_message(&mut self, message: String) -> Result<(), Status> {
        let attempt = self.send_attempts;
        self.send_attempts += 1;
        if self.failing_sends.contains(&attempt) {
            return Err(Status::unavailable("transport closed"));
        }
        self.sent.push(message);
        Ok(())
    }

    async fn receive_message(&mut self) -> Result<Option<String>, Status> {
        self.incoming.pop_front().transpose()
    }
}
