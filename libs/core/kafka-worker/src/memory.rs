//! In-memory broker for tests and local pipelines.
//!
//! Each topic is a single partition held in a shared log. Consumer groups
//! keep committed offsets, so a worker that reconnects resumes after the
//! last committed record just as it would against Kafka. A few knobs let
//! tests simulate an unreachable broker, failing polls and slow acks.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::record::{Connector, Delivery, Record, RecordSink, RecordSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

#[derive(Default)]
struct BrokerState {
    logs: HashMap<String, Vec<Record>>,
    /// Next offset to read, keyed by (group, topic)
    committed: HashMap<(String, String), i64>,
    unreachable: bool,
    failing_polls: usize,
    poll_count: usize,
    connections: usize,
    ack_delay: Option<Duration>,
}

/// Shared in-memory broker. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    appended: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the broker refuse connections, sends and polls.
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.lock().await.unreachable = !reachable;
    }

    /// Fail the next `count` polls with a connection error.
    pub async fn fail_next_polls(&self, count: usize) {
        self.state.lock().await.failing_polls = count;
    }

    /// Delay every acknowledgment by `delay`.
    pub async fn set_ack_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.ack_delay = delay;
    }

    /// Every record published to `topic`, in offset order.
    pub async fn published(&self, topic: &str) -> Vec<Record> {
        self.state
            .lock()
            .await
            .logs
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Next offset `group` will read from `topic` after a reconnect.
    pub async fn committed_offset(&self, topic: &str, group: &str) -> Option<i64> {
        self.state
            .lock()
            .await
            .committed
            .get(&(group.to_string(), topic.to_string()))
            .copied()
    }

    /// Number of polls served, including failed ones.
    pub async fn poll_count(&self) -> usize {
        self.state.lock().await.poll_count
    }

    /// Number of successful connects.
    pub async fn connections(&self) -> usize {
        self.state.lock().await.connections
    }

    fn unreachable() -> StreamError {
        StreamError::connection("in-memory broker unreachable")
    }
}

#[async_trait]
impl RecordSink for InMemoryBroker {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        ack_timeout: Duration,
    ) -> Result<Delivery, StreamError> {
        let ack_delay = {
            let state = self.state.lock().await;
            if state.unreachable {
                return Err(Self::unreachable());
            }
            state.ack_delay
        };

        if let Some(delay) = ack_delay {
            tokio::time::timeout(ack_timeout, tokio::time::sleep(delay))
                .await
                .map_err(|_| StreamError::Timeout(ack_timeout))?;
        }

        let delivery = {
            let mut state = self.state.lock().await;
            let log = state.logs.entry(topic.to_string()).or_default();
            let offset = log.len() as i64;
            log.push(Record {
                topic: topic.to_string(),
                key: Some(key.to_string()),
                payload: payload.to_vec(),
                partition: 0,
                offset,
            });
            Delivery {
                partition: 0,
                offset,
            }
        };

        self.appended.notify_waiters();
        debug!(topic = %topic, offset = delivery.offset, "Appended record");
        Ok(delivery)
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), StreamError> {
        Ok(())
    }
}

#[async_trait]
impl Connector for InMemoryBroker {
    type Source = InMemorySource;

    async fn connect(&self, config: &WorkerConfig) -> Result<InMemorySource, StreamError> {
        let mut state = self.state.lock().await;
        if state.unreachable {
            return Err(Self::unreachable());
        }
        state.connections += 1;

        let key = (config.consumer_group.clone(), config.topic.clone());
        let position = match state.committed.get(&key) {
            Some(offset) => *offset as usize,
            None if config.auto_offset_reset == "latest" => {
                state.logs.get(&config.topic).map_or(0, Vec::len)
            }
            None => 0,
        };

        Ok(InMemorySource {
            broker: self.clone(),
            topic: config.topic.clone(),
            group: config.consumer_group.clone(),
            position: Mutex::new(position),
        })
    }
}

/// A consuming session on an `InMemoryBroker`.
pub struct InMemorySource {
    broker: InMemoryBroker,
    topic: String,
    group: String,
    position: Mutex<usize>,
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn poll_batch(&self, max: usize, timeout: Duration) -> Result<Vec<Record>, StreamError> {
        let deadline = Instant::now() + timeout;
        {
            let mut state = self.broker.state.lock().await;
            state.poll_count += 1;
            if state.failing_polls > 0 {
                state.failing_polls -= 1;
                return Err(StreamError::connection("injected poll failure"));
            }
        }

        loop {
            let appended = self.broker.appended.notified();
            {
                let state = self.broker.state.lock().await;
                if state.unreachable {
                    return Err(InMemoryBroker::unreachable());
                }
                let mut position = self.position.lock().await;
                let log = state.logs.get(&self.topic).map(Vec::as_slice).unwrap_or(&[]);
                if *position < log.len() {
                    let end = (*position + max).min(log.len());
                    let batch = log[*position..end].to_vec();
                    *position = end;
                    return Ok(batch);
                }
            }

            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn commit(&self, record: &Record) -> Result<(), StreamError> {
        let mut state = self.broker.state.lock().await;
        let next = record.offset + 1;
        let committed = state
            .committed
            .entry((self.group.clone(), self.topic.clone()))
            .or_insert(next);
        *committed = (*committed).max(next);
        Ok(())
    }
}
