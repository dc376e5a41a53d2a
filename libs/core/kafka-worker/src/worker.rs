//! Topic processor trait and the generic `TopicWorker`.
//!
//! `TopicWorker` owns the consumer lifecycle:
//!
//! ```text
//! Uninitialized -> Connecting -> Running -> Stopping -> Stopped
//!                       |                                  ^
//!                       +------ connect failed ------------+
//! ```
//!
//! The poll loop runs on its own tokio task. `stop` signals it and waits a
//! bounded time for the loop to finish the batch in hand.

use crate::config::{FailurePolicy, WorkerConfig};
use crate::error::StreamError;
use crate::metrics::{MessageStatus, TopicMetrics};
use crate::record::{Connector, Record, RecordSource};
use crate::registry::TopicMessage;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Trait for topic message processors.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl TopicProcessor<Envelope> for EmailProcessor {
///     async fn process(&self, envelope: &Envelope) -> Result<(), StreamError> {
///         // render and send
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "email_processor"
///     }
/// }
/// ```
#[async_trait]
pub trait TopicProcessor<M: TopicMessage>: Send + Sync {
    /// Handle one message.
    async fn process(&self, message: &M) -> Result<(), StreamError>;

    /// Processor name for logging and metrics.
    fn name(&self) -> &'static str;
}

/// Lifecycle state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Uninitialized,
    Connecting,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumerState::Uninitialized => "uninitialized",
            ConsumerState::Connecting => "connecting",
            ConsumerState::Running => "running",
            ConsumerState::Stopping => "stopping",
            ConsumerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Generic topic worker.
pub struct TopicWorker<M, P, C>
where
    M: TopicMessage + 'static,
    P: TopicProcessor<M> + 'static,
    C: Connector,
{
    processor: Arc<P>,
    connector: C,
    config: WorkerConfig,
    state: watch::Sender<ConsumerState>,
    running: Mutex<Option<RunningLoop>>,
    _marker: PhantomData<fn() -> M>,
}

impl<M, P, C> TopicWorker<M, P, C>
where
    M: TopicMessage + 'static,
    P: TopicProcessor<M> + 'static,
    C: Connector,
{
    pub fn new(processor: P, connector: C, config: WorkerConfig) -> Self {
        Self::with_arc_processor(Arc::new(processor), connector, config)
    }

    /// Create with a shared processor
    pub fn with_arc_processor(processor: Arc<P>, connector: C, config: WorkerConfig) -> Self {
        let (state, _) = watch::channel(ConsumerState::Uninitialized);
        Self {
            processor,
            connector,
            config,
            state,
            running: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    pub fn processor(&self) -> &Arc<P> {
        &self.processor
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ConsumerState::Running
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ConsumerState) {
        let previous = self.state.send_replace(state);
        debug!(from = %previous, to = %state, "Worker state changed");
    }

    /// Connect and launch the poll loop.
    ///
    /// Returns `true` once the loop is running. Calling it again while
    /// running changes nothing and returns `true`. A worker that was
    /// stopped may be started again.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!(topic = %self.config.topic, "Worker already running");
            return true;
        }

        self.set_state(ConsumerState::Connecting);
        info!(
            consumer_id = %self.config.consumer_id,
            topic = %self.config.topic,
            group = %self.config.consumer_group,
            processor = %self.processor.name(),
            "Starting topic worker"
        );

        let source = match self.connector.connect(&self.config).await {
            Ok(source) => source,
            Err(e) => {
                error!(
                    error = %e,
                    topic = %self.config.topic,
                    bootstrap_servers = %self.config.bootstrap_servers,
                    "Failed to connect topic worker"
                );
                self.set_state(ConsumerState::Stopped);
                return false;
            }
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker_loop = WorkerLoop {
            metrics: TopicMetrics::new(self.config.topic.clone(), self.processor.name()),
            source,
            processor: Arc::clone(&self.processor),
            config: self.config.clone(),
            _marker: PhantomData::<fn() -> M>,
        };

        self.set_state(ConsumerState::Running);
        let handle = tokio::spawn(worker_loop.run(shutdown_rx));
        *running = Some(RunningLoop { shutdown, handle });
        true
    }

    /// Signal the loop and wait for it to finish.
    ///
    /// A no-op before `start` and after a previous `stop`. The wait is
    /// bounded by `shutdown_timeout`; a loop still busy after that is aborted.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(RunningLoop {
            shutdown,
            mut handle,
        }) = running.take()
        else {
            debug!(state = %self.state(), "Worker not running, nothing to stop");
            return;
        };

        self.set_state(ConsumerState::Stopping);
        let _ = shutdown.send(true);

        match tokio::time::timeout(self.config.shutdown_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Worker task ended abnormally"),
            Err(_) => {
                warn!(
                    timeout_secs = self.config.shutdown_timeout.as_secs(),
                    "Worker did not stop in time, aborting"
                );
                handle.abort();
            }
        }

        self.set_state(ConsumerState::Stopped);
        info!(topic = %self.config.topic, "Topic worker stopped");
    }
}

struct WorkerLoop<M, P, S> {
    source: S,
    processor: Arc<P>,
    config: WorkerConfig,
    metrics: TopicMetrics,
    _marker: PhantomData<fn() -> M>,
}

impl<M, P, S> WorkerLoop<M, P, S>
where
    M: TopicMessage + 'static,
    P: TopicProcessor<M> + 'static,
    S: RecordSource + 'static,
{
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            topic = %self.config.topic,
            batch_size = self.config.batch_size,
            poll_timeout_ms = self.config.poll_timeout.as_millis() as u64,
            "Worker loop running"
        );

        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = self.source.poll_batch(self.config.batch_size, self.config.poll_timeout) => polled,
            };

            match polled {
                Ok(batch) => {
                    if consecutive_errors > 0 {
                        info!(consecutive_errors, "Broker connection recovered");
                        consecutive_errors = 0;
                    }
                    // The batch in hand is finished before shutdown is checked again
                    for record in batch {
                        self.handle_record(record).await;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    self.metrics.poll_failed(e.kind().as_str());
                    warn!(
                        error = %e,
                        consecutive_errors,
                        backoff_secs = self.config.error_backoff.as_secs(),
                        "Poll failed, backing off"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }

        info!(topic = %self.config.topic, "Worker loop exited");
    }

    async fn handle_record(&self, record: Record) {
        let message: M = match serde_json::from_slice(&record.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    error = %e,
                    partition = record.partition,
                    offset = record.offset,
                    key = ?record.key,
                    "Skipping undecodable message"
                );
                self.metrics.message_undecodable();
                self.commit(&record).await;
                return;
            }
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.processor.process(&message))
            .catch_unwind()
            .await;

        let status = match outcome {
            Ok(Ok(())) => {
                info!(
                    message_id = %message.message_id(),
                    partition = record.partition,
                    offset = record.offset,
                    "Message processed"
                );
                MessageStatus::Success
            }
            Ok(Err(e)) => {
                error!(
                    message_id = %message.message_id(),
                    error = %e,
                    kind = %e.kind(),
                    offset = record.offset,
                    "Message processing failed"
                );
                MessageStatus::Failed
            }
            Err(panic) => {
                error!(
                    message_id = %message.message_id(),
                    panic = %panic_message(panic.as_ref()),
                    offset = record.offset,
                    "Processor panicked"
                );
                MessageStatus::Failed
            }
        };
        self.metrics
            .message_processed(message.label(), status, started.elapsed());

        if status == MessageStatus::Failed {
            match self.config.failure_policy {
                FailurePolicy::LogAndCommit => {
                    debug!(offset = record.offset, "Committing failed message without retry");
                }
            }
        }
        self.commit(&record).await;
    }

    async fn commit(&self, record: &Record) {
        if let Err(e) = self.source.commit(record).await {
            warn!(error = %e, offset = record.offset, "Failed to commit offset");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;
    use crate::record::RecordSink;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Job {
        id: String,
        fail: bool,
        panic: bool,
    }

    impl TopicMessage for Job {
        fn message_id(&self) -> &str {
            &self.id
        }

        fn partition_key(&self) -> String {
            self.id.clone()
        }
    }

    #[derive(Default)]
    struct CountingProcessor {
        handled: AtomicUsize,
    }

    #[async_trait]
    impl TopicProcessor<Job> for CountingProcessor {
        async fn process(&self, job: &Job) -> Result<(), StreamError> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            if job.panic {
                panic!("boom");
            }
            if job.fail {
                return Err(StreamError::transport("refused"));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn config() -> WorkerConfig {
        WorkerConfig::new("jobs", "job_workers")
            .with_poll_timeout(Duration::from_millis(20))
            .with_error_backoff(Duration::from_millis(20))
            .with_shutdown_timeout(Duration::from_secs(2))
    }

    fn worker(broker: &InMemoryBroker) -> TopicWorker<Job, CountingProcessor, InMemoryBroker> {
        TopicWorker::new(CountingProcessor::default(), broker.clone(), config())
    }

    async fn publish(broker: &InMemoryBroker, job: &Job) {
        let payload = serde_json::to_vec(job).unwrap();
        broker
            .send("jobs", &job.id, &payload, Duration::from_secs(1))
            .await
            .unwrap();
    }

    async fn wait_for_commit(broker: &InMemoryBroker, expected: i64) {
        for _ in 0..200 {
            if broker.committed_offset("jobs", "job_workers").await == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("offset {expected} never committed");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }

    #[tokio::test]
    async fn test_lifecycle_states() {
        let broker = InMemoryBroker::new();
        let worker = worker(&broker);
        assert_eq!(worker.state(), ConsumerState::Uninitialized);

        // stop before start is a no-op
        worker.stop().await;
        assert_eq!(worker.state(), ConsumerState::Uninitialized);

        assert!(worker.start().await);
        assert_eq!(worker.state(), ConsumerState::Running);

        worker.stop().await;
        assert_eq!(worker.state(), ConsumerState::Stopped);

        // stopping twice is harmless
        worker.stop().await;
        assert_eq!(worker.state(), ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let broker = InMemoryBroker::new();
        let worker = worker(&broker);

        assert!(worker.start().await);
        assert!(worker.start().await);
        assert_eq!(broker.connections().await, 1);

        worker.stop().await;
    }

    #[tokio::test]
    async fn test_connect_failure_stops() {
        let broker = InMemoryBroker::new();
        broker.set_reachable(false).await;
        let worker = worker(&broker);

        assert!(!worker.start().await);
        assert_eq!(worker.state(), ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn test_failures_and_garbage_are_committed() {
        let broker = InMemoryBroker::new();
        publish(&broker, &Job { id: "ok".into(), fail: false, panic: false }).await;
        broker
            .send("jobs", "garbage", b"{not json", Duration::from_secs(1))
            .await
            .unwrap();
        publish(&broker, &Job { id: "bad".into(), fail: true, panic: false }).await;
        publish(&broker, &Job { id: "panics".into(), fail: false, panic: true }).await;

        let worker = worker(&broker);
        assert!(worker.start().await);
        wait_for_commit(&broker, 4).await;

        // Garbage never reaches the processor
        assert_eq!(worker.processor().handled.load(Ordering::SeqCst), 3);
        assert_eq!(worker.state(), ConsumerState::Running);
        worker.stop().await;
    }

    #[tokio::test]
    async fn test_restart_resumes_after_committed() {
        let broker = InMemoryBroker::new();
        publish(&broker, &Job { id: "first".into(), fail: false, panic: false }).await;

        let worker = worker(&broker);
        assert!(worker.start().await);
        wait_for_commit(&broker, 1).await;
        worker.stop().await;

        publish(&broker, &Job { id: "second".into(), fail: false, panic: false }).await;
        assert!(worker.start().await);
        wait_for_commit(&broker, 2).await;
        worker.stop().await;

        assert_eq!(worker.processor().handled.load(Ordering::SeqCst), 2);
        assert_eq!(broker.connections().await, 2);
    }
}
