//! The delivery service: a queue of archive records drained by one worker task
//! that filters, augments and hands each record to a [`RecordSink`].

use crate::config::site_config::SiteConfig;
use crate::delivery::error::UploadError;
use crate::delivery::Delivery;
use crate::error::WnsError;
use crate::service::history::ArchiveHistory;
use crate::service::sink::RecordSink;
use crate::types::record::ObservationRecord;
use crate::uploader::Uploader;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
#[error("The WNS delivery service has stopped")]
pub struct ServiceStopped;

/// How the service schedules and retries deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Minimum time between two posted records, by record timestamp.
    pub post_interval: Option<Duration>,
    /// Records older than this when their turn comes are dropped.
    pub stale: Option<Duration>,
    /// Attempts per record when the network fails. At least one.
    pub max_tries: u32,
    pub retry_wait: Duration,
    /// Records allowed to wait in the queue. When more are pending, the oldest
    /// are discarded unsent; the newest record is always kept.
    pub max_backlog: Option<usize>,
    pub log_success: bool,
    pub log_failure: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            post_interval: None,
            stale: None,
            max_tries: 3,
            retry_wait: Duration::from_secs(5),
            max_backlog: None,
            log_success: true,
            log_failure: true,
        }
    }
}

/// What the worker did with one record.
#[derive(Debug)]
pub(crate) enum Outcome {
    Delivered(Delivery),
    /// Older than the `stale` limit.
    Stale,
    /// Inside the `post_interval` of the previous post.
    TooSoon,
    Failed(UploadError),
}

/// Runs a [`RecordSink`] on its own task, fed through an unbounded queue.
///
/// This is the counterpart of the host's per-service REST thread: the host
/// calls [`WnsService::new_archive_record`] whenever it finalizes a record and
/// never waits for the upload.
///
/// # Examples
///
/// ```rust
/// # use wns::{DeliveryOptions, ObservationRecord, UnitSystem, Uploader, UploaderConfig, WnsService, WnsError};
/// # use chrono::Utc;
/// # #[tokio::main]
/// # async fn main() -> Result<(), WnsError> {
/// let config = UploaderConfig::builder()
///     .station("12345")
///     .api_key("ABCDE")
///     .skip_upload(true)
///     .build()?;
/// let service = WnsService::start(Uploader::new(config)?, DeliveryOptions::default());
///
/// service.new_archive_record(ObservationRecord::new(Utc::now(), UnitSystem::Metric))?;
/// service.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WnsService {
    sender: mpsc::UnboundedSender<ObservationRecord>,
    worker: JoinHandle<()>,
}

impl WnsService {
    /// Spawns the worker on the current tokio runtime.
    pub fn start<S>(sink: S, options: DeliveryOptions) -> Self
    where
        S: RecordSink + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(Worker::new(sink, options).run(receiver));
        Self { sender, worker }
    }

    /// Starts the uploader described by the `[StdRESTful.Wns]` section.
    ///
    /// Returns `Ok(None)` when the section has `enable = false`.
    ///
    /// # Errors
    ///
    /// Returns [`WnsError::Config`] if the section is incomplete or invalid; the
    /// service does not run then.
    pub fn from_site_config(site: &SiteConfig) -> Result<Option<Self>, WnsError> {
        info!("version is {}", env!("CARGO_PKG_VERSION"));
        if !site.enable {
            info!("WNS upload is disabled");
            return Ok(None);
        }
        let uploader = Uploader::from_site_config(site)?;
        Ok(Some(Self::start(uploader, site.delivery_options())))
    }

    /// Queues a finished archive record for upload.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceStopped`] if the worker is no longer running.
    pub fn new_archive_record(&self, record: ObservationRecord) -> Result<(), ServiceStopped> {
        self.sender.send(record).map_err(|_| ServiceStopped)
    }

    /// Stops accepting records and waits until the queued ones are processed.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            error!("WNS worker ended abnormally: {}", e);
        }
    }
}

pub(crate) struct Worker<S> {
    sink: S,
    options: DeliveryOptions,
    history: ArchiveHistory,
    last_post: Option<DateTime<Utc>>,
}

impl<S: RecordSink> Worker<S> {
    pub(crate) fn new(sink: S, options: DeliveryOptions) -> Self {
        Self {
            sink,
            options,
            history: ArchiveHistory::new(),
            last_post: None,
        }
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<ObservationRecord>) {
        let mut pending = VecDeque::new();
        loop {
            if pending.is_empty() {
                match receiver.recv().await {
                    Some(record) => pending.push_back(record),
                    None => break,
                }
            }
            while let Ok(record) = receiver.try_recv() {
                pending.push_back(record);
            }
            self.discard_backlog(&mut pending);
            if let Some(record) = pending.pop_front() {
                self.process(record, Utc::now()).await;
            }
        }
        debug!("WNS queue closed, worker exiting");
    }

    /// Drops the oldest pending records beyond `max_backlog`. They still count
    /// towards the archive window.
    fn discard_backlog(&mut self, pending: &mut VecDeque<ObservationRecord>) {
        let Some(max_backlog) = self.options.max_backlog else {
            return;
        };
        let excess = pending.len().saturating_sub(max_backlog.max(1));
        if excess == 0 {
            return;
        }
        info!(
            "{} records queued, discarding the oldest {} (max_backlog {})",
            pending.len(),
            excess,
            max_backlog
        );
        for record in pending.drain(..excess) {
            self.history.push(record);
        }
    }

    pub(crate) async fn process(&mut self, record: ObservationRecord, now: DateTime<Utc>) -> Outcome {
        let augmented = self.history.augment(&record);
        let timestamp = record.date_time();
        self.history.push(record);

        if let Some(stale) = self.options.stale {
            let age = now - timestamp;
            if TimeDelta::from_std(stale).is_ok_and(|limit| age > limit) {
                info!("record {} is stale ({} s old), skipped", timestamp, age.num_seconds());
                return Outcome::Stale;
            }
        }

        if let (Some(interval), Some(last_post)) = (self.options.post_interval, self.last_post) {
            let elapsed = timestamp - last_post;
            if TimeDelta::from_std(interval).map_or(true, |limit| elapsed < limit) {
                debug!("record {} is within post_interval, skipped", timestamp);
                return Outcome::TooSoon;
            }
        }

        let max_tries = self.options.max_tries.max(1);
        let mut attempt = 1;
        loop {
            match self.sink.accept(&augmented).await {
                Ok(delivery) => {
                    self.last_post = Some(timestamp);
                    if self.options.log_success {
                        match delivery {
                            Delivery::Sent { .. } => info!("Published record {} to WNS", timestamp),
                            Delivery::Skipped => info!("Skipped uploading record {} to WNS", timestamp),
                        }
                    }
                    return Outcome::Delivered(delivery);
                }
                Err(e) if e.is_transient() && attempt < max_tries => {
                    warn!("Failed upload attempt {} of {}: {}", attempt, max_tries, e);
                    attempt += 1;
                    tokio::time::sleep(self.options.retry_wait).await;
                }
                Err(e) => {
                    if self.options.log_failure {
                        error!("Failed to publish record {} to WNS: {}", timestamp, e);
                    }
                    return Outcome::Failed(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::unit_system::UnitSystem;
    use chrono::TimeZone;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records what it receives and fails the first `failures` calls.
    #[derive(Clone, Default)]
    struct TestSink {
        received: Arc<Mutex<Vec<ObservationRecord>>>,
        calls: Arc<AtomicU32>,
        failures: u32,
        reject: bool,
    }

    impl RecordSink for TestSink {
        async fn accept(&self, record: &ObservationRecord) -> Result<Delivery, UploadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(UploadError::Rejected {
                    endpoint: "http://wns.test/".to_string(),
                    status: StatusCode::FORBIDDEN,
                    body: "wrong key".to_string(),
                });
            }
            if call < self.failures {
                return Err(network_error().await);
            }
            self.received.lock().unwrap().push(record.clone());
            Ok(Delivery::Sent {
                status: StatusCode::OK,
            })
        }
    }

    async fn network_error() -> UploadError {
        let source = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .unwrap_err();
        UploadError::Network {
            endpoint: "http://127.0.0.1:9/".to_string(),
            source,
        }
    }

    fn at(hour: u32, minute: u32) -> ObservationRecord {
        ObservationRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap(),
            UnitSystem::Metric,
        )
    }

    fn options() -> DeliveryOptions {
        DeliveryOptions {
            retry_wait: Duration::ZERO,
            ..DeliveryOptions::default()
        }
    }

    #[tokio::test]
    async fn test_delivers_augmented_record() {
        let sink = TestSink::default();
        let mut worker = Worker::new(sink.clone(), options());
        let now = at(13, 0).date_time();

        worker.process(at(12, 0).with("outTemp", 15.0), now).await;
        let outcome = worker.process(at(13, 0).with("outTemp", 18.0), now).await;

        assert!(matches!(outcome, Outcome::Delivered(Delivery::Sent { .. })));
        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].get("outTemp1h"), Some(15.0));
        assert_eq!(received[1].get("outTempDayMin"), Some(15.0));
    }

    #[tokio::test]
    async fn test_stale_records_are_dropped() {
        let sink = TestSink::default();
        let mut worker = Worker::new(
            sink.clone(),
            DeliveryOptions {
                stale: Some(Duration::from_secs(1800)),
                ..options()
            },
        );

        let outcome = worker.process(at(10, 0), at(11, 0).date_time()).await;
        assert!(matches!(outcome, Outcome::Stale));
        let outcome = worker.process(at(10, 45), at(11, 0).date_time()).await;
        assert!(matches!(outcome, Outcome::Delivered(_)));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_interval() {
        let sink = TestSink::default();
        let mut worker = Worker::new(
            sink.clone(),
            DeliveryOptions {
                post_interval: Some(Duration::from_secs(600)),
                ..options()
            },
        );
        let now = at(12, 0).date_time();

        assert!(matches!(worker.process(at(11, 0), now).await, Outcome::Delivered(_)));
        assert!(matches!(worker.process(at(11, 5), now).await, Outcome::TooSoon));
        assert!(matches!(worker.process(at(11, 10), now).await, Outcome::Delivered(_)));
        assert_eq!(sink.received.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_network_failures_are_retried() {
        let sink = TestSink {
            failures: 2,
            ..TestSink::default()
        };
        let mut worker = Worker::new(sink.clone(), options());

        let outcome = worker.process(at(12, 0), at(12, 0).date_time()).await;
        assert!(matches!(outcome, Outcome::Delivered(_)));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_tries() {
        let sink = TestSink {
            failures: 10,
            ..TestSink::default()
        };
        let mut worker = Worker::new(
            sink.clone(),
            DeliveryOptions {
                max_tries: 2,
                ..options()
            },
        );

        let outcome = worker.process(at(12, 0), at(12, 0).date_time()).await;
        assert!(matches!(outcome, Outcome::Failed(UploadError::Network { .. })));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejections_are_not_retried() {
        let sink = TestSink {
            reject: true,
            ..TestSink::default()
        };
        let mut worker = Worker::new(sink.clone(), options());

        let outcome = worker.process(at(12, 0), at(12, 0).date_time()).await;
        assert!(matches!(outcome, Outcome::Failed(UploadError::Rejected { .. })));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_service_drains_queue_on_shutdown() -> Result<(), ServiceStopped> {
        let sink = TestSink::default();
        let service = WnsService::start(sink.clone(), options());

        service.new_archive_record(ObservationRecord::new(Utc::now(), UnitSystem::Metric))?;
        service.new_archive_record(
            ObservationRecord::new(Utc::now(), UnitSystem::Metric).with("outTemp", 1.0),
        )?;
        service.shutdown().await;

        assert_eq!(sink.received.lock().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_backlog_keeps_newest_records() -> Result<(), ServiceStopped> {
        let sink = TestSink::default();
        let service = WnsService::start(
            sink.clone(),
            DeliveryOptions {
                max_backlog: Some(2),
                ..options()
            },
        );

        // the worker has not run yet, so all five are pending at once
        for minute in [0, 5, 10, 15, 20] {
            service.new_archive_record(at(12, minute).with("outTemp", f64::from(minute)))?;
        }
        service.shutdown().await;

        let received = sink.received.lock().unwrap();
        let times: Vec<_> = received.iter().map(ObservationRecord::date_time).collect();
        assert_eq!(times, [at(12, 15).date_time(), at(12, 20).date_time()]);
        // discarded records still feed the daily extremes
        assert_eq!(received[1].get("outTempDayMin"), Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_backlog_unlimited_by_default() -> Result<(), ServiceStopped> {
        let sink = TestSink::default();
        let service = WnsService::start(sink.clone(), options());
        for minute in [0, 5, 10, 15, 20] {
            service.new_archive_record(at(12, minute))?;
        }
        service.shutdown().await;

        assert_eq!(sink.received.lock().unwrap().len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_site_starts_nothing() -> Result<(), WnsError> {
        let site = SiteConfig::from_toml_str("[StdRESTful.Wns]\nenable = false\n")?;
        assert!(WnsService::from_site_config(&site)?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_incomplete_site_is_a_config_error() -> Result<(), WnsError> {
        let site = SiteConfig::from_toml_str("[StdRESTful.Wns]\napi_key = \"ABCDE\"\n")?;
        assert!(matches!(
            WnsService::from_site_config(&site),
            Err(WnsError::Config(_))
        ));
        Ok(())
    }
}
