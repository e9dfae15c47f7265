//! Fan-out coordinator: one task per owned segment, joined before `start`
//! returns.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::broadcast, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::{HandlerFailurePolicy, ScanConfig},
    error::{ConfigError, HandlerError, ScanError, SegmentFailure},
    events::{ScanEvent, ScanEventBus},
    handler::BatchHandler,
    plan::ScanPlan,
    progress::{ProgressSnapshot, ScanProgress},
    segment::{SegmentOutcome, SegmentScan, SegmentStatus},
};

/// Segment that stopped without draining its cursor chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedSegment {
    pub segment: u32,
    pub reason: String,
}

/// Totals for a single `start` call. The scanner's [`ScanProgress`] keeps
/// the running totals across calls.
#[derive(Clone, Debug, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub segments_planned: usize,
    pub segments_completed: usize,
    pub items: u64,
    pub pages: u64,
    pub retries: u64,
    pub failed_segments: Vec<FailedSegment>,
    pub cancelled_segments: Vec<u32>,
}

impl ScanReport {
    fn new(started_at: DateTime<Utc>, segments_planned: usize) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            segments_planned,
            segments_completed: 0,
            items: 0,
            pages: 0,
            retries: 0,
            failed_segments: Vec::new(),
            cancelled_segments: Vec::new(),
        }
    }

    /// Every planned segment reached the end of its cursor chain.
    pub fn is_complete(&self) -> bool {
        self.segments_completed == self.segments_planned
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    fn absorb(&mut self, outcome: &SegmentOutcome) {
        self.items += outcome.items;
        self.pages += outcome.pages;
        self.retries += outcome.retries;
        match &outcome.status {
            SegmentStatus::Completed => self.segments_completed += 1,
            SegmentStatus::Cancelled => {
                self.cancelled_segments.push(outcome.segment)
            }
            SegmentStatus::Failed(failure) => {
                self.failed_segments.push(FailedSegment {
                    segment: outcome.segment,
                    reason: failure.to_string(),
                })
            }
        }
    }
}

/// Runs a segmented parallel scan for one worker instance.
///
/// `start` blocks until every owned segment is terminal. Counters are owned
/// by the instance and readable at any time through [`Scanner::progress`].
/// Only one scan may run per instance at a time; a second concurrent
/// `start` fails with [`ScanError::AlreadyRunning`].
///
/// With the default retry policy a segment whose remote calls keep failing
/// retries forever, so `start` never returns for it. Pass a
/// [`CancellationToken`] to [`Scanner::start_with_cancellation`] or set
/// `max_attempts` if that is not acceptable.
pub struct Scanner {
    config: Arc<ScanConfig>,
    plan: ScanPlan,
    progress: Arc<ScanProgress>,
    events: ScanEventBus,
    running: AtomicBool,
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .field("progress", &self.progress.snapshot())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Clears the running flag when the scan future finishes or is dropped.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ConfigError> {
        let plan = ScanPlan::new(
            config.total_segments(),
            config.segment_offset(),
            config.local_segments(),
        )?;
        let events = ScanEventBus::new(config.event_channel_capacity());

        Ok(Self {
            config: Arc::new(config),
            plan,
            progress: Arc::new(ScanProgress::default()),
            events,
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn plan(&self) -> &ScanPlan {
        &self.plan
    }

    pub fn progress(&self) -> Arc<ScanProgress> {
        Arc::clone(&self.progress)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn completed_segments(&self) -> u64 {
        self.progress.completed_segments()
    }

    pub fn completed_items(&self) -> u64 {
        self.progress.completed_items()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Scan every owned segment and return once all of them are done.
    pub async fn start<H>(&self, handler: H) -> Result<ScanReport, ScanError>
    where
        H: BatchHandler + 'static,
    {
        self.start_with_cancellation(handler, CancellationToken::new())
            .await
    }

    /// Like [`Scanner::start`], stopping every segment promptly once
    /// `cancel` fires. Pages already delivered stay counted.
    pub async fn start_with_cancellation<H>(
        &self,
        handler: H,
        cancel: CancellationToken,
    ) -> Result<ScanReport, ScanError>
    where
        H: BatchHandler + 'static,
    {
        let _guard =
            RunGuard::acquire(&self.running).ok_or(ScanError::AlreadyRunning)?;

        let segments = self.plan.segments();
        let mut report = ScanReport::new(Utc::now(), segments.len());
        // Child token: an aborting segment stops its siblings without
        // touching the caller's token.
        let scan_token = cancel.child_token();
        let handler = Arc::new(handler);

        info!(
            table = %self.config.table_name(),
            total_segments = self.plan.total_segments(),
            local_segments = self.plan.local_segments(),
            segment_offset = self.plan.segment_offset(),
            "starting parallel scan"
        );

        let worker = SegmentScan::new(
            Arc::clone(&self.config),
            Arc::clone(&self.progress),
            self.events.clone(),
        )
        .with_cancellation(scan_token.clone());

        let mut tasks = JoinSet::new();
        let mut task_segments = HashMap::with_capacity(segments.len());
        for segment in segments {
            let worker = worker.clone();
            let handler = Arc::clone(&handler);
            let abort = tasks.spawn(async move {
                worker.run(segment, handler.as_ref()).await
            });
            task_segments.insert(abort.id(), segment);
        }

        let abort_scan =
            self.config.handler_failure() == HandlerFailurePolicy::AbortScan;
        let mut handler_failure: Option<(u32, HandlerError)> = None;
        let mut panicked: Option<u32> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.absorb(&outcome);
                    if let SegmentStatus::Failed(SegmentFailure::Handler(err)) =
                        outcome.status
                        && abort_scan
                        && handler_failure.is_none()
                    {
                        handler_failure = Some((outcome.segment, err));
                    }
                }
                Err(join_err) => {
                    let segment = task_segments
                        .get(&join_err.id())
                        .copied()
                        .unwrap_or_default();
                    error!(segment, error = %join_err, "segment task failed");
                    scan_token.cancel();
                    report.failed_segments.push(FailedSegment {
                        segment,
                        reason: join_err.to_string(),
                    });
                    if panicked.is_none() {
                        panicked = Some(segment);
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        report.failed_segments.sort_by_key(|failed| failed.segment);
        report.cancelled_segments.sort_unstable();

        info!(
            segments_completed = report.segments_completed,
            segments_planned = report.segments_planned,
            items = report.items,
            pages = report.pages,
            retries = report.retries,
            elapsed_ms = report.elapsed().num_milliseconds(),
            "parallel scan finished"
        );

        if let Some(segment) = panicked {
            return Err(ScanError::SegmentPanicked { segment });
        }
        if let Some((segment, source)) = handler_failure {
            return Err(ScanError::HandlerFailed { segment, source });
        }
        if cancel.is_cancelled() && !report.is_complete() {
            warn!(
                cancelled = report.cancelled_segments.len(),
                "parallel scan cancelled"
            );
            return Err(ScanError::Cancelled {
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RetryConfig,
        handler::{MockBatchHandler, handler_fn},
        memory::InMemoryTable,
    };
    use segscan_model::{AttributeValue, Item};
    use std::time::Duration;

    fn populated(count: usize) -> Arc<InMemoryTable> {
        let table = InMemoryTable::new("users", "id");
        for i in 0..count {
            table
                .put(Item::from([(
                    "id".to_string(),
                    AttributeValue::from(format!("user-{i}")),
                )]))
                .unwrap();
        }
        Arc::new(table)
    }

    fn scanner(
        table: Arc<InMemoryTable>,
        total: u32,
        policy: HandlerFailurePolicy,
    ) -> Scanner {
        let config = ScanConfig::builder()
            .client(table)
            .table_name("users")
            .total_segments(total)
            .limit(7)
            .handler_failure(policy)
            .build()
            .unwrap();
        Scanner::new(config).unwrap()
    }

    #[test]
    fn new_derives_plan_from_config() {
        let config = ScanConfig::builder()
            .client(populated(0))
            .table_name("users")
            .total_segments(12)
            .local_segments(4)
            .segment_offset(2)
            .build()
            .unwrap();

        let scanner = Scanner::new(config).unwrap();

        let plan = scanner.plan();
        assert_eq!(plan.total_segments(), 12);
        assert_eq!(plan.local_segments(), 4);
        assert_eq!(plan.segment_offset(), 2);
        assert_eq!(plan.segments(), vec![8, 9, 10, 11]);
        assert!(!scanner.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scans_every_item_once() {
        let table = populated(150);
        let scanner =
            scanner(Arc::clone(&table), 6, HandlerFailurePolicy::AbortScan);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let report = scanner
            .start(handler_fn(move |batch| {
                let mut guard = sink.lock().unwrap();
                for item in batch.items {
                    guard.push(item["id"].as_s().unwrap().to_string());
                }
                Ok(())
            }))
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.segments_planned, 6);
        assert_eq!(report.items, 150);
        assert_eq!(scanner.completed_segments(), 6);
        assert_eq!(scanner.completed_items(), 150);

        let mut ids = seen.lock().unwrap().clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 150);
        assert!(!scanner.is_running());
    }

    #[tokio::test]
    async fn counters_accumulate_across_scans() {
        let table = populated(20);
        let scanner = scanner(table, 3, HandlerFailurePolicy::AbortScan);

        let mut handler = MockBatchHandler::new();
        handler.expect_handle().returning(|_| Ok(()));
        let first = scanner.start(handler).await.unwrap();

        let mut handler = MockBatchHandler::new();
        handler.expect_handle().returning(|_| Ok(()));
        let second = scanner.start(handler).await.unwrap();

        assert_eq!(first.items, 20);
        assert_eq!(second.items, 20);
        assert_eq!(scanner.completed_items(), 40);
        assert_eq!(scanner.completed_segments(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_start_is_rejected() {
        let table = populated(10);
        let scanner =
            Arc::new(scanner(table, 2, HandlerFailurePolicy::AbortScan));
        let gate = Arc::new(tokio::sync::Notify::new());

        struct Blocking(Arc<tokio::sync::Notify>);

        #[async_trait::async_trait]
        impl BatchHandler for Blocking {
            async fn handle(
                &self,
                _batch: segscan_model::ItemBatch,
            ) -> Result<(), HandlerError> {
                self.0.notified().await;
                Ok(())
            }
        }

        let running = Arc::clone(&scanner);
        let blocking = Blocking(Arc::clone(&gate));
        let first = tokio::spawn(async move { running.start(blocking).await });

        while !scanner.is_running() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let second = scanner.start(handler_fn(|_| Ok(()))).await;
        assert!(matches!(second, Err(ScanError::AlreadyRunning)));

        let release = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move {
                loop {
                    gate.notify_waiters();
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
        });
        let report = first.await.unwrap().unwrap();
        release.abort();

        assert!(report.is_complete());
        assert!(!scanner.is_running());
    }

    #[tokio::test]
    async fn abort_scan_policy_fails_whole_scan() {
        let table = populated(60);
        let scanner = scanner(table, 4, HandlerFailurePolicy::AbortScan);

        let result = scanner
            .start(handler_fn(|batch| {
                if batch.segment == 1 {
                    Err(HandlerError::new("cannot persist"))
                } else {
                    Ok(())
                }
            }))
            .await;

        match result {
            Err(ScanError::HandlerFailed { segment, source }) => {
                assert_eq!(segment, 1);
                assert_eq!(source.message(), "cannot persist");
            }
            other => panic!("expected handler failure, got {other:?}"),
        }
        assert!(scanner.completed_segments() < 4);
        assert!(!scanner.is_running());
    }

    #[tokio::test]
    async fn abort_segment_policy_reports_failed_segment() {
        let table = populated(60);
        let scanner = scanner(table, 4, HandlerFailurePolicy::AbortSegment);

        let report = scanner
            .start(handler_fn(|batch| {
                if batch.segment == 2 {
                    Err(HandlerError::new("bad batch"))
                } else {
                    Ok(())
                }
            }))
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.segments_completed, 3);
        assert_eq!(report.failed_segments.len(), 1);
        assert_eq!(report.failed_segments[0].segment, 2);
        assert_eq!(scanner.completed_segments(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_cancellation_returns_partial_report() {
        struct AlwaysDown;

        #[async_trait::async_trait]
        impl crate::client::SegmentScanClient for AlwaysDown {
            async fn scan_segment(
                &self,
                _request: segscan_model::ScanSegmentRequest,
            ) -> Result<
                segscan_model::ScanSegmentPage,
                crate::error::RemoteError,
            > {
                Err(crate::error::RemoteError::Unavailable("down".into()))
            }
        }

        let config = ScanConfig::builder()
            .client(Arc::new(AlwaysDown))
            .table_name("users")
            .total_segments(3)
            .retry(RetryConfig {
                jitter: false,
                ..RetryConfig::default()
            })
            .build()
            .unwrap();
        let scanner = Scanner::new(config).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let result = scanner
            .start_with_cancellation(handler_fn(|_| Ok(())), cancel)
            .await;

        match result {
            Err(ScanError::Cancelled { report }) => {
                assert_eq!(report.segments_completed, 0);
                assert_eq!(report.cancelled_segments, vec![0, 1, 2]);
                assert!(report.retries >= 3);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert_eq!(scanner.completed_segments(), 0);
    }

    #[tokio::test]
    async fn events_trace_segment_lifecycle() {
        let table = populated(5);
        let scanner = scanner(table, 2, HandlerFailurePolicy::AbortScan);
        let mut events = scanner.subscribe();

        scanner.start(handler_fn(|_| Ok(()))).await.unwrap();

        let mut started = 0;
        let mut completed = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                ScanEvent::SegmentStarted { .. } => started += 1,
                ScanEvent::SegmentCompleted { .. } => completed += 1,
                _ => {}
            }
        }
        assert_eq!(started, 2);
        assert_eq!(completed, 2);
    }
}
