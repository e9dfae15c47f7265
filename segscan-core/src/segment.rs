//! The per-segment pagination loop.
//!
//! A segment moves through `Paginating -> Delivering -> Paginating ...` and
//! ends in `Done` once the store answers without a continuation cursor. A
//! failed call parks the loop in `Backoff` and then re-issues the exact same
//! request; the cursor only ever advances on a successful page.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use segscan_model::{
    ItemBatch, ScanSegmentPage, ScanSegmentRequest, SegmentCursor,
};

use crate::{
    config::{HandlerFailurePolicy, ScanConfig},
    error::{HandlerError, SegmentFailure},
    events::{ScanEvent, ScanEventBus},
    handler::BatchHandler,
    progress::ScanProgress,
    retry::Backoff,
};

/// Terminal state of one segment loop.
#[derive(Debug)]
pub enum SegmentStatus {
    /// The store returned no continuation cursor.
    Completed,
    /// The scan was cancelled before the segment was drained.
    Cancelled,
    Failed(SegmentFailure),
}

/// What one segment loop did during a scan.
#[derive(Debug)]
pub struct SegmentOutcome {
    pub segment: u32,
    pub pages: u64,
    pub items: u64,
    pub retries: u64,
    pub status: SegmentStatus,
}

impl SegmentOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, SegmentStatus::Completed)
    }
}

#[derive(Debug, Default)]
struct Tally {
    pages: u64,
    items: u64,
    retries: u64,
}

impl Tally {
    fn finish(self, segment: u32, status: SegmentStatus) -> SegmentOutcome {
        SegmentOutcome {
            segment,
            pages: self.pages,
            items: self.items,
            retries: self.retries,
            status,
        }
    }
}

/// Drives a single segment from its first page to the end of its cursor
/// chain.
///
/// Cheap to clone; the coordinator hands one clone to each segment task.
/// `cancel` is checked before every call and raced against the remote call
/// and the backoff sleep. Under [`HandlerFailurePolicy::AbortScan`] the loop
/// cancels it itself so sibling segments stop too.
#[derive(Clone, Debug)]
pub struct SegmentScan {
    config: Arc<ScanConfig>,
    progress: Arc<ScanProgress>,
    events: ScanEventBus,
    cancel: CancellationToken,
}

impl SegmentScan {
    pub fn new(
        config: Arc<ScanConfig>,
        progress: Arc<ScanProgress>,
        events: ScanEventBus,
    ) -> Self {
        Self {
            config,
            progress,
            events,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run<H>(&self, segment: u32, handler: &H) -> SegmentOutcome
    where
        H: BatchHandler + ?Sized,
    {
        let mut tally = Tally::default();
        let mut backoff = Backoff::new(*self.config.retry());
        let mut cursor: Option<SegmentCursor> = None;

        self.events.publish(ScanEvent::SegmentStarted { segment });
        debug!(segment, "segment scan started");

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(segment, tally);
            }

            let request = self.request(segment, cursor.clone());
            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return self.cancelled(segment, tally);
                }
                response = self.config.client().scan_segment(request) => {
                    response
                }
            };

            let page = match response {
                Ok(page) => page,
                Err(err) => {
                    let Some(delay) = backoff.next_delay() else {
                        let attempts = backoff.attempt();
                        warn!(
                            segment,
                            attempts,
                            error = %err,
                            "scan operation failed, retry budget exhausted"
                        );
                        let failure = SegmentFailure::RetriesExhausted {
                            attempts,
                            last_error: err,
                        };
                        return self.aborted(segment, tally, failure);
                    };

                    tally.retries += 1;
                    self.progress.record_retry();
                    warn!(
                        segment,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "scan operation failed, backing off"
                    );
                    self.events.publish(ScanEvent::RetryScheduled {
                        segment,
                        attempt: backoff.attempt(),
                        delay,
                        error: err.to_string(),
                    });

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            return self.cancelled(segment, tally);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            };
            backoff.reset();

            let ScanSegmentPage {
                items,
                count,
                last_evaluated_key,
                ..
            } = page;
            let page_index = tally.pages;
            let has_more = last_evaluated_key.is_some();

            // Counted before delivery so a failing handler cannot undo it.
            self.progress.record_page(u64::from(count));
            tally.pages += 1;
            tally.items += u64::from(count);

            debug!(
                segment,
                page = page_index,
                items = count,
                has_more,
                "page retrieved"
            );
            self.events.publish(ScanEvent::PageRetrieved {
                segment,
                page: page_index,
                items: count,
                has_more,
            });

            let batch = ItemBatch {
                segment,
                page: page_index,
                items,
            };
            if let Err(err) = deliver(handler, batch).await {
                match self.config.handler_failure() {
                    HandlerFailurePolicy::Ignore => {
                        warn!(
                            segment,
                            page = page_index,
                            error = %err,
                            "batch handler failed, continuing"
                        );
                    }
                    HandlerFailurePolicy::AbortSegment => {
                        return self.aborted(
                            segment,
                            tally,
                            SegmentFailure::Handler(err),
                        );
                    }
                    HandlerFailurePolicy::AbortScan => {
                        self.cancel.cancel();
                        return self.aborted(
                            segment,
                            tally,
                            SegmentFailure::Handler(err),
                        );
                    }
                }
            }

            match last_evaluated_key {
                Some(next) => cursor = Some(next),
                None => {
                    self.progress.record_segment_completed();
                    info!(
                        segment,
                        pages = tally.pages,
                        items = tally.items,
                        retries = tally.retries,
                        "segment scan completed"
                    );
                    self.events.publish(ScanEvent::SegmentCompleted {
                        segment,
                        pages: tally.pages,
                        items: tally.items,
                    });
                    return tally.finish(segment, SegmentStatus::Completed);
                }
            }
        }
    }

    fn request(
        &self,
        segment: u32,
        cursor: Option<SegmentCursor>,
    ) -> ScanSegmentRequest {
        ScanSegmentRequest {
            table_name: Arc::clone(self.config.table_name()),
            segment,
            total_segments: self.config.total_segments(),
            exclusive_start_key: cursor,
            limit: self.config.limit(),
            expression: Arc::clone(self.config.expression()),
        }
    }

    fn cancelled(&self, segment: u32, tally: Tally) -> SegmentOutcome {
        debug!(segment, pages = tally.pages, "segment scan cancelled");
        tally.finish(segment, SegmentStatus::Cancelled)
    }

    fn aborted(
        &self,
        segment: u32,
        tally: Tally,
        failure: SegmentFailure,
    ) -> SegmentOutcome {
        warn!(
            segment,
            pages = tally.pages,
            error = %failure,
            "segment scan aborted"
        );
        self.events.publish(ScanEvent::SegmentAborted {
            segment,
            reason: failure.to_string(),
        });
        tally.finish(segment, SegmentStatus::Failed(failure))
    }
}

/// Runs the handler, turning a panic into a [`HandlerError`] so the failure
/// policy applies to it like any other error.
async fn deliver<H>(handler: &H, batch: ItemBatch) -> Result<(), HandlerError>
where
    H: BatchHandler + ?Sized,
{
    match AssertUnwindSafe(handler.handle(batch)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::new(format!(
            "batch handler panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
