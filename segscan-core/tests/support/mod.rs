#![allow(dead_code)]

pub mod constants;

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use segscan_core::{
    AttributeValue, HandlerError, HandlerFn, Item, ItemBatch, RemoteError,
    RetryConfig, SegmentCursor, SegmentScanClient, handler_fn,
    segscan_model::{ScanSegmentPage, ScanSegmentRequest},
};

use constants::{BACKOFF_BASE_MS, PARTITION_KEY};

type Response = Result<ScanSegmentPage, RemoteError>;

/// Route engine logs through the test harness so `--nocapture` shows them.
/// Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segscan_core=debug".into()),
        )
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Remote store double with a per-segment response script. Segments without
/// a script (or with an exhausted one) answer with an empty final page.
#[derive(Default)]
pub struct FakeStore {
    scripts: Mutex<HashMap<u32, VecDeque<Response>>>,
    requests: Mutex<Vec<ScanSegmentRequest>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, segment: u32, responses: Vec<Response>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(segment, responses.into());
        self
    }

    pub fn requests(&self) -> Vec<ScanSegmentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, segment: u32) -> Vec<ScanSegmentRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.segment == segment)
            .collect()
    }
}

#[async_trait]
impl SegmentScanClient for FakeStore {
    async fn scan_segment(&self, request: ScanSegmentRequest) -> Response {
        let segment = request.segment;
        self.requests.lock().unwrap().push(request);
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&segment)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ScanSegmentPage::new(Vec::new(), None)))
    }
}

pub fn item(id: &str) -> Item {
    Item::from([(PARTITION_KEY.to_string(), AttributeValue::from(id))])
}

pub fn cursor(id: &str) -> SegmentCursor {
    SegmentCursor::new(item(id))
}

pub fn page(ids: &[&str], next: Option<&str>) -> Response {
    Ok(ScanSegmentPage::new(
        ids.iter().map(|id| item(id)).collect(),
        next.map(cursor),
    ))
}

pub fn ids(batch: &ItemBatch) -> Vec<String> {
    batch
        .items
        .iter()
        .filter_map(|item| item.get(PARTITION_KEY)?.as_s().map(str::to_string))
        .collect()
}

pub fn fixed_backoff() -> RetryConfig {
    RetryConfig {
        backoff_base_ms: BACKOFF_BASE_MS,
        backoff_max_ms: 10 * BACKOFF_BASE_MS,
        jitter: false,
        ..RetryConfig::default()
    }
}

/// Batches delivered to a recording handler, in arrival order.
pub type Recorded = Arc<Mutex<Vec<ItemBatch>>>;

pub fn recording_handler() -> (
    HandlerFn<impl Fn(ItemBatch) -> Result<(), HandlerError> + Send + Sync>,
    Recorded,
) {
    let recorded: Recorded = Arc::default();
    let sink = Arc::clone(&recorded);
    let handler = handler_fn(move |batch| {
        sink.lock().unwrap().push(batch);
        Ok(())
    });
    (handler, recorded)
}
