//! In-process [`SegmentScanClient`] over a fixed set of items.
//!
//! Items are assigned to segments by hashing their partition key, and each
//! segment is paginated in key order. Useful for tests and dry runs; it does
//! not evaluate filter or projection expressions.

use std::{
    collections::{BTreeMap, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use thiserror::Error;

use segscan_model::{Item, ScanSegmentPage, ScanSegmentRequest, SegmentCursor};

use crate::{client::SegmentScanClient, error::RemoteError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InMemoryTableError {
    #[error("item has no usable partition key attribute `{0}`")]
    MissingPartitionKey(String),
}

#[derive(Debug)]
pub struct InMemoryTable {
    table_name: String,
    partition_key: String,
    items: RwLock<BTreeMap<Vec<u8>, Item>>,
    calls: AtomicU64,
}

impl InMemoryTable {
    pub fn new(
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key: partition_key.into(),
            items: RwLock::new(BTreeMap::new()),
            calls: AtomicU64::new(0),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Insert or replace an item, keyed by its partition key.
    pub fn put(&self, item: Item) -> Result<(), InMemoryTableError> {
        let key = self.key_of(&item).ok_or_else(|| {
            InMemoryTableError::MissingPartitionKey(self.partition_key.clone())
        })?;
        self.write_items().insert(key, item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `scan_segment` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Segment an item with this key lands in for a given segment count.
    pub fn segment_of(key: &[u8], total_segments: u32) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % u64::from(total_segments.max(1))) as u32
    }

    fn key_of(&self, item: &Item) -> Option<Vec<u8>> {
        item.get(&self.partition_key)
            .and_then(|value| value.key_bytes())
            .map(<[u8]>::to_vec)
    }

    fn read_items(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, BTreeMap<Vec<u8>, Item>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_items(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Item>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SegmentScanClient for InMemoryTable {
    async fn scan_segment(
        &self,
        request: ScanSegmentRequest,
    ) -> Result<ScanSegmentPage, RemoteError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if *request.table_name != *self.table_name {
            return Err(RemoteError::Rejected(format!(
                "table `{}` not found",
                request.table_name
            )));
        }
        if request.total_segments == 0
            || request.segment >= request.total_segments
        {
            return Err(RemoteError::Rejected(format!(
                "segment {} out of range for {} total segments",
                request.segment, request.total_segments
            )));
        }

        let start_after = match &request.exclusive_start_key {
            Some(cursor) => Some(self.key_of(cursor.key()).ok_or_else(|| {
                RemoteError::Rejected(
                    "exclusive start key is missing the partition key".into(),
                )
            })?),
            None => None,
        };

        let items = self.read_items();
        let mut remaining = items
            .iter()
            .filter(|(key, _)| {
                start_after
                    .as_ref()
                    .is_none_or(|start| key.as_slice() > start.as_slice())
            })
            .filter(|(key, _)| {
                Self::segment_of(key, request.total_segments) == request.segment
            });

        let limit = request.limit.max(1) as usize;
        let page: Vec<Item> = remaining
            .by_ref()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect();

        let last_evaluated_key = if remaining.next().is_some() {
            page.last()
                .and_then(|last| last.get(&self.partition_key))
                .map(|value| {
                    SegmentCursor::new(Item::from([(
                        self.partition_key.clone(),
                        value.clone(),
                    )]))
                })
        } else {
            None
        };

        Ok(ScanSegmentPage::new(page, last_evaluated_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segscan_model::{AttributeValue, ExpressionParameters};
    use std::{collections::HashSet, sync::Arc};

    fn table(count: usize) -> InMemoryTable {
        let table = InMemoryTable::new("events", "pk");
        for i in 0..count {
            table
                .put(Item::from([
                    (
                        "pk".to_string(),
                        AttributeValue::from(format!("key-{i:04}")),
                    ),
                    ("n".to_string(), AttributeValue::from(i as i64)),
                ]))
                .unwrap();
        }
        table
    }

    fn request(
        segment: u32,
        total: u32,
        limit: u32,
        cursor: Option<SegmentCursor>,
    ) -> ScanSegmentRequest {
        ScanSegmentRequest {
            table_name: Arc::from("events"),
            segment,
            total_segments: total,
            exclusive_start_key: cursor,
            limit,
            expression: Arc::new(ExpressionParameters::default()),
        }
    }

    #[tokio::test]
    async fn every_item_lands_in_exactly_one_segment() {
        let table = table(200);
        let total = 7;
        let mut seen = HashSet::new();

        for segment in 0..total {
            let mut cursor = None;
            loop {
                let page = table
                    .scan_segment(request(segment, total, 9, cursor))
                    .await
                    .unwrap();
                assert!(page.count <= 9);
                for item in &page.items {
                    let key = item["pk"].as_s().unwrap().to_string();
                    assert!(seen.insert(key), "item returned twice");
                }
                match page.last_evaluated_key {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }

        assert_eq!(seen.len(), 200);
    }

    #[tokio::test]
    async fn empty_segment_finishes_immediately() {
        let table = InMemoryTable::new("events", "pk");
        let page = table.scan_segment(request(0, 4, 10, None)).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.is_last());
        assert_eq!(table.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_table_and_bad_segment_are_rejected() {
        let table = table(3);
        let mut wrong_table = request(0, 4, 10, None);
        wrong_table.table_name = Arc::from("other");
        assert!(matches!(
            table.scan_segment(wrong_table).await,
            Err(RemoteError::Rejected(_))
        ));
        assert!(matches!(
            table.scan_segment(request(4, 4, 10, None)).await,
            Err(RemoteError::Rejected(_))
        ));
    }

    #[test]
    fn items_without_partition_key_are_refused() {
        let table = InMemoryTable::new("events", "pk");
        let err = table
            .put(Item::from([("other".to_string(), AttributeValue::from("x"))]))
            .unwrap_err();
        assert_eq!(err, InMemoryTableError::MissingPartitionKey("pk".into()));
        assert!(table.is_empty());
    }
}
