//! # Segscan Core
//!
//! Segmented parallel scan engine. A table scan is split into a fixed number
//! of logical segments; each worker instance owns a contiguous block of them
//! and drives one pagination loop per owned segment concurrently.
//!
//! ## Overview
//!
//! - **Planning**: [`plan::ScanPlan`] maps `(total, offset, local)` onto the
//!   global segment indexes an instance owns. Instances with different
//!   offsets never overlap.
//! - **Pagination**: [`segment::SegmentScan`] follows a segment's cursor
//!   chain, retrying failed calls with capped exponential backoff and
//!   resuming from the same cursor.
//! - **Delivery**: every page is handed to a [`handler::BatchHandler`], one
//!   batch per page, from whichever segment task fetched it.
//! - **Progress**: [`progress::ScanProgress`] counts completed segments and
//!   items; [`events::ScanEventBus`] broadcasts lifecycle events.
//! - **Coordination**: [`scanner::Scanner`] fans out the segment loops and
//!   returns a [`scanner::ScanReport`] once all of them are terminal.
//!
//! The remote store is abstracted behind [`client::SegmentScanClient`];
//! [`memory::InMemoryTable`] is a self-contained implementation.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use segscan_core::{InMemoryTable, ScanConfig, Scanner, handler_fn};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let table = Arc::new(InMemoryTable::new("orders", "id"));
//! let config = ScanConfig::builder()
//!     .client(table)
//!     .table_name("orders")
//!     .total_segments(40)
//!     .local_segments(10)
//!     .segment_offset(2)
//!     .build()?;
//!
//! let scanner = Scanner::new(config)?;
//! let report = scanner
//!     .start(handler_fn(|batch| {
//!         println!(
//!             "segment {} page {}: {} items",
//!             batch.segment,
//!             batch.page,
//!             batch.len()
//!         );
//!         Ok(())
//!     }))
//!     .await?;
//! assert_eq!(report.items, scanner.completed_items());
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod memory;
pub mod plan;
pub mod progress;
pub mod retry;
pub mod scanner;
pub mod segment;

pub use client::SegmentScanClient;
pub use config::{
    DEFAULT_LIMIT, DEFAULT_TOTAL_SEGMENTS, HandlerFailurePolicy, RetryConfig,
    ScanConfig, ScanConfigBuilder,
};
pub use error::{
    ConfigError, HandlerError, RemoteError, Result, ScanError, SegmentFailure,
};
pub use events::{ScanEvent, ScanEventBus};
pub use handler::{BatchHandler, HandlerFn, handler_fn};
pub use memory::InMemoryTable;
pub use plan::ScanPlan;
pub use progress::{ProgressSnapshot, ScanProgress};
pub use scanner::{FailedSegment, ScanReport, Scanner};
pub use segment::{SegmentOutcome, SegmentScan, SegmentStatus};

pub use segscan_model;
pub use segscan_model::{
    AttributeValue, ExpressionParameters, Item, ItemBatch, SegmentCursor,
};
