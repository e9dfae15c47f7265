//! Core data model definitions shared across segscan crates.
//!
//! Nothing in here interprets item content. Attribute values, cursors and
//! expression parameters are carried between the caller, the scan engine and
//! the remote store verbatim.
#![allow(missing_docs)]

pub mod attribute;
pub mod batch;
pub mod cursor;
pub mod request;

pub use attribute::{AttributeValue, Item};
pub use batch::ItemBatch;
pub use cursor::SegmentCursor;
pub use request::{ExpressionParameters, ScanSegmentPage, ScanSegmentRequest};
