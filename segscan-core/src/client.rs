use std::sync::Arc;

use async_trait::async_trait;

use segscan_model::{ScanSegmentPage, ScanSegmentRequest};

use crate::error::RemoteError;

/// The one remote operation the scanner consumes: fetch a single page of a
/// single segment.
///
/// Implementations wrap whatever SDK reaches the store; building and
/// authenticating that SDK client is the caller's job. Every error is
/// treated as transient and the identical request is retried.
#[async_trait]
pub trait SegmentScanClient: Send + Sync {
    async fn scan_segment(
        &self,
        request: ScanSegmentRequest,
    ) -> Result<ScanSegmentPage, RemoteError>;
}

#[async_trait]
impl<T> SegmentScanClient for Arc<T>
where
    T: SegmentScanClient + ?Sized,
{
    async fn scan_segment(
        &self,
        request: ScanSegmentRequest,
    ) -> Result<ScanSegmentPage, RemoteError> {
        (**self).scan_segment(request).await
    }
}
