use std::{fmt, sync::Arc};

use async_trait::async_trait;

use segscan_model::ItemBatch;

use crate::error::HandlerError;

/// Receives every page of items the scan retrieves.
///
/// The handler is shared by all segment tasks and called concurrently, so it
/// must be safe for concurrent use (or serialize internally). Batches from
/// different segments arrive in any interleaving; batches of one segment
/// arrive in cursor order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle(&self, batch: ItemBatch) -> Result<(), HandlerError>;
}

#[async_trait]
impl<H> BatchHandler for Arc<H>
where
    H: BatchHandler + ?Sized,
{
    async fn handle(&self, batch: ItemBatch) -> Result<(), HandlerError> {
        (**self).handle(batch).await
    }
}

/// Adapts a synchronous closure into a [`BatchHandler`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> BatchHandler for HandlerFn<F>
where
    F: Fn(ItemBatch) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, batch: ItemBatch) -> Result<(), HandlerError> {
        (self.f)(batch)
    }
}

pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(ItemBatch) -> Result<(), HandlerError> + Send + Sync,
{
    HandlerFn { f }
}
