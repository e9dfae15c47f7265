//! Settings loading for segscan workers.
//!
//! A worker resolves its [`ScannerSettings`] from a settings file, inline
//! JSON or individual `SEGSCAN_*` variables, turns them into a validated
//! [`segscan_core::ScanConfig`] with its own client, and installs logging
//! through [`telemetry::init`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use segscan_config::{ScannerSettings, telemetry};
//! use segscan_core::{InMemoryTable, Scanner, SegmentScanClient, handler_fn};
//!
//! # async fn run() -> anyhow::Result<()> {
//! telemetry::init(telemetry::DEFAULT_DIRECTIVES)?;
//! let (settings, source) = ScannerSettings::load_from_env()?;
//! tracing::info!(
//!     source = %source.describe(),
//!     region = %settings.region,
//!     "settings loaded"
//! );
//!
//! let client: Arc<dyn SegmentScanClient> =
//!     Arc::new(InMemoryTable::new("orders", "id"));
//! let scanner = Scanner::new(settings.into_scan_config(client)?)?;
//! scanner.start(handler_fn(|_| Ok(()))).await?;
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod constants;
pub mod models;
pub mod telemetry;
pub mod util;

pub use models::{
    DEFAULT_REGION, RetrySettings, ScannerSettings, SettingsSource,
};
