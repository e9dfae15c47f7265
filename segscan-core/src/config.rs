//! Scanner configuration and the validation that runs before any segment
//! starts.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use segscan_model::ExpressionParameters;

use crate::{client::SegmentScanClient, error::ConfigError, plan::ScanPlan};

pub const DEFAULT_TOTAL_SEGMENTS: u32 = 40;
pub const DEFAULT_LIMIT: u32 = 1_000;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Retry/backoff policy applied independently inside every segment loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry of a failed call.
    pub backoff_base_ms: u64,
    /// Ceiling for the exponential delay.
    pub backoff_max_ms: u64,
    /// Growth factor between consecutive failures.
    pub backoff_factor: f64,
    /// Randomise each delay between the base and the exponential anchor so
    /// segments failing together do not retry together.
    pub jitter: bool,
    /// Consecutive failed calls tolerated for one cursor position before the
    /// segment gives up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigError::InvalidRetry(format!(
                "backoff base {}ms is larger than backoff max {}ms",
                self.backoff_base_ms, self.backoff_max_ms
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ConfigError::InvalidRetry(format!(
                "backoff factor must be a finite value >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::InvalidRetry(
                "max_attempts must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 100,
            backoff_max_ms: 5 * 60 * 1_000,
            backoff_factor: 2.0,
            jitter: true,
            max_attempts: None,
        }
    }
}

/// What a segment does when the batch handler returns an error or panics.
///
/// Items in the failed batch are already counted and the cursor is not
/// rewound under any policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerFailurePolicy {
    /// Log the failure and keep paginating.
    Ignore,
    /// Stop this segment. It is not counted as completed; the other
    /// segments carry on and the scan returns a report listing it.
    AbortSegment,
    /// Stop every segment and fail the scan.
    #[default]
    AbortScan,
}

/// Validated, immutable scan configuration.
///
/// Construct through [`ScanConfig::builder`].
#[derive(Clone)]
pub struct ScanConfig {
    client: Arc<dyn SegmentScanClient>,
    table_name: Arc<str>,
    total_segments: u32,
    local_segments: u32,
    segment_offset: u32,
    limit: u32,
    expression: Arc<ExpressionParameters>,
    retry: RetryConfig,
    handler_failure: HandlerFailurePolicy,
    event_channel_capacity: usize,
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("table_name", &self.table_name)
            .field("total_segments", &self.total_segments)
            .field("local_segments", &self.local_segments)
            .field("segment_offset", &self.segment_offset)
            .field("limit", &self.limit)
            .field("expression", &self.expression)
            .field("retry", &self.retry)
            .field("handler_failure", &self.handler_failure)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .finish_non_exhaustive()
    }
}

impl ScanConfig {
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    pub fn client(&self) -> &Arc<dyn SegmentScanClient> {
        &self.client
    }

    pub fn table_name(&self) -> &Arc<str> {
        &self.table_name
    }

    pub fn total_segments(&self) -> u32 {
        self.total_segments
    }

    pub fn local_segments(&self) -> u32 {
        self.local_segments
    }

    pub fn segment_offset(&self) -> u32 {
        self.segment_offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn expression(&self) -> &Arc<ExpressionParameters> {
        &self.expression
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn handler_failure(&self) -> HandlerFailurePolicy {
        self.handler_failure
    }

    pub fn event_channel_capacity(&self) -> usize {
        self.event_channel_capacity
    }
}

/// Collects scan settings and applies defaults before validation.
#[derive(Default)]
pub struct ScanConfigBuilder {
    client: Option<Arc<dyn SegmentScanClient>>,
    table_name: Option<String>,
    total_segments: Option<u32>,
    local_segments: Option<u32>,
    segment_offset: u32,
    limit: Option<u32>,
    expression: ExpressionParameters,
    retry: RetryConfig,
    handler_failure: HandlerFailurePolicy,
    event_channel_capacity: Option<usize>,
}

impl fmt::Debug for ScanConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfigBuilder")
            .field("has_client", &self.client.is_some())
            .field("table_name", &self.table_name)
            .field("total_segments", &self.total_segments)
            .field("local_segments", &self.local_segments)
            .field("segment_offset", &self.segment_offset)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl ScanConfigBuilder {
    pub fn client<C>(mut self, client: Arc<C>) -> Self
    where
        C: SegmentScanClient + 'static,
    {
        let client: Arc<dyn SegmentScanClient> = client;
        self.client = Some(client);
        self
    }

    pub fn shared_client(mut self, client: Arc<dyn SegmentScanClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn total_segments(mut self, total: u32) -> Self {
        self.total_segments = Some(total);
        self
    }

    /// Number of segments this instance scans. Defaults to the total.
    pub fn local_segments(mut self, local: u32) -> Self {
        self.local_segments = Some(local);
        self
    }

    /// Block index of this instance; it owns global segments
    /// `offset * local .. offset * local + local`.
    pub fn segment_offset(mut self, offset: u32) -> Self {
        self.segment_offset = offset;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn expression(mut self, expression: ExpressionParameters) -> Self {
        self.expression = expression;
        self
    }

    pub fn filter_expression(mut self, filter: impl Into<String>) -> Self {
        self.expression.filter_expression = Some(filter.into());
        self
    }

    pub fn projection_expression(
        mut self,
        projection: impl Into<String>,
    ) -> Self {
        self.expression.projection_expression = Some(projection.into());
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn handler_failure(mut self, policy: HandlerFailurePolicy) -> Self {
        self.handler_failure = policy;
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        let table_name = match self.table_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ConfigError::MissingTableName),
        };
        let client = self.client.ok_or(ConfigError::MissingClient)?;

        let total_segments =
            self.total_segments.unwrap_or(DEFAULT_TOTAL_SEGMENTS);
        let local_segments = match self.local_segments {
            Some(0) | None => total_segments,
            Some(local) => local,
        };
        ScanPlan::new(total_segments, self.segment_offset, local_segments)?;

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        self.retry.validate()?;

        Ok(ScanConfig {
            client,
            table_name: Arc::from(table_name),
            total_segments,
            local_segments,
            segment_offset: self.segment_offset,
            limit,
            expression: Arc::new(self.expression),
            retry: self.retry,
            handler_failure: self.handler_failure,
            event_channel_capacity: self
                .event_channel_capacity
                .unwrap_or(DEFAULT_EVENT_CHANNEL_CAPACITY)
                .max(1),
        })
    }
}
