//! Partitioning of the global segment space across worker instances.
//!
//! Instance `offset` that scans `local` segments owns the contiguous block
//! `offset * local .. offset * local + local`. Giving every horizontally
//! scaled instance the same `local` and a distinct `offset` partitions the
//! table without overlap.

use std::ops::Range;

use serde::Serialize;

use crate::error::ConfigError;

/// Global segment indices owned by one scanner instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScanPlan {
    total_segments: u32,
    segment_offset: u32,
    local_segments: u32,
}

impl ScanPlan {
    pub fn new(
        total_segments: u32,
        segment_offset: u32,
        local_segments: u32,
    ) -> Result<Self, ConfigError> {
        if total_segments == 0 {
            return Err(ConfigError::ZeroTotalSegments);
        }
        if local_segments == 0 {
            return Err(ConfigError::ZeroLocalSegments);
        }
        if local_segments > total_segments {
            return Err(ConfigError::LocalExceedsTotal {
                local: local_segments,
                total: total_segments,
            });
        }

        let end = u64::from(segment_offset) * u64::from(local_segments)
            + u64::from(local_segments);
        if end > u64::from(total_segments) {
            return Err(ConfigError::OffsetOutOfRange {
                offset: segment_offset,
                local: local_segments,
                total: total_segments,
            });
        }

        Ok(Self {
            total_segments,
            segment_offset,
            local_segments,
        })
    }

    pub fn total_segments(&self) -> u32 {
        self.total_segments
    }

    pub fn segment_offset(&self) -> u32 {
        self.segment_offset
    }

    pub fn local_segments(&self) -> u32 {
        self.local_segments
    }

    pub fn range(&self) -> Range<u32> {
        let start = self.segment_offset * self.local_segments;
        start..start + self.local_segments
    }

    /// Global index of the `local`-th segment of this instance.
    pub fn global_index(&self, local: u32) -> Option<u32> {
        (local < self.local_segments)
            .then(|| self.segment_offset * self.local_segments + local)
    }

    pub fn segments(&self) -> Vec<u32> {
        self.range().collect()
    }
}

/// Ordered global segment indices for `(total, offset, local)`.
pub fn segments(
    total_segments: u32,
    segment_offset: u32,
    local_segments: u32,
) -> Result<Vec<u32>, ConfigError> {
    ScanPlan::new(total_segments, segment_offset, local_segments)
        .map(|plan| plan.segments())
}
