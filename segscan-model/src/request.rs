use std::{collections::HashMap, sync::Arc};

use crate::{
    attribute::{AttributeValue, Item},
    cursor::SegmentCursor,
};

/// Filter/projection parameters forwarded untouched on every page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExpressionParameters {
    /// Condition the store applies after reading, before returning items.
    pub filter_expression: Option<String>,
    /// Comma separated attribute paths to return. All attributes when unset.
    pub projection_expression: Option<String>,
    /// `#name` placeholders used in the expressions.
    pub expression_attribute_names: HashMap<String, String>,
    /// `:value` placeholders used in the filter expression.
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

impl ExpressionParameters {
    pub fn is_empty(&self) -> bool {
        self.filter_expression.is_none()
            && self.projection_expression.is_none()
            && self.expression_attribute_names.is_empty()
            && self.expression_attribute_values.is_empty()
    }
}

/// One call of the remote scan-segment operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSegmentRequest {
    pub table_name: Arc<str>,
    /// Global segment index, in `[0, total_segments)`.
    pub segment: u32,
    pub total_segments: u32,
    /// Cursor from the previous page; `None` on the first call.
    pub exclusive_start_key: Option<SegmentCursor>,
    /// Maximum number of items the store evaluates for this page.
    pub limit: u32,
    pub expression: Arc<ExpressionParameters>,
}

/// One page of one segment as returned by the remote store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSegmentPage {
    pub items: Vec<Item>,
    /// Number of items returned after filtering.
    pub count: u32,
    /// Number of items evaluated before filtering.
    pub scanned_count: u32,
    /// Continuation cursor. `None` is the only completion signal; an empty
    /// page with a cursor is still mid-segment.
    pub last_evaluated_key: Option<SegmentCursor>,
}

impl ScanSegmentPage {
    /// Page whose `count` and `scanned_count` match the item list.
    pub fn new(
        items: Vec<Item>,
        last_evaluated_key: Option<SegmentCursor>,
    ) -> Self {
        let count = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Self {
            items,
            count,
            scanned_count: count,
            last_evaluated_key,
        }
    }

    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}
