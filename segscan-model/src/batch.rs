use crate::attribute::Item;

/// Items from one page of one segment, handed to the caller's handler.
///
/// The batch is moved into the handler; keep it if you need it.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBatch {
    /// Global segment index the page came from.
    pub segment: u32,
    /// Zero-based page number within the segment for this scan.
    pub page: u64,
    pub items: Vec<Item>,
}

impl ItemBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
