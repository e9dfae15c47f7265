use std::fmt;

use crate::attribute::Item;

/// Opaque continuation token marking a position inside one segment.
///
/// It wraps the key attributes of the last item the store evaluated. The
/// scanner never looks inside; it only hands the cursor back on the next
/// request. An absent cursor means "start of segment" on a request and
/// "no more pages" on a response.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SegmentCursor(Item);

impl SegmentCursor {
    pub fn new(key: Item) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &Item {
        &self.0
    }

    pub fn into_key(self) -> Item {
        self.0
    }
}

impl From<Item> for SegmentCursor {
    fn from(key: Item) -> Self {
        Self(key)
    }
}

// Keys can carry user data, so only the shape is printed.
impl fmt::Debug for SegmentCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("SegmentCursor")
            .field("attributes", &names)
            .finish()
    }
}
