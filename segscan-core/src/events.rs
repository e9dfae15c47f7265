//! In-process notifications about segment progress.

use std::{fmt, time::Duration};

use serde::Serialize;
use tokio::sync::broadcast;

/// Lifecycle notifications published by the segment loops.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    SegmentStarted {
        segment: u32,
    },
    /// A page came back from the store and was counted. Published before
    /// the handler sees it, so it says nothing about handler success.
    PageRetrieved {
        segment: u32,
        page: u64,
        items: u32,
        has_more: bool,
    },
    RetryScheduled {
        segment: u32,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    SegmentCompleted {
        segment: u32,
        pages: u64,
        items: u64,
    },
    SegmentAborted {
        segment: u32,
        reason: String,
    },
}

impl ScanEvent {
    pub fn segment(&self) -> u32 {
        match self {
            Self::SegmentStarted { segment }
            | Self::PageRetrieved { segment, .. }
            | Self::RetryScheduled { segment, .. }
            | Self::SegmentCompleted { segment, .. }
            | Self::SegmentAborted { segment, .. } => *segment,
        }
    }
}

/// Broadcast fan-out of [`ScanEvent`]s. Publishing never blocks and events
/// are dropped when nobody subscribes; slow subscribers observe `Lagged`.
#[derive(Clone)]
pub struct ScanEventBus {
    sender: broadcast::Sender<ScanEvent>,
    capacity: usize,
}

impl fmt::Debug for ScanEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl ScanEventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ScanEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = ScanEventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(ScanEvent::SegmentStarted { segment: 3 });
        bus.publish(ScanEvent::SegmentCompleted {
            segment: 3,
            pages: 2,
            items: 7,
        });

        assert_eq!(rx.recv().await.unwrap().segment(), 3);
        assert!(matches!(
            rx.recv().await.unwrap(),
            ScanEvent::SegmentCompleted { items: 7, .. }
        ));
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let bus = ScanEventBus::new(1);
        bus.publish(ScanEvent::SegmentStarted { segment: 0 });
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(ScanEvent::SegmentAborted {
            segment: 1,
            reason: "handler failed".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "segment_aborted");
        assert_eq!(json["segment"], 1);

        let json = serde_json::to_value(ScanEvent::PageRetrieved {
            segment: 2,
            page: 0,
            items: 5,
            has_more: false,
        })
        .unwrap();
        assert_eq!(json["event"], "page_retrieved");
    }
}
