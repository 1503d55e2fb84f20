use crossbeam_channel::{Receiver, Sender};
use strum::{Display, EnumString};

use crate::search::{QueryOutcome, TagCloud};

const NOTIFICATION_WIDTH: i32 = 200;
const NOTIFICATION_HEIGHT: i32 = 40;
const ANCHOR_OFFSET: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Screen point a notification should appear next to (e.g. the pointer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    /// Top-left corner for the notification box, offset from the anchor and
    /// flipped to the other side when it would leave the viewport.
    pub fn place(&self, viewport_width: i32, viewport_height: i32) -> (i32, i32) {
        let mut x = self.x.saturating_add(ANCHOR_OFFSET);
        let mut y = self.y.saturating_add(ANCHOR_OFFSET);
        if x.saturating_add(NOTIFICATION_WIDTH) > viewport_width {
            x = self
                .x
                .saturating_sub(NOTIFICATION_WIDTH)
                .saturating_sub(ANCHOR_OFFSET);
        }
        if y.saturating_add(NOTIFICATION_HEIGHT) > viewport_height {
            y = self
                .y
                .saturating_sub(NOTIFICATION_HEIGHT)
                .saturating_sub(ANCHOR_OFFSET);
        }
        (x, y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub anchor: Option<Anchor>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            anchor: None,
        }
    }

    pub fn anchored(mut self, anchor: Option<Anchor>) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Everything the board publishes to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    VisibilityChanged(QueryOutcome),
    TagCloudRefreshed(TagCloud),
    Notify(Notification),
}

/// Fan-out of board events to every live subscriber.
///
/// Notifications raised while nobody is subscribed (startup) are held back
/// and delivered to the first subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<BoardEvent>>,
    backlog: Vec<Notification>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for notification in self.backlog.drain(..) {
            let _ = tx.send(BoardEvent::Notify(notification));
        }
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: BoardEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        if self.subscribers.is_empty() {
            if let BoardEvent::Notify(notification) = event {
                self.backlog.push(notification);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_offsets_and_flips_near_edges() {
        let anchor = Anchor { x: 100, y: 100 };
        assert_eq!(anchor.place(1024, 768), (110, 110));
        assert_eq!(anchor.place(250, 768), (-110, 110));
        assert_eq!(anchor.place(1024, 130), (110, 50));
    }

    #[test]
    fn extreme_anchors_saturate() {
        let far = Anchor {
            x: i32::MAX,
            y: i32::MAX,
        };
        assert_eq!(
            far.place(1024, 768),
            (
                i32::MAX - NOTIFICATION_WIDTH - ANCHOR_OFFSET,
                i32::MAX - NOTIFICATION_HEIGHT - ANCHOR_OFFSET
            )
        );
        let below = Anchor {
            x: i32::MIN,
            y: i32::MIN,
        };
        assert_eq!(
            below.place(1024, 768),
            (i32::MIN + ANCHOR_OFFSET, i32::MIN + ANCHOR_OFFSET)
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::default();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        bus.publish(BoardEvent::Notify(Notification::new(Severity::Info, "hi")));
        assert_eq!(bus.subscribers.len(), 1);
        assert_eq!(
            kept.try_recv().ok(),
            Some(BoardEvent::Notify(Notification::new(Severity::Info, "hi")))
        );
    }

    #[test]
    fn notifications_before_first_subscriber_are_replayed() {
        let mut bus = EventBus::default();
        bus.publish(BoardEvent::TagCloudRefreshed(TagCloud::default()));
        bus.publish(BoardEvent::Notify(Notification::new(Severity::Error, "early")));
        let rx = bus.subscribe();
        let replayed: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            replayed,
            vec![BoardEvent::Notify(Notification::new(Severity::Error, "early"))]
        );
        assert!(bus.subscribe().try_recv().is_err());
    }

    #[test]
    fn severity_renders_lowercase() {
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
