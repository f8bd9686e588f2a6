// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! The notification bus fans out a single stream of [`Notification`]s to
//! every connected API client.
//!
//! State mutators never talk to subscribers directly. A mutation enqueues
//! onto a bounded internal channel (non-blocking: full means the publisher
//! logs and drops rather than waits) and a forwarder task drains that queue
//! and rebroadcasts. This keeps the state lock's critical section free of
//! anything that could block on a slow or absent reader.

use tokio::sync::{broadcast, mpsc};
use zt_core::Notification;

const QUEUE_CAPACITY: usize = 256;
const BROADCAST_CAPACITY: usize = 256;

/// The publishing half, held by [`crate::State`].
#[derive(Clone)]
pub struct Bus {
    queue: mpsc::Sender<Notification>,
}

impl Bus {
    /// Publishes a notification. Never blocks: if the internal queue is
    /// full (a forwarder stall, or a burst far beyond normal operation)
    /// the notification is logged and dropped rather than risk stalling
    /// whatever lock the caller holds.
    pub fn publish(&self, notification: Notification) {
        if let Err(mpsc::error::TrySendError::Full(n)) = self.queue.try_send(notification) {
            tracing::warn!(method = %n.method, "notification bus queue full, dropping");
        }
    }
}

/// The subscribing half: one receiver per connected API client.
pub struct BusHandle {
    bus: Bus,
    broadcast_tx: broadcast::Sender<Notification>,
}

impl BusHandle {
    pub fn new() -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let forwarder_tx = broadcast_tx.clone();
        tokio::spawn(forward(queue_rx, forwarder_tx));
        Self {
            bus: Bus { queue: queue_tx },
            broadcast_tx,
        }
    }

    pub fn publisher(&self) -> Bus {
        self.bus.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.broadcast_tx.subscribe()
    }
}

impl Default for BusHandle {
    fn default() -> Self {
        Self::new()
    }
}

async fn forward(
    mut queue_rx: mpsc::Receiver<Notification>,
    broadcast_tx: broadcast::Sender<Notification>,
) {
    while let Some(notification) = queue_rx.recv().await {
        // Err means there are currently no subscribers; that's fine, the
        // next WS client to connect just won't see history.
        let _ = broadcast_tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_notification_reaches_subscriber() {
        let handle = BusHandle::new();
        let mut rx = handle.subscribe();
        let publisher = handle.publisher();

        publisher.publish(Notification::new("tokens.added", serde_json::json!({})));

        let got = rx.recv().await.expect("notification");
        assert_eq!(got.method, "tokens.added");
    }

    #[tokio::test]
    async fn subscriber_added_after_publish_misses_it() {
        let handle = BusHandle::new();
        let publisher = handle.publisher();
        publisher.publish(Notification::new("tokens.added", serde_json::json!({})));

        // give the forwarder a chance to run with zero subscribers
        tokio::task::yield_now().await;

        let mut rx = handle.subscribe();
        publisher.publish(Notification::new("tokens.removed", serde_json::json!({})));
        let got = rx.recv().await.expect("notification");
        assert_eq!(got.method, "tokens.removed");
    }
}
