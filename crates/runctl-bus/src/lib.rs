// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! runctl-bus: the message bus fabric bridging workers and streaming clients.
//!
//! Two channel families are addressed by name alone (`run_results:{id}`,
//! `run_logs:{id}`); the bus itself knows nothing about runs. Delivery is
//! best-effort, at-most-once per subscriber, FIFO per `(channel, subscriber)`.
//! A slow subscriber has oldest messages dropped from under it rather than
//! stalling the publisher or any other subscriber — this falls directly out
//! of [`tokio::sync::broadcast`]'s lagged-receiver semantics.

mod gc;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Per-subscriber buffer depth before the oldest unread message is dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A single message published to a channel.
pub type Message = Arc<[u8]>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("channel closed")]
    Closed,
}

/// A bus-wide publish/subscribe contract.
///
/// Implementations must guarantee that `subscribe` is cheap to call before
/// any `publish` has happened (channels are created lazily) and that a slow
/// subscriber never blocks delivery to others on the same channel.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Fire-and-forget publish. Returns how many live subscribers received
    /// the message (informational only; callers must not treat zero
    /// recipients as an error).
    fn publish(&self, channel: &str, message: Message) -> usize;

    /// Subscribe to a channel, creating it if this is the first touch.
    /// Only messages published after this call are ever observed.
    fn subscribe(&self, channel: &str) -> Subscription;
}

/// A live subscription to one channel. Dropping it releases the
/// subscriber-side resources; there is no separate `release` call because
/// Rust's ownership model makes that the natural place for it.
pub struct Subscription {
    inner: BroadcastStream<Message>,
}

impl Subscription {
    fn new(rx: broadcast::Receiver<Message>) -> Self {
        Self { inner: BroadcastStream::new(rx) }
    }

    /// Pull the next message, skipping over (and counting) any `Lagged`
    /// notifications rather than surfacing them as stream items — a
    /// subscriber that fell behind simply sees the next surviving message.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.inner.next().await {
                Some(Ok(msg)) => return Some(msg),
                Some(Err(BroadcastStreamRecvError::Lagged(n))) => {
                    tracing::debug!(skipped = n, "subscriber lagged, dropping oldest messages");
                    continue;
                }
                None => return None,
            }
        }
    }
}

use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

struct ChannelState {
    tx: broadcast::Sender<Message>,
    touched_at: Instant,
}

/// The concrete, in-process message bus. Backed by one
/// [`tokio::sync::broadcast`] channel per channel name, created lazily and
/// garbage-collected once idle and subscriber-less.
pub struct BroadcastBus {
    pub(crate) channels: parking_lot::Mutex<HashMap<String, ChannelState>>,
    capacity: usize,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self { channels: parking_lot::Mutex::new(HashMap::new()), capacity })
    }

    /// Spawn the background idle-channel sweep. Mirrors the coordinator's
    /// reaper in shape: a periodic task bounded by a cancellation token.
    pub fn spawn_gc(self: &Arc<Self>, idle_after: Duration, shutdown: tokio_util::sync::CancellationToken) {
        gc::spawn(Arc::clone(self), idle_after, shutdown);
    }

    fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self { channels: parking_lot::Mutex::new(HashMap::new()), capacity: DEFAULT_CHANNEL_CAPACITY }
    }
}

#[async_trait]
impl MessageBus for BroadcastBus {
    fn publish(&self, channel: &str, message: Message) -> usize {
        let mut channels = self.channels.lock();
        let entry = channels.entry(channel.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(self.capacity);
            ChannelState { tx, touched_at: Instant::now() }
        });
        entry.touched_at = Instant::now();
        // `send` only errors when there are zero receivers; that's a normal
        // no-one-is-listening-yet case here, not a failure.
        entry.tx.send(message).unwrap_or(0)
    }

    fn subscribe(&self, channel: &str) -> Subscription {
        let mut channels = self.channels.lock();
        let entry = channels.entry(channel.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(self.capacity);
            ChannelState { tx, touched_at: Instant::now() }
        });
        entry.touched_at = Instant::now();
        Subscription::new(entry.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(s: &str) -> Message {
        Message::from(s.as_bytes().to_vec().into_boxed_slice())
    }

    #[tokio::test]
    async fn subscriber_sees_only_messages_published_after_subscribe() {
        let bus = BroadcastBus::new(16);
        bus.publish("c", msg("before"));
        let mut sub = bus.subscribe("c");
        bus.publish("c", msg("after"));
        let got = sub.recv().await.unwrap();
        assert_eq!(&*got, b"after");
    }

    #[tokio::test]
    async fn two_subscribers_each_get_every_message_independently() {
        let bus = BroadcastBus::new(16);
        let mut a = bus.subscribe("c");
        let mut b = bus.subscribe("c");
        bus.publish("c", msg("x"));
        assert_eq!(&*a.recv().await.unwrap(), b"x");
        assert_eq!(&*b.recv().await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_oldest_without_erroring_the_stream() {
        let bus = BroadcastBus::new(2);
        let mut sub = bus.subscribe("c");
        for i in 0..10 {
            bus.publish("c", msg(&i.to_string()));
        }
        // The lagged subscriber should still get a live message, not None/hang.
        let got = sub.recv().await;
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = BroadcastBus::new(16);
        let delivered = bus.publish("nobody-listening", msg("x"));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn channels_are_created_lazily() {
        let bus = BroadcastBus::default();
        assert_eq!(bus.channel_count(), 0);
        let _ = bus.subscribe("c");
        assert_eq!(bus.channel_count(), 1);
    }
}
