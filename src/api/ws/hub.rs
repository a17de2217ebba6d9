//! Channel hub - in-memory subscriptions and broadcast delivery

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::frame::OutboundFrame;

/// Outbound queue of one socket
pub type FrameSender = mpsc::UnboundedSender<OutboundFrame>;

/// Tracks open sockets and their channel subscriptions.
///
/// Nothing is persisted; a reconnecting socket has to subscribe again.
/// Locks are always taken `sockets` first, then `channels`.
#[derive(Debug, Default)]
pub struct ChannelHub {
    sockets: RwLock<HashMap<String, FrameSender>>,
    channels: RwLock<HashMap<String, HashSet<String>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, connection_id: &str, sender: FrameSender) {
        self.sockets
            .write()
            .await
            .insert(connection_id.to_string(), sender);
    }

    /// Drop the socket and every subscription it held
    pub async fn disconnect(&self, connection_id: &str) {
        let mut sockets = self.sockets.write().await;
        sockets.remove(connection_id);

        let mut channels = self.channels.write().await;
        channels.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });

        debug!(connection_id, "Socket removed from channel hub");
    }

    /// Returns false when already subscribed or when the socket is gone
    pub async fn subscribe(&self, connection_id: &str, channel: &str) -> bool {
        let sockets = self.sockets.read().await;

        if !sockets.contains_key(connection_id) {
            debug!(connection_id, channel, "Ignoring subscribe from closed socket");
            return false;
        }

        self.channels
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .insert(connection_id.to_string())
    }

    /// Returns false when not subscribed
    pub async fn unsubscribe(&self, connection_id: &str, channel: &str) -> bool {
        let mut channels = self.channels.write().await;

        let Some(members) = channels.get_mut(channel) else {
            return false;
        };
        let removed = members.remove(connection_id);

        if members.is_empty() {
            channels.remove(channel);
        }

        removed
    }

    /// Send `message` to every subscriber of `channel`; returns how many were reached
    pub async fn broadcast(&self, channel: &str, message: Value) -> usize {
        let sockets = self.sockets.read().await;
        let channels = self.channels.read().await;

        let Some(members) = channels.get(channel) else {
            return 0;
        };

        let delivered = members
            .iter()
            .filter_map(|id| sockets.get(id))
            .filter(|sender| {
                sender
                    .send(OutboundFrame::broadcast(channel, message.clone()))
                    .is_ok()
            })
            .count();

        debug!(channel, delivered, "Broadcast delivered");
        delivered
    }

    pub async fn subscriptions(&self, connection_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .read()
            .await
            .iter()
            .filter(|(_, members)| members.contains(connection_id))
            .map(|(name, _)| name.clone())
            .collect();

        names.sort();
        names
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map_or(0, HashSet::len)
    }
}
