//! Event broadcasting for live notifications.
//!
//! This module provides a pub/sub mechanism for pushing new notifications to
//! connected SSE clients. Notification rows are always written to the store
//! first; the broadcast is a best-effort push on top of that, so a reader
//! with no open stream simply picks them up from the listing later.
//!
//! # Architecture
//!
//! - Uses `tokio::sync::broadcast` for multi-subscriber pub/sub
//! - One channel per user (created lazily on first subscription)
//! - Channels are cleaned up when all subscribers disconnect
//!
//! # Event Types
//!
//! - `notification`: A notification was created for the subscriber
//! - `heartbeat`: Sent periodically to keep connections alive
//! - `catchup`: Sent when a subscriber falls behind

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use elibrary_core::{Notification, UserId};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};

/// Default channel capacity for broadcast channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Heartbeat interval in seconds.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

// ============================================================================
// Event Types
// ============================================================================

/// An event that can be pushed to a subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LibraryEvent {
    /// A notification row was created for the subscriber.
    Notification(Notification),
    /// Periodic heartbeat to keep connection alive.
    Heartbeat(HeartbeatEvent),
    /// Client fell behind and should re-list its notifications.
    Catchup(CatchupEvent),
}

impl LibraryEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::Heartbeat(_) => "heartbeat",
            Self::Catchup(_) => "catchup",
        }
    }
}

/// Heartbeat event data.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatEvent {
    /// Current timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Catchup event sent when subscriber falls behind.
#[derive(Debug, Clone, Serialize)]
pub struct CatchupEvent {
    /// Number of events missed.
    pub events_missed: u64,
    /// Timestamp of the catchup event.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Notification Broadcaster
// ============================================================================

/// Manages broadcast channels for per-user notification pushes.
#[derive(Debug, Clone)]
pub struct NotificationBroadcaster {
    /// Map of user_id -> broadcast sender.
    channels: Arc<RwLock<HashMap<UserId, broadcast::Sender<LibraryEvent>>>>,
    /// Channel capacity for new channels.
    capacity: usize,
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBroadcaster {
    /// Create a new broadcaster with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new broadcaster with custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Subscribe to a user's events, creating the channel if needed.
    pub async fn subscribe(&self, user_id: UserId) -> broadcast::Receiver<LibraryEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&user_id) {
                return sender.subscribe();
            }
        }

        let mut channels = self.channels.write().await;
        // Another task may have created it between the two locks.
        if let Some(sender) = channels.get(&user_id) {
            return sender.subscribe();
        }

        let (sender, receiver) = broadcast::channel(self.capacity);
        channels.insert(user_id, sender);

        tracing::debug!(
            user_id = %user_id,
            capacity = self.capacity,
            "Created notification channel"
        );

        receiver
    }

    /// Publish an event to all subscribers of a user.
    ///
    /// Returns the number of receivers that got the event, or None if the
    /// user has no open channel.
    pub async fn publish(&self, user_id: UserId, event: LibraryEvent) -> Option<usize> {
        let channels = self.channels.read().await;
        let sender = channels.get(&user_id)?;
        match sender.send(event) {
            Ok(count) => {
                tracing::trace!(user_id = %user_id, receivers = count, "Published event");
                Some(count)
            }
            Err(_) => {
                // All receivers gone; cleanup_empty_channels drops the entry.
                Some(0)
            }
        }
    }

    /// Push freshly stored notifications to their recipients.
    ///
    /// Returns how many deliveries reached a live subscriber.
    pub async fn publish_notifications(&self, notifications: &[Notification]) -> usize {
        let mut delivered = 0;
        for notification in notifications {
            if let Some(count) = self
                .publish(
                    notification.user_id,
                    LibraryEvent::Notification(notification.clone()),
                )
                .await
            {
                delivered += count;
            }
        }
        delivered
    }

    /// Get the number of active channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Get the number of subscribers for a user.
    pub async fn subscriber_count(&self, user_id: UserId) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Drop channels with no subscribers. Returns how many were removed.
    pub async fn cleanup_empty_channels(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|id, sender| {
            let has_receivers = sender.receiver_count() > 0;
            if !has_receivers {
                tracing::debug!(user_id = %id, "Cleaning up empty notification channel");
            }
            has_receivers
        });
        before - channels.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
