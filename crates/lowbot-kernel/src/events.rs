//! Dispatch event bus.
//!
//! Every observable milestone of the bot (an adapter coming online, a message
//! matched to an intent, a reply delivered, a failure recovered) is a
//! [`BotEvent`].  Emitting an event writes one structured `tracing` line at the
//! event's [`Severity`] and publishes it to any subscribers of the
//! [`EventBus`], which is built on [`tokio::sync::broadcast`].
//!
//! # Usage
//!
//! ```rust,no_run
//! # use lowbot_kernel::events::{BotEvent, EventBus};
//! # async fn example() {
//! let bus = EventBus::new(256);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(BotEvent::AdapterReady {
//!     adapter: "terminal".into(),
//!     timestamp: chrono::Utc::now(),
//! });
//!
//! let event = rx.recv().await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ErrorKind;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Log severity of a produced event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An event produced by the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BotEvent {
    /// An adapter resolved its credentials, constructed its client and logged
    /// in.
    AdapterReady {
        adapter: String,
        timestamp: DateTime<Utc>,
    },

    /// An inbound message was classified and matched to a skill.
    IntentMatched {
        dispatch_id: Uuid,
        intent: String,
        score: f64,
        skill: String,
        adapter: String,
        channel: String,
        timestamp: DateTime<Utc>,
    },

    /// A skill reply was delivered to its channel.
    ReplySent {
        dispatch_id: Uuid,
        skill: String,
        adapter: String,
        channel: String,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch failed and went through recovery.
    Recovered {
        dispatch_id: Uuid,
        kind: ErrorKind,
        /// The pipeline stage that failed.
        stage: String,
        /// Display form of the underlying error.
        error: String,
        adapter: String,
        channel: String,
        /// Whether the apology reached the channel.
        reply_delivered: bool,
        timestamp: DateTime<Utc>,
    },
}

impl BotEvent {
    /// The severity this event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Self::AdapterReady { .. } | Self::IntentMatched { .. } => Severity::Info,
            Self::ReplySent { .. } => Severity::Success,
            Self::Recovered { kind, .. } => kind.severity(),
        }
    }

    /// Write this event as a structured log line.
    fn log(&self) {
        let severity = self.severity();
        match self {
            Self::AdapterReady { adapter, .. } => {
                tracing::info!(%severity, adapter = %adapter, "adapter ready");
            }
            Self::IntentMatched {
                dispatch_id,
                intent,
                score,
                skill,
                adapter,
                channel,
                ..
            } => {
                tracing::info!(
                    %severity,
                    %dispatch_id,
                    intent = %intent,
                    score = *score,
                    skill = %skill,
                    adapter = %adapter,
                    channel = %channel,
                    "message matched to intent"
                );
            }
            Self::ReplySent {
                dispatch_id,
                skill,
                adapter,
                channel,
                ..
            } => {
                tracing::info!(
                    %severity,
                    %dispatch_id,
                    skill = %skill,
                    adapter = %adapter,
                    channel = %channel,
                    "skill reply sent"
                );
            }
            Self::Recovered {
                dispatch_id,
                kind,
                stage,
                error,
                adapter,
                channel,
                reply_delivered,
                ..
            } => {
                // `tracing` has no level above ERROR; critical is carried in
                // the severity field.
                tracing::error!(
                    %severity,
                    %dispatch_id,
                    kind = %kind,
                    stage = %stage,
                    error = %error,
                    adapter = %adapter,
                    channel = %channel,
                    reply_delivered = *reply_delivered,
                    "dispatch failure recovered"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

/// Publish/subscribe event bus backed by [`tokio::sync::broadcast`].
///
/// The bus is cheaply cloneable (`Arc`-backed) and `Send + Sync`.  Subscribers
/// receive [`Arc<BotEvent>`] references.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    sender: broadcast::Sender<Arc<BotEvent>>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// A subscriber that falls behind by more than `capacity` events receives
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(EventBusInner { sender }),
        }
    }

    /// Log an event and publish it to all current subscribers.
    ///
    /// Returns the number of receivers that will observe this event.  With no
    /// subscribers the event is only logged.
    pub fn emit(&self, event: BotEvent) -> usize {
        event.log();
        match self.inner.sender.send(Arc::new(event)) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!("event emitted but no active subscribers");
                0
            }
        }
    }

    /// Create a new subscriber that will receive all future events.
    ///
    /// Events emitted *before* this call are **not** replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BotEvent>> {
        self.inner.sender.subscribe()
    }

    /// Return the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let receivers = bus.emit(BotEvent::AdapterReady {
            adapter: "terminal".into(),
            timestamp: Utc::now(),
        });
        assert_eq!(receivers, 1);

        let received = rx.recv().await.expect("should receive event");
        match received.as_ref() {
            BotEvent::AdapterReady { adapter, .. } => assert_eq!(adapter, "terminal"),
            other => panic!("unexpected event variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_share_the_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(BotEvent::AdapterReady {
            adapter: "webhook".into(),
            timestamp: Utc::now(),
        });

        let e1 = rx1.recv().await.expect("rx1");
        let e2 = rx2.recv().await.expect("rx2");
        assert!(Arc::ptr_eq(&e1, &e2));
    }

    #[test]
    fn emit_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let n = bus.emit(BotEvent::AdapterReady {
            adapter: "terminal".into(),
            timestamp: Utc::now(),
        });
        assert_eq!(n, 0);
    }

    #[test]
    fn severities() {
        let sent = BotEvent::ReplySent {
            dispatch_id: Uuid::now_v7(),
            skill: "greeter".into(),
            adapter: "terminal".into(),
            channel: "general".into(),
            timestamp: Utc::now(),
        };
        assert_eq!(sent.severity(), Severity::Success);

        let recovered = BotEvent::Recovered {
            dispatch_id: Uuid::now_v7(),
            kind: ErrorKind::Unknown,
            stage: "formatting".into(),
            error: "unknown adapter: irc".into(),
            adapter: "irc".into(),
            channel: "general".into(),
            reply_delivered: false,
            timestamp: Utc::now(),
        };
        assert_eq!(recovered.severity(), Severity::Critical);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = BotEvent::AdapterReady {
            adapter: "terminal".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "adapter_ready");
        assert_eq!(json["adapter"], "terminal");
    }
}
