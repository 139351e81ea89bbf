//! Event sink
//!
//! Every decoded frame is stamped with local time and pushed to dashboard
//! subscribers. The most recent events are retained so a subscriber that
//! connects late still sees what just happened.

use std::collections::VecDeque;
use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};
use coop_protocol::ProtocolEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Number of events retained
pub const HISTORY_LEN: usize = 10;

/// A decoded frame as the dashboard sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerEvent {
    /// Sender id, or `COORD`
    #[serde(rename = "own")]
    pub owner: String,
    /// Wire tag (`CON`, `FINAL`, `STR`)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "typeId")]
    pub type_id: u8,
    #[serde(rename = "pos")]
    pub position: i32,
    /// `HH:MM:SS`
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    /// `DD/MM/YY`
    #[serde(rename = "dateStamp")]
    pub date_stamp: String,
}

impl ControllerEvent {
    /// Stamp an event with the given time
    pub fn stamped<Tz>(event: &ProtocolEvent, at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            owner: event.owner.to_string(),
            kind: event.kind.tag().to_string(),
            type_id: event.kind.type_id(),
            position: event.position,
            time_stamp: at.format("%H:%M:%S").to_string(),
            date_stamp: at.format("%d/%m/%y").to_string(),
        }
    }

    /// Stamp an event with the current local time
    pub fn now(event: &ProtocolEvent) -> Self {
        Self::stamped(event, &Local::now())
    }
}

/// Retained events, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "message", default)]
    messages: VecDeque<ControllerEvent>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event, dropping the oldest past [`HISTORY_LEN`]
    pub fn push(&mut self, event: ControllerEvent) {
        self.messages.push_front(event);
        self.messages.truncate(HISTORY_LEN);
    }

    /// Events, newest first
    pub fn iter(&self) -> impl Iterator<Item = &ControllerEvent> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn latest(&self) -> Option<&ControllerEvent> {
        self.messages.front()
    }

    /// Enforce the length bound on a history loaded from elsewhere
    pub fn normalize(mut self) -> Self {
        self.messages.truncate(HISTORY_LEN);
        self
    }
}

/// What a new subscriber receives
#[derive(Debug)]
pub struct Subscription {
    /// Retained events, newest first
    pub replay: Vec<ControllerEvent>,
    /// Events published from now on
    pub live: broadcast::Receiver<ControllerEvent>,
}

/// Fan-out of controller events with bounded history
#[derive(Debug)]
pub struct EventSink {
    history: History,
    tx: broadcast::Sender<ControllerEvent>,
}

impl EventSink {
    /// Create a sink whose live channel buffers `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        Self::with_history(History::new(), capacity)
    }

    /// Create a sink seeded with previously retained events
    pub fn with_history(history: History, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            history: history.normalize(),
            tx,
        }
    }

    /// Record an event and push it to every subscriber
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&mut self, event: ControllerEvent) {
        trace!("Event {} from {} at {}", event.kind, event.owner, event.position);
        self.history.push(event.clone());
        let _ = self.tx.send(event);
    }

    /// Subscribe, receiving the retained history first
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            replay: self.history.iter().cloned().collect(),
            live: self.tx.subscribe(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(64)
    }
}
