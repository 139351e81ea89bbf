//! Virtual slider controller

use std::collections::VecDeque;

use coop_protocol::{
    clamp_position, ControllerId, EventKind, OutboundFrame, Owner, ParseError, ProtocolEvent,
};
use tracing::debug;

/// A simulated slider controller
///
/// Moving the slider queues the payloads a real controller would transmit.
/// Broadcasts from the coordinator move the slider unless they carry the
/// slider's own id, which is how a controller ignores its own echo.
#[derive(Debug)]
pub struct VirtualSlider {
    id: ControllerId,
    /// Reserved message-type field written into every payload
    msg_type: String,
    position: i32,
    pending_output: VecDeque<String>,
    received: Vec<OutboundFrame>,
}

impl VirtualSlider {
    /// Create a slider resting at position 0
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ControllerId::new(id),
            msg_type: "0".to_string(),
            position: 0,
            pending_output: VecDeque::new(),
            received: Vec::new(),
        }
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Move the slider and queue a `CON` payload
    pub fn drag_to(&mut self, position: i32) -> String {
        self.position = clamp_position(position as i64);
        self.queue(EventKind::Continuous)
    }

    /// Let go of the slider and queue a `FINAL` payload
    pub fn release(&mut self) -> String {
        self.queue(EventKind::Final)
    }

    /// Report a conflict at `position` and queue a `STR` payload
    pub fn struggle(&mut self, position: i32) -> String {
        self.position = clamp_position(position as i64);
        self.queue(EventKind::Struggle)
    }

    fn queue(&mut self, kind: EventKind) -> String {
        let event = ProtocolEvent {
            kind,
            owner: Owner::Controller(self.id.clone()),
            msg_type: self.msg_type.clone(),
            position: self.position,
        };
        let payload = event.encode();
        self.pending_output.push_back(payload.clone());
        payload
    }

    /// Take the next queued payload
    pub fn take_output(&mut self) -> Option<String> {
        self.pending_output.pop_front()
    }

    /// Take every queued payload
    pub fn drain_output(&mut self) -> Vec<String> {
        self.pending_output.drain(..).collect()
    }

    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }

    /// Handle a broadcast from the coordinator
    ///
    /// Returns whether the slider moved.
    pub fn receive(&mut self, payload: &str) -> Result<bool, ParseError> {
        let frame = OutboundFrame::parse(payload)?;
        let own_echo = frame.owner.controller_id() == Some(&self.id);
        let moved = !own_echo && frame.position != self.position;

        if moved {
            debug!("{} adopting {} from {}", self.id, frame.position, frame.owner);
            self.position = frame.position;
        }
        self.received.push(frame);
        Ok(moved)
    }

    /// Every broadcast received, oldest first
    pub fn received(&self) -> &[OutboundFrame] {
        &self.received
    }
}
