//! Cooperative Slider Protocol Library
//!
//! This crate provides parsing and encoding for the text protocol spoken
//! between the slider controllers and the coordinator over the shared radio
//! channel.
//!
//! # Format
//!
//! Inbound payloads are `|`-delimited:
//!
//! - `CON|<id>|<type>|<position>` - live position while a slider is moving
//! - `FINAL|<id>|<type>|<position>` - the slider stopped at this position
//! - `STR|<id>|<type>|<position>` - two controllers are fighting over the value
//!
//! Outbound payloads are always `CON|<owner>|<position>`, where the owner is
//! either the controller that produced the value or the coordinator sentinel
//! `COORD`.
//!
//! # Example
//!
//! ```rust
//! use coop_protocol::{parse_frame, EventKind, Owner};
//!
//! let event = parse_frame("FINAL|C59|0|9000").unwrap();
//! assert_eq!(event.kind, EventKind::Final);
//! assert_eq!(event.owner, Owner::controller("C59"));
//! // Positions are clamped into the slider range
//! assert_eq!(event.position, 500);
//! ```

pub mod error;
pub mod frame;

use std::fmt;

pub use error::{ParseError, ProtocolError};
pub use frame::{parse_frame, FrameDecoder, OutboundFrame, MAX_FRAME_LEN};

/// Upper bound of the slider position range (inclusive)
pub const MAX_POS: i32 = 500;

/// Wire spelling of the coordinator sentinel
pub const COORDINATOR_TAG: &str = "COORD";

/// Clamp a raw position into `[0, MAX_POS]`
pub fn clamp_position(raw: i64) -> i32 {
    raw.clamp(0, MAX_POS as i64) as i32
}

/// Identifier of a physical slider unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ControllerId(String);

impl ControllerId {
    /// Create a controller id from its wire spelling
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as it appears on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControllerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who a position value is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Owner {
    /// A physical slider
    Controller(ControllerId),
    /// The coordinator itself; every slider treats this value as authoritative
    #[default]
    Coordinator,
}

impl Owner {
    /// Shorthand for `Owner::Controller(ControllerId::new(id))`
    pub fn controller(id: impl Into<String>) -> Self {
        Owner::Controller(ControllerId::new(id))
    }

    /// Parse the owner field of a frame
    pub fn from_wire(field: &str) -> Self {
        if field == COORDINATOR_TAG {
            Owner::Coordinator
        } else {
            Owner::controller(field)
        }
    }

    /// The controller id, if this is not the coordinator
    pub fn controller_id(&self) -> Option<&ControllerId> {
        match self {
            Owner::Controller(id) => Some(id),
            Owner::Coordinator => None,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Controller(id) => f.write_str(id.as_str()),
            Owner::Coordinator => f.write_str(COORDINATOR_TAG),
        }
    }
}

/// Message kind selected by the first field of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// `CON`: the slider is being moved
    Continuous,
    /// `FINAL`: the slider was released
    Final,
    /// `STR`: two controllers disagree
    Struggle,
}

impl EventKind {
    /// Wire tag for this kind
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Continuous => "CON",
            EventKind::Final => "FINAL",
            EventKind::Struggle => "STR",
        }
    }

    /// Numeric id used by the dashboard (CON=0, FINAL=1, STR=2)
    pub fn type_id(&self) -> u8 {
        match self {
            EventKind::Continuous => 0,
            EventKind::Final => 1,
            EventKind::Struggle => 2,
        }
    }

    /// Look up a kind by its wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CON" => Some(EventKind::Continuous),
            "FINAL" => Some(EventKind::Final),
            "STR" => Some(EventKind::Struggle),
            _ => None,
        }
    }
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProtocolEvent {
    /// Message kind
    pub kind: EventKind,
    /// Sender named in the frame
    pub owner: Owner,
    /// Reserved message-type field, kept verbatim
    pub msg_type: String,
    /// Position, already clamped into `[0, MAX_POS]`
    pub position: i32,
}

impl ProtocolEvent {
    /// Create an event without a message-type field
    pub fn new(kind: EventKind, owner: Owner, position: i32) -> Self {
        Self {
            kind,
            owner,
            msg_type: String::new(),
            position: clamp_position(position as i64),
        }
    }

    /// `CON` event from a controller
    pub fn continuous(id: impl Into<String>, position: i32) -> Self {
        Self::new(EventKind::Continuous, Owner::controller(id), position)
    }

    /// `FINAL` event from a controller
    pub fn final_position(id: impl Into<String>, position: i32) -> Self {
        Self::new(EventKind::Final, Owner::controller(id), position)
    }

    /// `STR` event from a controller
    pub fn struggle(id: impl Into<String>, position: i32) -> Self {
        Self::new(EventKind::Struggle, Owner::controller(id), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_wire_round_trip() {
        assert_eq!(Owner::from_wire("COORD"), Owner::Coordinator);
        assert_eq!(Owner::from_wire("C59"), Owner::controller("C59"));
        assert_eq!(Owner::Coordinator.to_string(), "COORD");
        assert_eq!(Owner::controller("DD3").to_string(), "DD3");
    }

    #[test]
    fn test_kind_tags() {
        for kind in [EventKind::Continuous, EventKind::Final, EventKind::Struggle] {
            assert_eq!(EventKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EventKind::from_tag("con"), None);
        assert_eq!(EventKind::Struggle.type_id(), 2);
    }

    #[test]
    fn test_constructors_clamp() {
        assert_eq!(ProtocolEvent::continuous("A", 9999).position, MAX_POS);
        assert_eq!(ProtocolEvent::struggle("A", -3).position, 0);
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp_position(-1), 0);
        assert_eq!(clamp_position(250), 250);
        assert_eq!(clamp_position(i64::MAX), MAX_POS);
    }
}
