//! Frame encoding and decoding
//!
//! The radio link hands over whole text payloads. A payload is a list of
//! fields separated by `|`:
//!
//! ```text
//! KIND|ControllerId|msgTypeReserved|position
//! ```
//!
//! `KIND` is one of `CON`, `FINAL` or `STR`. The position is a decimal integer
//! and is clamped into `[0, MAX_POS]`; values outside the range are not an
//! error, only non-numeric ones are.
//!
//! Transports that stream bytes instead of payloads (a plain serial line, a
//! test pipe) separate payloads with `\n`; [`FrameDecoder`] splits them.

use std::fmt;

use crate::error::{ParseError, ProtocolError};
use crate::{clamp_position, EventKind, Owner, ProtocolEvent};

/// Field delimiter
pub const DELIMITER: char = '|';

/// Maximum payload length (the radio payload limit)
pub const MAX_FRAME_LEN: usize = 64;

/// Parse a single payload into a [`ProtocolEvent`]
pub fn parse_frame(payload: &str) -> Result<ProtocolEvent, ParseError> {
    let payload = payload.trim();
    let mut fields = payload.split(DELIMITER);

    // `split` always yields at least one (possibly empty) field
    let tag = fields.next().unwrap_or_default();
    if tag.is_empty() {
        return Err(ParseError::MissingField { index: 0 });
    }
    let kind = EventKind::from_tag(tag).ok_or_else(|| ParseError::UnknownKind(tag.into()))?;

    let owner = fields.next().ok_or(ParseError::MissingField { index: 1 })?;
    if owner.is_empty() {
        return Err(ParseError::EmptyOwner);
    }

    let msg_type = fields.next().ok_or(ParseError::MissingField { index: 2 })?;
    let position = fields.next().ok_or(ParseError::MissingField { index: 3 })?;

    Ok(ProtocolEvent {
        kind,
        owner: Owner::from_wire(owner),
        msg_type: msg_type.to_string(),
        position: parse_position(position)?,
    })
}

/// Parse and clamp a decimal position field
fn parse_position(field: &str) -> Result<i32, ParseError> {
    let trimmed = field.trim();
    let raw = match trimmed.parse::<i64>() {
        Ok(raw) => raw,
        // Digit strings that overflow i64 are still positions, just huge ones
        Err(_) => match overflow_sign(trimmed) {
            Some(true) => i64::MIN,
            Some(false) => i64::MAX,
            None => return Err(ParseError::InvalidPosition(field.into())),
        },
    };
    Ok(clamp_position(raw))
}

/// Sign of an optionally signed run of digits, `Some(true)` if negative
fn overflow_sign(field: &str) -> Option<bool> {
    let (negative, digits) = match field.as_bytes().first()? {
        b'-' => (true, &field[1..]),
        b'+' => (false, &field[1..]),
        _ => (false, field),
    };
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(negative)
}

impl ProtocolEvent {
    /// Encode as the payload a controller would send
    pub fn encode(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            self.kind.tag(),
            self.owner,
            self.msg_type,
            self.position
        )
    }
}

/// Streaming decoder for newline-separated payloads
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_LEN),
        }
    }

    /// Push raw bytes into the decoder's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // An unterminated payload this long can never become valid
        if !self.buffer.contains(&b'\n') && self.buffer.len() > MAX_FRAME_LEN {
            tracing::warn!("{}", ParseError::FrameTooLong(self.buffer.len()));
            self.buffer.clear();
        }
    }

    /// Extract the next payload and its parse result
    ///
    /// Returns `None` once no complete payload is buffered. Empty lines are
    /// skipped.
    pub fn next_frame(&mut self) -> Option<(String, Result<ProtocolEvent, ParseError>)> {
        loop {
            let term_pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let line: Vec<u8> = self.buffer.drain(..=term_pos).collect();

            let text = match std::str::from_utf8(&line[..line.len() - 1]) {
                Ok(text) => text.trim().to_string(),
                Err(_) => {
                    let lossy = String::from_utf8_lossy(&line).trim().to_string();
                    return Some((lossy, Err(ParseError::InvalidUtf8)));
                }
            };

            if text.is_empty() {
                continue;
            }

            let result = parse_frame(&text);
            return Some((text, result));
        }
    }

    /// Extract the next well-formed event, skipping malformed payloads
    pub fn next_event(&mut self) -> Option<ProtocolEvent> {
        while let Some((text, result)) = self.next_frame() {
            match result {
                Ok(event) => return Some(event),
                Err(e) => tracing::warn!("Discarding frame {:?}: {}", text, e),
            }
        }
        None
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Position broadcast from the coordinator to every slider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Owner stamped on the value
    pub owner: Owner,
    /// Position to adopt
    pub position: i32,
}

impl OutboundFrame {
    /// Create a new outbound frame
    pub fn new(owner: Owner, position: i32) -> Self {
        Self {
            owner,
            position: clamp_position(position as i64),
        }
    }

    /// Parse an outbound payload, as a slider receiving it would
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        let mut fields = payload.trim().split(DELIMITER);

        let tag = fields.next().unwrap_or_default();
        if tag != EventKind::Continuous.tag() {
            return Err(ParseError::UnknownKind(tag.into()));
        }

        let owner = fields.next().ok_or(ParseError::MissingField { index: 1 })?;
        if owner.is_empty() {
            return Err(ParseError::EmptyOwner);
        }
        let position = fields.next().ok_or(ParseError::MissingField { index: 2 })?;

        Ok(Self {
            owner: Owner::from_wire(owner),
            position: parse_position(position)?,
        })
    }

    /// Encode to the wire format `CON|<owner>|<position>`
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Encode, refusing payloads that exceed the radio payload limit
    pub fn to_payload(&self) -> Result<String, ProtocolError> {
        let payload = self.encode();
        if payload.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::Oversized(payload.len()));
        }
        Ok(payload)
    }
}

impl fmt::Display for OutboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            EventKind::Continuous.tag(),
            self.owner,
            self.position
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControllerId, MAX_POS};
    use proptest::prelude::*;

    #[test]
    fn test_parse_continuous() {
        let event = parse_frame("CON|C59|0|250").unwrap();
        assert_eq!(event.kind, EventKind::Continuous);
        assert_eq!(event.owner, Owner::Controller(ControllerId::new("C59")));
        assert_eq!(event.msg_type, "0");
        assert_eq!(event.position, 250);
    }

    #[test]
    fn test_parse_clamps_position() {
        assert_eq!(parse_frame("FINAL|A|0|501").unwrap().position, MAX_POS);
        assert_eq!(parse_frame("STR|A|0|-20").unwrap().position, 0);
        assert_eq!(
            parse_frame("CON|A|0|99999999999999999999999").unwrap().position,
            MAX_POS
        );
        assert_eq!(
            parse_frame("CON|A|0|-99999999999999999999999").unwrap().position,
            0
        );
        assert_eq!(
            parse_frame("CON|A|0|+99999999999999999999999").unwrap().position,
            MAX_POS
        );
    }

    #[test]
    fn test_parse_coordinator_owner() {
        let event = parse_frame("STR|COORD|0|10").unwrap();
        assert_eq!(event.owner, Owner::Coordinator);
    }

    #[test]
    fn test_parse_trims_line_endings() {
        let event = parse_frame("FINAL|DD3|1|42\r\n").unwrap();
        assert_eq!(event.position, 42);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_frame(""), Err(ParseError::MissingField { index: 0 }));
        assert_eq!(
            parse_frame("PING|A|0|1"),
            Err(ParseError::UnknownKind("PING".into()))
        );
        assert_eq!(parse_frame("CON"), Err(ParseError::MissingField { index: 1 }));
        assert_eq!(parse_frame("CON||0|1"), Err(ParseError::EmptyOwner));
        assert_eq!(
            parse_frame("CON|A|0"),
            Err(ParseError::MissingField { index: 3 })
        );
        assert_eq!(
            parse_frame("CON|A|0|abc"),
            Err(ParseError::InvalidPosition("abc".into()))
        );
        assert_eq!(
            parse_frame("CON|A|0|"),
            Err(ParseError::InvalidPosition("".into()))
        );
        assert_eq!(
            parse_frame("CON|A|0|-"),
            Err(ParseError::InvalidPosition("-".into()))
        );
        assert_eq!(
            parse_frame("CON|A|0|-9x"),
            Err(ParseError::InvalidPosition("-9x".into()))
        );
    }

    #[test]
    fn test_encode_outbound() {
        let frame = OutboundFrame::new(Owner::controller("C59"), 320);
        assert_eq!(frame.encode(), "CON|C59|320");

        let frame = OutboundFrame::new(Owner::Coordinator, 0);
        assert_eq!(frame.encode(), "CON|COORD|0");
    }

    #[test]
    fn test_encode_inbound() {
        let event = ProtocolEvent::struggle("DD3", 44);
        assert_eq!(event.encode(), "STR|DD3||44");
        assert_eq!(parse_frame(&event.encode()).unwrap(), event);
    }

    #[test]
    fn test_parse_outbound() {
        let frame = OutboundFrame::parse("CON|COORD|77").unwrap();
        assert_eq!(frame, OutboundFrame::new(Owner::Coordinator, 77));
        assert!(OutboundFrame::parse("FINAL|A|0|1").is_err());
        assert_eq!(
            OutboundFrame::parse("CON|A"),
            Err(ParseError::MissingField { index: 2 })
        );
    }

    #[test]
    fn test_oversized_outbound() {
        let frame = OutboundFrame::new(Owner::controller("X".repeat(80)), 1);
        assert!(matches!(
            frame.to_payload(),
            Err(ProtocolError::Oversized(_))
        ));
    }

    #[test]
    fn test_streaming_decode() {
        let mut decoder = FrameDecoder::new();

        decoder.push_bytes(b"CON|C5");
        assert!(decoder.next_event().is_none());

        decoder.push_bytes(b"9|0|120\n");
        let event = decoder.next_event().unwrap();
        assert_eq!(event.position, 120);
    }

    #[test]
    fn test_decoder_skips_malformed() {
        let mut decoder = FrameDecoder::new();
        decoder.push_bytes(b"garbage\n\nCON|A|0|x\nFINAL|A|0|7\n");

        let event = decoder.next_event().unwrap();
        assert_eq!(event.kind, EventKind::Final);
        assert_eq!(event.position, 7);
        assert!(decoder.next_event().is_none());
    }

    #[test]
    fn test_decoder_reports_bad_utf8() {
        let mut decoder = FrameDecoder::new();
        decoder.push_bytes(&[0xFF, 0xFE, b'\n']);

        let (_, result) = decoder.next_frame().unwrap();
        assert_eq!(result, Err(ParseError::InvalidUtf8));
    }

    #[test]
    fn test_decoder_drops_runaway_buffer() {
        let mut decoder = FrameDecoder::new();
        decoder.push_bytes(&[b'A'; MAX_FRAME_LEN + 1]);
        decoder.push_bytes(b"\nCON|A|0|3\n");

        let event = decoder.next_event().unwrap();
        assert_eq!(event.position, 3);
    }

    proptest! {
        #[test]
        fn clamp_is_idempotent(raw in any::<i64>()) {
            let once = clamp_position(raw);
            prop_assert!((0..=MAX_POS).contains(&once));
            prop_assert_eq!(clamp_position(once as i64), once);
        }

        #[test]
        fn parsed_positions_in_range(raw in any::<i64>(), id in "[A-Z0-9]{1,4}") {
            let payload = format!("FINAL|{}|0|{}", id, raw);
            let event = parse_frame(&payload).unwrap();
            prop_assert!((0..=MAX_POS).contains(&event.position));
            prop_assert_eq!(event.position, clamp_position(raw));
        }

        #[test]
        fn parser_never_panics(payload in ".{0,80}") {
            let _ = parse_frame(&payload);
        }
    }
}
