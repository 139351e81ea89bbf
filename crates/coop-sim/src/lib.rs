//! Cooperative Slider Simulation Library
//!
//! This crate stands in for the hardware at both ends of the coordinator:
//!
//! - **VirtualSlider**: a slider controller that produces protocol-accurate
//!   payloads and adopts the positions the coordinator broadcasts
//! - **RecordingDriver**: a bulb driver that records every color command and
//!   can simulate unreachable fixtures
//!
//! # Example
//!
//! ```rust
//! use coop_sim::VirtualSlider;
//!
//! let mut slider = VirtualSlider::new("C59");
//! slider.drag_to(120);
//! slider.release();
//!
//! assert_eq!(slider.take_output().as_deref(), Some("CON|C59|0|120"));
//! assert_eq!(slider.take_output().as_deref(), Some("FINAL|C59|0|120"));
//!
//! // The coordinator's broadcast moves the slider
//! slider.receive("CON|COORD|300").unwrap();
//! assert_eq!(slider.position(), 300);
//! ```

pub mod driver;
pub mod slider;

pub use driver::{RecordedColor, RecordingDriver};
pub use slider::VirtualSlider;
