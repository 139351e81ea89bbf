//! Slider Animation Engine
//!
//! This crate turns per-channel slider targets into colors for a chain of
//! light fixtures installed in a known physical order.
//!
//! # Architecture
//!
//! - [`ChannelMotion`] holds the target, smoothed position and velocity of one
//!   color channel and advances it with a damped [`Spring`]
//! - [`FixtureRegistry`] tracks which fixtures are present and sorts them by
//!   their configured installation order
//! - [`Animator`] runs the spring on a fixed frame interval while any channel
//!   is still moving, maps the smoothed positions onto the fixtures, and emits
//!   [`ColorCommand`]s only for fixtures whose color changed
//! - [`BulbDriver`] is the output seam the commands are delivered through
//!
//! # Example
//!
//! ```rust
//! use coop_render::{Animator, Channel, ChannelMotion, RenderConfig};
//!
//! let config = RenderConfig {
//!     fixture_order: vec!["a".into(), "b".into(), "c".into()],
//!     saturation_ceiling: None,
//!     ..Default::default()
//! };
//! let mut animator = Animator::new(&config);
//! for id in ["a", "b", "c"] {
//!     animator.fixtures_mut().register(id).unwrap();
//! }
//!
//! let mut channels = [ChannelMotion::default(); 3];
//! channels[Channel::Red.index()].target = 250;
//! assert!(animator.wake(&channels));
//!
//! let commands = animator.tick(&mut channels);
//! assert!(!commands.is_empty());
//! ```

pub mod animator;
pub mod color;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod spring;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use animator::{Animator, ColorCommand};
pub use color::{channel_intensity, limit_saturation, Brightness, Rgb};
pub use config::RenderConfig;
pub use error::{DriverError, RenderError};
pub use fixtures::{FixtureId, FixtureRegistry, FixtureSlot};
pub use spring::{ChannelMotion, Spring};

/// Number of color channels
pub const CHANNEL_COUNT: usize = 3;

/// Motion state of every channel, indexed by [`Channel::index`]
pub type Channels = [ChannelMotion; CHANNEL_COUNT];

/// Logical color axis driven by one slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in RGB order
    pub const ALL: [Channel; CHANNEL_COUNT] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Position of this channel in an RGB triple
    pub fn index(&self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sink for fixture color commands
///
/// Implemented by whatever talks to the bulbs. Delivery is fire-and-forget:
/// the animator never retries and does not roll back its bookkeeping when a
/// command fails.
pub trait BulbDriver: Send {
    /// Fade `fixture` to `color` over `fade`
    fn set_color(&mut self, fixture: &FixtureId, color: Rgb, fade: Duration)
        -> Result<(), DriverError>;
}
