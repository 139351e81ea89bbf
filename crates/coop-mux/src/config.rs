//! Coordinator configuration

use std::time::Duration;

use coop_protocol::ControllerId;
use coop_render::{Channel, RenderConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which controller owns which channel
///
/// A channel with no controller never receives ownership-scoped updates; it
/// only moves on a settle or a struggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    pub red: Option<ControllerId>,
    pub green: Option<ControllerId>,
    pub blue: Option<ControllerId>,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            red: Some(ControllerId::new("C59")),
            green: Some(ControllerId::new("DD3")),
            blue: Some(ControllerId::new("C5E")),
        }
    }
}

impl ChannelMap {
    /// A map with no controllers assigned
    pub fn unassigned() -> Self {
        Self {
            red: None,
            green: None,
            blue: None,
        }
    }

    /// Owner of a channel
    pub fn owner(&self, channel: Channel) -> Option<&ControllerId> {
        match channel {
            Channel::Red => self.red.as_ref(),
            Channel::Green => self.green.as_ref(),
            Channel::Blue => self.blue.as_ref(),
        }
    }

    /// Assign or clear the owner of a channel
    pub fn set_owner(&mut self, channel: Channel, owner: Option<ControllerId>) {
        let slot = match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        };
        *slot = owner;
    }
}

/// Outbound rate control settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Extra send delay (ms) indexed by the number of recent sends
    pub backoff_ms: Vec<u64>,
    /// How often the position is checked for changes (ms)
    pub send_poll_ms: u64,
    /// Length of the window after which an idle send count resets (ms)
    pub overflow_check_ms: u64,
    /// Idle time after which the position is re-broadcast (ms)
    pub standby_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            backoff_ms: vec![0, 100, 200, 300, 500, 1000, 1700, 1700, 1700, 2000, 2000],
            send_poll_ms: 200,
            overflow_check_ms: 1700,
            standby_ms: 20 * 60 * 1000,
        }
    }
}

impl FlowConfig {
    pub fn send_poll(&self) -> Duration {
        Duration::from_millis(self.send_poll_ms)
    }

    pub fn overflow_check(&self) -> Duration {
        Duration::from_millis(self.overflow_check_ms)
    }

    pub fn standby(&self) -> Duration {
        Duration::from_millis(self.standby_ms)
    }

    /// Send delay for a given recent-send count
    ///
    /// Counts past the end of the table use its last entry.
    pub fn backoff(&self, recent: usize) -> Duration {
        let index = recent.min(self.backoff_ms.len().saturating_sub(1));
        Duration::from_millis(self.backoff_ms.get(index).copied().unwrap_or_default())
    }
}

/// Complete coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Channel ownership
    pub channels: ChannelMap,
    /// Quiet time after a final position before it becomes authoritative (ms)
    pub debounce_delay_ms: u64,
    /// Delay before channel targets are re-synced after a struggle (ms)
    pub struggle_fallback_ms: u64,
    /// Outbound rate control
    pub flow: FlowConfig,
    /// Animation and fixtures
    pub render: RenderConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            channels: ChannelMap::default(),
            debounce_delay_ms: 800,
            struggle_fallback_ms: 1000,
            flow: FlowConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn struggle_fallback(&self) -> Duration {
        Duration::from_millis(self.struggle_fallback_ms)
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flow.backoff_ms.is_empty() {
            return Err(ConfigError::EmptyBackoff);
        }

        let intervals = [
            ("send_poll_ms", self.flow.send_poll_ms),
            ("overflow_check_ms", self.flow.overflow_check_ms),
            ("standby_ms", self.flow.standby_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { name });
            }
        }

        for channel in Channel::ALL {
            if self
                .channels
                .owner(channel)
                .is_some_and(|id| id.as_str().is_empty())
            {
                return Err(ConfigError::EmptyController(channel));
            }
        }

        self.render.validate()?;
        Ok(())
    }
}
