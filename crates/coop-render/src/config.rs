//! Render configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Brightness;
use crate::error::RenderError;
use crate::spring::Spring;

/// Animation and fixture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Hardware ids of the fixtures in physical installation order
    pub fixture_order: Vec<String>,
    /// Lowest brightness a channel is driven to (0-255)
    pub min_brightness: u8,
    /// Highest brightness a channel is driven to (0-255)
    pub max_brightness: u8,
    /// Maximum HSL saturation sent to the fixtures (0-1), `None` to disable
    pub saturation_ceiling: Option<f32>,
    /// Animation frames per second
    pub frame_rate: u32,
    /// Spring coefficients
    pub spring: Spring,
    /// Distance and speed below which a channel counts as settled
    pub epsilon: f32,
    /// Fade used when a newly discovered fixture is put at rest (ms)
    pub rest_fade_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fixture_order: [
                "d073d52bb7d9",
                "d073d52c02ee",
                "d073d52bcca5",
                "d073d52bdb86",
                "d073d52bea9c",
                "d073d52bd838",
                "d073d52c14e1",
                "d073d52bea32",
                "d073d52bd3bb",
                "d073d52be27f",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            min_brightness: 0,
            max_brightness: 255,
            saturation_ceiling: Some(0.1),
            frame_rate: 8,
            spring: Spring::default(),
            epsilon: 0.01,
            rest_fade_ms: 200,
        }
    }
}

impl RenderConfig {
    /// Brightness bounds
    pub fn brightness(&self) -> Brightness {
        Brightness {
            min: self.min_brightness,
            max: self.max_brightness,
        }
    }

    /// Time between animation frames
    ///
    /// Also used as the fade duration of every frame's color command.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.frame_rate.max(1) as u64)
    }

    /// Fade used for the resting color of a new fixture
    pub fn rest_fade(&self) -> Duration {
        Duration::from_millis(self.rest_fade_ms)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.frame_rate == 0 || self.frame_rate > 1000 {
            return Err(RenderError::InvalidConfig(format!(
                "frame_rate must be 1-1000, got {}",
                self.frame_rate
            )));
        }
        if self.min_brightness > self.max_brightness {
            return Err(RenderError::InvalidConfig(format!(
                "min_brightness {} exceeds max_brightness {}",
                self.min_brightness, self.max_brightness
            )));
        }
        if let Some(ceiling) = self.saturation_ceiling {
            if !(0.0..=1.0).contains(&ceiling) {
                return Err(RenderError::InvalidConfig(format!(
                    "saturation_ceiling must be within 0-1, got {}",
                    ceiling
                )));
            }
        }
        if !(self.epsilon > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        let Spring { drag, strength } = self.spring;
        if !(0.0..1.0).contains(&drag) || !(strength > 0.0 && strength <= 1.0) {
            return Err(RenderError::InvalidConfig(format!(
                "spring out of range: drag {}, strength {}",
                drag, strength
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RenderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.frame_interval(), Duration::from_millis(125));
        assert_eq!(config.fixture_order.len(), 10);
    }

    #[test]
    fn test_rejects_inverted_brightness() {
        let config = RenderConfig {
            min_brightness: 200,
            max_brightness: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_epsilon() {
        let config = RenderConfig {
            epsilon: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_saturation_out_of_range() {
        let config = RenderConfig {
            saturation_ceiling: Some(1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{"fixture_order":["a","b"],"max_brightness":100}"#).unwrap();
        assert_eq!(config.fixture_order, vec!["a", "b"]);
        assert_eq!(config.max_brightness, 100);
        assert_eq!(config.frame_rate, 8);
    }
}
