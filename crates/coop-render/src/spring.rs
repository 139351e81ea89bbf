//! Damped spring smoothing
//!
//! Each tick pulls the smoothed position toward the target:
//!
//! ```text
//! velocity = velocity * drag + (target - smoothed) * strength
//! smoothed += velocity
//! ```
//!
//! With the default `drag = 0.1` and `strength = 0.5` the error shrinks by
//! roughly a factor of three per tick, so a full-range jump settles in a
//! dozen frames without overshooting visibly.
//!
//! Convergence is judged against `epsilon`, floored at [`RESOLUTION`]. Close
//! to the target the f32 step rounds away, so a smaller threshold could never
//! be met. A channel whose step no longer moves it is snapped as well.

use serde::{Deserialize, Serialize};

/// Smallest settle threshold honoured
///
/// Well above the f32 spacing anywhere in the slider range (about 6e-5 near
/// the top) and far below one slider step.
pub const RESOLUTION: f32 = 1e-2;

/// Spring coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    /// Fraction of velocity kept between ticks
    pub drag: f32,
    /// Fraction of the remaining distance added to velocity each tick
    pub strength: f32,
}

impl Default for Spring {
    fn default() -> Self {
        Self {
            drag: 0.1,
            strength: 0.5,
        }
    }
}

/// Animated state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelMotion {
    /// Position the channel is moving toward
    pub target: i32,
    /// Displayed position
    pub smoothed: f32,
    /// Current velocity in positions per tick
    pub velocity: f32,
}

impl ChannelMotion {
    /// Create a channel resting at `position`
    pub fn at_rest(position: i32) -> Self {
        Self {
            target: position,
            smoothed: position as f32,
            velocity: 0.0,
        }
    }

    /// Distance left to travel
    pub fn delta(&self) -> f32 {
        self.target as f32 - self.smoothed
    }

    /// Advance one tick
    pub fn step(&mut self, spring: &Spring) {
        self.velocity = self.velocity * spring.drag + self.delta() * spring.strength;
        self.smoothed += self.velocity;
    }

    /// Whether the channel is within `epsilon` of its target and at rest
    pub fn is_settled(&self, epsilon: f32) -> bool {
        let epsilon = epsilon.max(RESOLUTION);
        self.delta().abs() < epsilon && self.velocity.abs() < epsilon
    }

    /// Whether the last step left the position unchanged short of the target
    pub fn is_stalled(&self) -> bool {
        self.delta().abs() < 1.0 && self.smoothed + self.velocity == self.smoothed
    }

    /// Snap onto the target if settled or stalled; returns whether it is
    /// settled
    pub fn settle(&mut self, epsilon: f32) -> bool {
        if self.is_settled(epsilon) || self.is_stalled() {
            self.smoothed = self.target as f32;
            self.velocity = 0.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_halves_distance() {
        let mut motion = ChannelMotion::default();
        motion.target = 250;
        motion.step(&Spring::default());

        assert_eq!(motion.smoothed, 125.0);
        assert_eq!(motion.velocity, 125.0);
    }

    #[test]
    fn test_converges_within_bounded_ticks() {
        let spring = Spring::default();
        let mut motion = ChannelMotion::default();
        motion.target = 500;

        let mut ticks = 0;
        while !motion.settle(0.01) {
            motion.step(&spring);
            ticks += 1;
            assert!(ticks < 40, "spring did not converge: {:?}", motion);
        }

        assert_eq!(motion.smoothed, 500.0);
        assert_eq!(motion.velocity, 0.0);
    }

    #[test]
    fn test_moving_channel_is_not_settled() {
        let mut motion = ChannelMotion::default();
        motion.target = 333;
        motion.step(&Spring::default());
        assert!(!motion.is_settled(0.0));
        assert!(!motion.is_settled(0.01));
        assert!(!motion.is_stalled());
    }

    #[test]
    fn test_stalled_channel_snaps() {
        let mut motion = ChannelMotion {
            target: 1,
            smoothed: 0.99999994,
            velocity: 1.7881394e-8,
        };
        assert!(motion.is_stalled());
        assert!(motion.settle(1e-9));
        assert_eq!(motion.smoothed, 1.0);
        assert_eq!(motion.velocity, 0.0);
    }

    #[test]
    fn test_tiny_epsilon_still_converges() {
        let springs = [
            Spring::default(),
            Spring { drag: 0.9, strength: 1.0 },
            Spring { drag: 0.0, strength: 0.3 },
        ];

        for spring in springs {
            for target in 0..=500 {
                let mut motion = ChannelMotion::default();
                motion.target = target;

                let mut ticks = 0;
                while !motion.settle(1e-9) {
                    motion.step(&spring);
                    ticks += 1;
                    assert!(ticks < 2000, "stalled with {:?}: {:?}", spring, motion);
                }
                assert_eq!(motion.smoothed, target as f32);
            }
        }
    }

    #[test]
    fn test_at_rest_is_settled() {
        let mut motion = ChannelMotion::at_rest(120);
        assert!(motion.settle(0.01));
        assert_eq!(motion.smoothed, 120.0);
    }
}
