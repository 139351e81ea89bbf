//! Frame-driven animation of the fixture chain
//!
//! The animator is idle until a channel target moves. [`Animator::wake`]
//! starts it; the owner then calls [`Animator::tick`] once per
//! [`Animator::frame_interval`] until [`Animator::is_running`] turns false,
//! which happens on the first frame where every channel has settled.

use std::time::Duration;

use tracing::{debug, trace};

use crate::color::{channel_intensity, limit_saturation, Rgb};
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::fixtures::{FixtureId, FixtureRegistry, FixtureSlot};
use crate::spring::ChannelMotion;
use crate::{Channels, CHANNEL_COUNT};

/// A color change for one fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCommand {
    /// Target fixture
    pub fixture: FixtureId,
    /// Color to fade to
    pub color: Rgb,
    /// Fade duration
    pub fade: Duration,
}

/// Drives the spring and maps smoothed positions onto fixtures
pub struct Animator {
    config: RenderConfig,
    fixtures: FixtureRegistry,
    running: bool,
    frames: u64,
}

impl Animator {
    /// Create an animator with no fixtures present
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            config: config.clone(),
            fixtures: FixtureRegistry::new(config.fixture_order.iter().cloned()),
            running: false,
            frames: 0,
        }
    }

    /// Render configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Present fixtures
    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    /// Mutable access to the fixture registry
    pub fn fixtures_mut(&mut self) -> &mut FixtureRegistry {
        &mut self.fixtures
    }

    /// Register a discovered fixture and put it at rest
    pub fn add_fixture(&mut self, id: &str) -> Result<ColorCommand, RenderError> {
        let position = self.fixtures.register(id)?;
        let rest = Rgb::grey(self.config.min_brightness);

        if let Some(slot) = self
            .fixtures
            .slots_mut()
            .iter_mut()
            .find(|s| s.position == position)
        {
            slot.last_sent = Some(rest);
        }

        Ok(ColorCommand {
            fixture: FixtureId::new(id),
            color: rest,
            fade: self.config.rest_fade(),
        })
    }

    /// Forget a fixture that went offline
    pub fn remove_fixture(&mut self, id: &str) -> Option<FixtureSlot> {
        self.fixtures.deregister(id)
    }

    /// Whether frames are being produced
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames produced since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Time between frames
    pub fn frame_interval(&self) -> Duration {
        self.config.frame_interval()
    }

    /// Start animating if any channel is away from its target
    ///
    /// Returns whether the animator is running afterwards.
    pub fn wake(&mut self, channels: &Channels) -> bool {
        if !self.running && !self.all_settled(channels) {
            debug!("Animation started");
            self.running = true;
        }
        self.running
    }

    /// Produce one frame
    ///
    /// Advances every channel, snaps settled channels onto their targets and
    /// returns the color commands for fixtures whose color changed. Stops the
    /// animator once every channel has settled.
    pub fn tick(&mut self, channels: &mut Channels) -> Vec<ColorCommand> {
        if !self.running {
            return Vec::new();
        }

        for channel in channels.iter_mut() {
            channel.step(&self.config.spring);
        }
        self.frames += 1;

        let epsilon = self.config.epsilon;
        let settled = channels
            .iter_mut()
            .fold(true, |all, c| c.settle(epsilon) && all);

        let commands = self.render(channels);

        if settled {
            debug!("Animation settled after {} frames", self.frames);
            self.running = false;
        }

        commands
    }

    /// Compute the color of every present fixture
    ///
    /// Only fixtures whose color differs from the last one sent get a command.
    pub fn render(&mut self, channels: &Channels) -> Vec<ColorCommand> {
        let count = self.fixtures.len();
        let fade = self.config.frame_interval();
        let mut commands = Vec::new();

        for rank in 0..count {
            let color = self.fixture_color(channels, rank, count);
            let slot = &mut self.fixtures.slots_mut()[rank];

            if slot.last_sent == Some(color) {
                continue;
            }

            trace!("Fixture {} -> {:?}", slot.id, color);
            slot.last_sent = Some(color);
            commands.push(ColorCommand {
                fixture: slot.id.clone(),
                color,
                fade,
            });
        }

        commands
    }

    /// Color of the fixture ranked `rank` among `count` present fixtures
    pub fn fixture_color(&self, channels: &Channels, rank: usize, count: usize) -> Rgb {
        let bounds = self.config.brightness();
        let mut values = [0u8; CHANNEL_COUNT];

        for (value, motion) in values.iter_mut().zip(channels.iter()) {
            *value = channel_intensity(motion.smoothed, rank, count, bounds);
        }

        let color = Rgb::from_array(values);
        match self.config.saturation_ceiling {
            Some(ceiling) => limit_saturation(color, ceiling),
            None => color,
        }
    }

    /// Whether every channel has settled
    pub fn all_settled(&self, channels: &[ChannelMotion]) -> bool {
        channels.iter().all(|c| c.is_settled(self.config.epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Channel;

    fn animator(ids: &[&str]) -> Animator {
        let config = RenderConfig {
            fixture_order: ids.iter().map(|s| s.to_string()).collect(),
            saturation_ceiling: None,
            ..Default::default()
        };
        let mut animator = Animator::new(&config);
        for id in ids {
            animator.add_fixture(id).unwrap();
        }
        animator
    }

    #[test]
    fn test_idle_until_woken() {
        let mut anim = animator(&["a", "b", "c"]);
        let mut channels = [ChannelMotion::default(); CHANNEL_COUNT];

        assert!(!anim.wake(&channels));
        assert!(anim.tick(&mut channels).is_empty());
        assert_eq!(anim.frames(), 0);
    }

    #[test]
    fn test_first_frame_moves_toward_target() {
        let mut anim = animator(&["a", "b", "c"]);
        let mut channels = [ChannelMotion::default(); CHANNEL_COUNT];
        channels[Channel::Red.index()].target = 250;

        assert!(anim.wake(&channels));
        anim.tick(&mut channels);

        let red = channels[Channel::Red.index()];
        assert!(red.smoothed > 0.0 && red.smoothed < 250.0);
    }

    #[test]
    fn test_stops_within_bounded_frames() {
        let mut anim = animator(&["a", "b", "c"]);
        let mut channels = [ChannelMotion::default(); CHANNEL_COUNT];
        channels[0].target = 500;
        channels[1].target = 137;
        channels[2].target = 499;

        anim.wake(&channels);
        let mut frames = 0;
        while anim.is_running() {
            anim.tick(&mut channels);
            frames += 1;
            assert!(frames <= 40, "animation did not terminate");
        }

        assert!(anim.all_settled(&channels));
        assert_eq!(channels[1].smoothed, 137.0);
    }

    #[test]
    fn test_never_resends_same_color() {
        let mut anim = animator(&["a", "b", "c"]);
        let mut channels = [ChannelMotion::default(); CHANNEL_COUNT];
        channels[Channel::Green.index()].target = 400;
        anim.wake(&channels);

        let mut last: std::collections::HashMap<FixtureId, Rgb> = anim
            .fixtures()
            .slots()
            .iter()
            .map(|s| (s.id.clone(), s.last_sent.unwrap()))
            .collect();

        while anim.is_running() {
            for cmd in anim.tick(&mut channels) {
                assert_ne!(last.get(&cmd.fixture), Some(&cmd.color));
                last.insert(cmd.fixture.clone(), cmd.color);
            }
        }

        // Nothing changes once settled
        assert!(anim.render(&channels).is_empty());
    }

    #[test]
    fn test_fixture_color_maps_channels_to_components() {
        let anim = animator(&["a", "b", "c"]);
        let mut channels = [ChannelMotion::default(); CHANNEL_COUNT];
        channels[0] = ChannelMotion::at_rest(0);
        channels[1] = ChannelMotion::at_rest(250);
        channels[2] = ChannelMotion::at_rest(500);

        assert_eq!(anim.fixture_color(&channels, 0, 3), Rgb::new(255, 0, 0));
        assert_eq!(anim.fixture_color(&channels, 1, 3), Rgb::new(0, 255, 0));
        assert_eq!(anim.fixture_color(&channels, 2, 3), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_saturation_ceiling_applied() {
        let config = RenderConfig {
            fixture_order: vec!["a".into(), "b".into()],
            saturation_ceiling: Some(0.0),
            ..Default::default()
        };
        let anim = Animator::new(&config);
        let channels = [
            ChannelMotion::at_rest(0),
            ChannelMotion::at_rest(500),
            ChannelMotion::at_rest(0),
        ];

        // Magenta before limiting
        let color = anim.fixture_color(&channels, 0, 2);
        assert!(color.is_achromatic());
    }

    #[test]
    fn test_add_fixture_returns_rest_command() {
        let config = RenderConfig {
            fixture_order: vec!["a".into()],
            min_brightness: 5,
            ..Default::default()
        };
        let mut anim = Animator::new(&config);

        let cmd = anim.add_fixture("a").unwrap();
        assert_eq!(cmd.color, Rgb::grey(5));
        assert_eq!(cmd.fade, Duration::from_millis(200));
        assert!(anim.add_fixture("zz").is_err());
    }
}
