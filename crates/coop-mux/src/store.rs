//! Ownership and position store
//!
//! Holds the single authoritative slider position that is broadcast to the
//! controllers, and the per-channel targets the animator chases. Channel
//! targets only move for events from the channel's own controller, a settle,
//! or a struggle.

use coop_protocol::{ControllerId, Owner};
use coop_render::{Channel, ChannelMotion, Channels, CHANNEL_COUNT};
use serde::Serialize;
use tracing::debug;

use crate::config::ChannelMap;

/// The authoritative position broadcast to every controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SliderPosition {
    /// Last settled value
    pub current: i32,
    /// Value at the time the last send was scheduled
    pub previous: i32,
    /// Value waiting for the debounce to elapse
    pub next: i32,
}

impl SliderPosition {
    /// Whether `current` moved since the last scheduled send
    pub fn is_dirty(&self) -> bool {
        self.current != self.previous
    }
}

/// Read-only view of one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelState {
    pub channel: Channel,
    pub owner: Option<ControllerId>,
    pub target: i32,
    pub smoothed: f32,
    pub velocity: f32,
}

/// Channel ownership, targets and the global slider position
#[derive(Debug, Clone)]
pub struct PositionStore {
    owners: [Option<ControllerId>; CHANNEL_COUNT],
    motion: Channels,
    slider: SliderPosition,
    outbound_owner: Owner,
}

impl PositionStore {
    /// Create a store with every channel at rest at position 0
    pub fn new(map: &ChannelMap) -> Self {
        Self {
            owners: Channel::ALL.map(|c| map.owner(c).cloned()),
            motion: [ChannelMotion::default(); CHANNEL_COUNT],
            slider: SliderPosition::default(),
            outbound_owner: Owner::Coordinator,
        }
    }

    /// Owner of a channel
    pub fn owner_of(&self, channel: Channel) -> Option<&ControllerId> {
        self.owners[channel.index()].as_ref()
    }

    /// Reassign a channel
    pub fn assign(&mut self, channel: Channel, owner: Option<ControllerId>) {
        debug!("Channel {} assigned to {:?}", channel, owner);
        self.owners[channel.index()] = owner;
    }

    /// Channels owned by a controller
    pub fn channels_of<'a>(&'a self, id: &'a ControllerId) -> impl Iterator<Item = Channel> + 'a {
        Channel::ALL
            .into_iter()
            .filter(move |c| self.owners[c.index()].as_ref() == Some(id))
    }

    /// Whether a controller owns at least one channel
    pub fn owns_any(&self, id: &ControllerId) -> bool {
        self.channels_of(id).next().is_some()
    }

    /// Move the targets of every channel owned by `id`
    ///
    /// Returns whether any channel matched; events from other ids are ignored.
    pub fn apply_continuous(&mut self, id: &ControllerId, value: i32) -> bool {
        let mut matched = false;
        for index in 0..CHANNEL_COUNT {
            if self.owners[index].as_ref() == Some(id) {
                self.motion[index].target = value;
                matched = true;
            }
        }
        matched
    }

    /// Hold a final position until it settles
    pub fn set_pending(&mut self, owner: ControllerId, value: i32) {
        self.slider.next = value;
        self.outbound_owner = Owner::Controller(owner);
    }

    /// Make `value` authoritative and move every channel to it
    pub fn settle(&mut self, value: i32) {
        self.slider.current = value;
        self.set_all_targets(value);
    }

    /// Take over a contested value on behalf of the coordinator
    pub fn apply_struggle(&mut self, value: i32) {
        self.settle(value);
        self.outbound_owner = Owner::Coordinator;
    }

    /// Point every channel at `value`
    pub fn set_all_targets(&mut self, value: i32) {
        for channel in self.motion.iter_mut() {
            channel.target = value;
        }
    }

    /// Record that a send was scheduled for the current value
    pub fn mark_scheduled(&mut self) {
        self.slider.previous = self.slider.current;
    }

    pub fn slider(&self) -> SliderPosition {
        self.slider
    }

    /// Owner stamped on outbound frames
    pub fn outbound_owner(&self) -> &Owner {
        &self.outbound_owner
    }

    pub fn set_outbound_owner(&mut self, owner: Owner) {
        self.outbound_owner = owner;
    }

    pub fn motion(&self) -> &Channels {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut Channels {
        &mut self.motion
    }

    /// Snapshot of one channel
    pub fn channel_state(&self, channel: Channel) -> ChannelState {
        let motion = self.motion[channel.index()];
        ChannelState {
            channel,
            owner: self.owner_of(channel).cloned(),
            target: motion.target,
            smoothed: motion.smoothed,
            velocity: motion.velocity,
        }
    }
}
