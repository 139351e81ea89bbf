//! Coordinator engine
//!
//! The engine is the single owner of all coordination state: channel
//! ownership and targets, the settle timer, outbound rate control and the
//! animator. It performs no I/O and reads no clock; every entry point takes
//! the current time and results are buffered as [`CoordinatorOutput`]s for
//! the caller to deliver.

use std::time::Duration;

use coop_protocol::{
    parse_frame, ControllerId, EventKind, OutboundFrame, Owner, ParseError, ProtocolEvent,
};
use coop_render::{Animator, Channel, ColorCommand, FixtureId, RenderError, Rgb};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::ConfigError;
use crate::flow::FlowController;
use crate::history::ControllerEvent;
use crate::resolver::{PendingSettle, SettleKind, SettleScheduler, SettleState};
use crate::store::{ChannelState, PositionStore, SliderPosition};

/// Work produced by the engine for the caller to carry out
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorOutput {
    /// Send a position to every controller
    Broadcast(OutboundFrame),
    /// Fade a fixture to a color
    SetColor {
        fixture: FixtureId,
        color: Rgb,
        fade: Duration,
    },
    /// A decoded frame for the event sink
    Event(ControllerEvent),
}

impl From<ColorCommand> for CoordinatorOutput {
    fn from(cmd: ColorCommand) -> Self {
        CoordinatorOutput::SetColor {
            fixture: cmd.fixture,
            color: cmd.color,
            fade: cmd.fade,
        }
    }
}

/// Timers in the order they fire when due at the same instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Timer {
    Settle,
    Send,
    Poll,
    Frame,
    Overflow,
    Standby,
}

/// Traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Frames decoded
    pub frames_received: u64,
    /// Payloads that failed to decode
    pub frames_discarded: u64,
    /// Frames from controllers that own no channel
    pub frames_ignored: u64,
    /// Positions broadcast
    pub broadcasts: u64,
    /// Color commands issued
    pub color_commands: u64,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorSnapshot {
    pub slider: SliderPosition,
    pub outbound_owner: Owner,
    pub channels: Vec<ChannelState>,
    pub settle: SettleState,
    pub recent_count: usize,
    pub send_in_flight: bool,
    pub animating: bool,
    /// Present fixtures in installation order
    pub fixtures: Vec<String>,
    pub stats: CoordinatorStats,
}

/// The coordination state machine
pub struct Coordinator {
    config: CoordinatorConfig,
    store: PositionStore,
    resolver: SettleScheduler,
    flow: FlowController,
    animator: Animator,
    next_frame: Option<Instant>,
    stats: CoordinatorStats,
    outputs: Vec<CoordinatorOutput>,
}

impl Coordinator {
    /// Create an engine with every channel at rest
    pub fn new(config: CoordinatorConfig, now: Instant) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            store: PositionStore::new(&config.channels),
            resolver: SettleScheduler::new(config.debounce_delay(), config.struggle_fallback()),
            flow: FlowController::new(config.flow.clone(), now),
            animator: Animator::new(&config.render),
            next_frame: None,
            stats: CoordinatorStats::default(),
            outputs: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Decode and handle one radio payload
    ///
    /// A payload that fails to decode is logged and dropped without touching
    /// any state; the error is returned for the caller's information only.
    pub fn handle_payload(&mut self, payload: &str, now: Instant) -> Result<(), ParseError> {
        match parse_frame(payload) {
            Ok(event) => {
                self.handle_event(event, now);
                Ok(())
            }
            Err(e) => {
                warn!("Discarding frame {:?}: {}", payload.trim(), e);
                self.stats.frames_discarded += 1;
                Err(e)
            }
        }
    }

    /// Handle one decoded frame
    pub fn handle_event(&mut self, event: ProtocolEvent, now: Instant) {
        self.stats.frames_received += 1;
        self.outputs
            .push(CoordinatorOutput::Event(ControllerEvent::now(&event)));

        let position = event.position;
        match event.kind {
            EventKind::Continuous => {
                let applied = event
                    .owner
                    .controller_id()
                    .is_some_and(|id| self.store.apply_continuous(id, position));

                if applied {
                    self.wake(now);
                } else {
                    self.ignore(&event);
                }
            }

            EventKind::Final => {
                let sender = event
                    .owner
                    .controller_id()
                    .filter(|id| self.store.owns_any(id))
                    .cloned();

                match sender {
                    Some(id) => {
                        debug!("Final {} from {}, settling after debounce", position, id);
                        self.store.set_pending(id, position);
                        self.resolver.arm_final(position, now);
                    }
                    None => self.ignore(&event),
                }
            }

            EventKind::Struggle => {
                info!("Struggle from {} resolved at {}", event.owner, position);
                self.store.apply_struggle(position);
                self.resolver.arm_fallback(position, now);
                self.wake(now);
            }
        }
    }

    fn ignore(&mut self, event: &ProtocolEvent) {
        debug!(
            "Ignoring {} from {}: owns no channel",
            event.kind.tag(),
            event.owner
        );
        self.stats.frames_ignored += 1;
    }

    /// A fixture announced itself
    ///
    /// Unknown fixtures are rejected. A known one is put at rest, and every
    /// present fixture is repainted since their ranks may have shifted.
    pub fn fixture_discovered(&mut self, id: &str) -> Result<(), RenderError> {
        let rest = self.animator.add_fixture(id)?;
        self.push_color(rest);
        self.repaint();
        Ok(())
    }

    /// A fixture went offline
    pub fn fixture_lost(&mut self, id: &str) -> bool {
        if self.animator.remove_fixture(id).is_none() {
            debug!("Offline notice for absent fixture {}", id);
            return false;
        }
        self.repaint();
        true
    }

    /// Hand a channel to another controller, or to none
    pub fn assign_channel(&mut self, channel: Channel, owner: Option<ControllerId>) {
        info!(
            "Channel {} now owned by {}",
            channel,
            owner.as_ref().map_or("nobody", |id| id.as_str())
        );
        self.config.channels.set_owner(channel, owner.clone());
        self.store.assign(channel, owner);
    }

    /// Earliest instant at which [`Coordinator::on_timer`] has work to do
    pub fn next_deadline(&self) -> Instant {
        self.deadlines()
            .map(|(at, _)| at)
            .min()
            .unwrap_or_else(|| self.flow.poll_deadline())
    }

    /// Fire every timer due at `now`, earliest first
    ///
    /// Meant to be called at each [`Coordinator::next_deadline`]. A late call
    /// still fires every overdue timer, but periodic timers fire once and
    /// skip the ticks they missed, so a poll that fell in the gap is lost.
    pub fn on_timer(&mut self, now: Instant) {
        while let Some(timer) = self.due_timer(now) {
            self.fire(timer, now);
        }
    }

    /// Take the buffered outputs
    pub fn drain_outputs(&mut self) -> Vec<CoordinatorOutput> {
        std::mem::take(&mut self.outputs)
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            slider: self.store.slider(),
            outbound_owner: self.store.outbound_owner().clone(),
            channels: Channel::ALL
                .iter()
                .map(|c| self.store.channel_state(*c))
                .collect(),
            settle: self.resolver.state(),
            recent_count: self.flow.recent_count(),
            send_in_flight: self.flow.is_in_flight(),
            animating: self.animator.is_running(),
            fixtures: self
                .animator
                .fixtures()
                .slots()
                .iter()
                .map(|s| s.id.to_string())
                .collect(),
            stats: self.stats,
        }
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    pub fn resolver(&self) -> &SettleScheduler {
        &self.resolver
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    fn deadlines(&self) -> impl Iterator<Item = (Instant, Timer)> {
        [
            (self.resolver.deadline(), Timer::Settle),
            (self.flow.send_deadline(), Timer::Send),
            (Some(self.flow.poll_deadline()), Timer::Poll),
            (self.next_frame, Timer::Frame),
            (Some(self.flow.overflow_deadline()), Timer::Overflow),
            (Some(self.flow.standby_deadline()), Timer::Standby),
        ]
        .into_iter()
        .filter_map(|(at, timer)| at.map(|at| (at, timer)))
    }

    fn due_timer(&self, now: Instant) -> Option<Timer> {
        self.deadlines()
            .filter(|(at, _)| *at <= now)
            .min()
            .map(|(_, timer)| timer)
    }

    fn fire(&mut self, timer: Timer, now: Instant) {
        match timer {
            Timer::Settle => {
                if let Some(fired) = self.resolver.poll(now) {
                    self.settle(fired, now);
                }
            }
            Timer::Send => {
                if self.flow.take_due_send(now) {
                    self.broadcast();
                }
            }
            Timer::Poll => {
                if self.flow.poll(self.store.slider().is_dirty(), now).is_some() {
                    self.store.mark_scheduled();
                }
            }
            Timer::Frame => self.frame(now),
            Timer::Overflow => self.flow.check_overflow(now),
            Timer::Standby => {
                if self.flow.standby_tick(now) {
                    self.store.set_outbound_owner(Owner::Coordinator);
                }
            }
        }
    }

    fn settle(&mut self, fired: PendingSettle, now: Instant) {
        match fired.kind {
            SettleKind::Final => {
                info!("Position settled at {}", fired.value);
                self.store.settle(fired.value);
            }
            SettleKind::StruggleFallback => {
                let current = self.store.slider().current;
                debug!("Struggle fallback, re-syncing channels to {}", current);
                self.store.set_all_targets(current);
            }
        }
        self.wake(now);
    }

    fn broadcast(&mut self) {
        let frame = OutboundFrame::new(
            self.store.outbound_owner().clone(),
            self.store.slider().current,
        );
        debug!("Broadcasting {}", frame);
        self.stats.broadcasts += 1;
        self.outputs.push(CoordinatorOutput::Broadcast(frame));
    }

    fn wake(&mut self, now: Instant) {
        if self.animator.wake(self.store.motion()) && self.next_frame.is_none() {
            self.next_frame = Some(now + self.animator.frame_interval());
        }
    }

    fn frame(&mut self, now: Instant) {
        let commands = self.animator.tick(self.store.motion_mut());
        for cmd in commands {
            self.push_color(cmd);
        }

        self.next_frame = if self.animator.is_running() {
            let interval = self.animator.frame_interval();
            let next = self.next_frame.unwrap_or(now) + interval;
            Some(if next <= now { now + interval } else { next })
        } else {
            None
        };
    }

    fn repaint(&mut self) {
        let commands = self.animator.render(self.store.motion());
        for cmd in commands {
            self.push_color(cmd);
        }
    }

    fn push_color(&mut self, cmd: ColorCommand) {
        self.stats.color_commands += 1;
        self.outputs.push(cmd.into());
    }
}
