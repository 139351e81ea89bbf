//! Outbound flow control
//!
//! Every controller listens on the same radio channel, so the coordinator
//! rate-limits its own broadcasts. A poll checks for a changed position on a
//! fixed interval; when one is found a single send is scheduled after a
//! delay that grows with the number of recent sends. A periodic window check
//! resets that count once a whole window passes without a send, and a long
//! standby tick re-broadcasts the position so controllers that missed an
//! update resync.

use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::config::FlowConfig;

/// Highest value the recent-send count reaches
pub const MAX_RECENT: usize = 9;

/// Rate control state
#[derive(Debug, Clone)]
pub struct FlowController {
    config: FlowConfig,
    recent_count: usize,
    previous_count: usize,
    standby_update: bool,
    in_flight: Option<Instant>,
    next_poll: Instant,
    next_overflow_check: Instant,
    next_standby: Instant,
    last_sent_at: Option<Instant>,
    sends: u64,
}

impl FlowController {
    /// Start every periodic timer at `now`
    pub fn new(config: FlowConfig, now: Instant) -> Self {
        Self {
            next_poll: now + config.send_poll(),
            next_overflow_check: now + config.overflow_check(),
            next_standby: now + config.standby(),
            config,
            recent_count: 0,
            previous_count: 0,
            standby_update: false,
            in_flight: None,
            last_sent_at: None,
            sends: 0,
        }
    }

    /// Check for a position change
    ///
    /// `dirty` tells whether the position moved since the last scheduled
    /// send. Returns the delay of the send that was scheduled, if any. The
    /// caller marks the position as scheduled when a send is returned.
    pub fn poll(&mut self, dirty: bool, now: Instant) -> Option<Duration> {
        self.next_poll = advance(self.next_poll, self.config.send_poll(), now);

        if !(dirty || self.standby_update) || self.in_flight.is_some() {
            return None;
        }

        let delay = self.config.backoff(self.recent_count);
        self.recent_count = (self.recent_count + 1).min(MAX_RECENT);
        self.standby_update = false;
        self.in_flight = Some(now + delay);

        trace!("Send scheduled in {:?} (recent {})", delay, self.recent_count);
        Some(delay)
    }

    /// Consume the scheduled send if it is due
    pub fn take_due_send(&mut self, now: Instant) -> bool {
        match self.in_flight {
            Some(at) if at <= now => {
                self.in_flight = None;
                self.last_sent_at = Some(now);
                self.sends += 1;
                true
            }
            _ => false,
        }
    }

    /// Reset the recent count if nothing was sent during the last window
    pub fn check_overflow(&mut self, now: Instant) {
        self.next_overflow_check =
            advance(self.next_overflow_check, self.config.overflow_check(), now);

        if self.previous_count != self.recent_count {
            self.previous_count = self.recent_count;
        } else if self.recent_count != 0 {
            debug!("Send window quiet, resetting recent count");
            self.recent_count = 0;
            self.previous_count = 0;
        }
    }

    /// Arm a resync broadcast if the link has been idle
    ///
    /// Returns whether a resync was armed; the caller hands ownership of the
    /// broadcast value back to the coordinator.
    pub fn standby_tick(&mut self, now: Instant) -> bool {
        self.next_standby = advance(self.next_standby, self.config.standby(), now);

        if self.recent_count == 0 {
            debug!("Standby resync armed");
            self.standby_update = true;
            return true;
        }
        false
    }

    pub fn poll_deadline(&self) -> Instant {
        self.next_poll
    }

    pub fn overflow_deadline(&self) -> Instant {
        self.next_overflow_check
    }

    pub fn standby_deadline(&self) -> Instant {
        self.next_standby
    }

    /// When the scheduled send is due
    pub fn send_deadline(&self) -> Option<Instant> {
        self.in_flight
    }

    pub fn recent_count(&self) -> usize {
        self.recent_count
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn standby_pending(&self) -> bool {
        self.standby_update
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    /// Sends completed since creation
    pub fn sends(&self) -> u64 {
        self.sends
    }
}

/// Next deadline of a periodic timer that just fired
///
/// Skips missed ticks instead of bursting to catch up.
fn advance(deadline: Instant, period: Duration, now: Instant) -> Instant {
    let next = deadline + period;
    if next <= now {
        now + period
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_send_is_immediate() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);

        let delay = flow.poll(true, t0 + ms(200)).unwrap();
        assert_eq!(delay, Duration::ZERO);
        assert_eq!(flow.recent_count(), 1);
        assert!(flow.take_due_send(t0 + ms(200)));
        assert_eq!(flow.sends(), 1);
    }

    #[test]
    fn test_clean_position_sends_nothing() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);
        assert!(flow.poll(false, t0 + ms(200)).is_none());
        assert_eq!(flow.poll_deadline(), t0 + ms(400));
    }

    #[test]
    fn test_one_send_in_flight() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);

        flow.poll(true, t0).unwrap();
        flow.take_due_send(t0);
        // Second send waits 100ms
        assert_eq!(flow.poll(true, t0 + ms(200)), Some(ms(100)));
        assert!(flow.poll(true, t0 + ms(250)).is_none());
        assert!(!flow.take_due_send(t0 + ms(299)));
        assert!(flow.take_due_send(t0 + ms(300)));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);
        let mut now = t0;
        let mut delays = Vec::new();

        for _ in 0..12 {
            let delay = flow.poll(true, now).unwrap();
            delays.push(delay.as_millis() as u64);
            now += delay;
            assert!(flow.take_due_send(now));
        }

        assert_eq!(
            delays,
            vec![0, 100, 200, 300, 500, 1000, 1700, 1700, 1700, 2000, 2000, 2000]
        );
        assert_eq!(flow.recent_count(), MAX_RECENT);
    }

    #[test]
    fn test_quiet_window_resets_count() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);

        flow.poll(true, t0).unwrap();
        flow.take_due_send(t0);

        // First check sees the change, second sees none
        flow.check_overflow(t0 + ms(1700));
        assert_eq!(flow.recent_count(), 1);
        flow.check_overflow(t0 + ms(3400));
        assert_eq!(flow.recent_count(), 0);

        assert_eq!(flow.poll(true, t0 + ms(3600)), Some(Duration::ZERO));
    }

    #[test]
    fn test_standby_only_when_idle() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);

        assert!(flow.standby_tick(flow.standby_deadline()));
        assert!(flow.standby_pending());

        // A clean position is still sent once
        assert!(flow.poll(false, t0 + ms(1_200_200)).is_some());
        assert!(!flow.standby_pending());

        // With a recent send the tick does nothing
        assert!(!flow.standby_tick(flow.standby_deadline()));
    }

    #[test]
    fn test_periodic_timers_skip_missed_ticks() {
        let t0 = Instant::now();
        let mut flow = FlowController::new(FlowConfig::default(), t0);

        flow.poll(false, t0 + ms(5000));
        assert_eq!(flow.poll_deadline(), t0 + ms(5200));
    }
}
