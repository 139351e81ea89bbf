//! Settle scheduling
//!
//! A final position only becomes authoritative after the debounce delay has
//! passed without another final superseding it. A struggle is applied at
//! once, then followed by a fallback that re-points every channel at the
//! authoritative value. Both share a single timer slot: arming one cancels
//! whatever was pending.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

/// What a pending timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettleKind {
    /// Adopt the pending final value
    Final,
    /// Re-sync channel targets after a struggle
    StruggleFallback,
}

/// The one timer that may be pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSettle {
    pub kind: SettleKind,
    /// Value to apply when the timer fires
    pub value: i32,
    pub deadline: Instant,
}

/// Where the current settle cycle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SettleState {
    #[default]
    Idle,
    Pending(SettleKind),
    Settled(SettleKind),
}

/// Single-slot debounce timer
#[derive(Debug, Clone)]
pub struct SettleScheduler {
    debounce: Duration,
    fallback: Duration,
    pending: Option<PendingSettle>,
    state: SettleState,
    fired: u64,
}

impl SettleScheduler {
    pub fn new(debounce: Duration, fallback: Duration) -> Self {
        Self {
            debounce,
            fallback,
            pending: None,
            state: SettleState::Idle,
            fired: 0,
        }
    }

    /// Start the debounce for a final position
    ///
    /// Returns the timer it replaced, which will never fire.
    pub fn arm_final(&mut self, value: i32, now: Instant) -> Option<PendingSettle> {
        self.arm(SettleKind::Final, value, now + self.debounce)
    }

    /// Start the post-struggle fallback
    pub fn arm_fallback(&mut self, value: i32, now: Instant) -> Option<PendingSettle> {
        self.arm(SettleKind::StruggleFallback, value, now + self.fallback)
    }

    fn arm(&mut self, kind: SettleKind, value: i32, deadline: Instant) -> Option<PendingSettle> {
        let cancelled = self.cancel();
        if let Some(prev) = cancelled {
            debug!("{:?} settle superseded by {:?}", prev.kind, kind);
        }

        self.pending = Some(PendingSettle {
            kind,
            value,
            deadline,
        });
        self.state = SettleState::Pending(kind);
        cancelled
    }

    /// Drop the pending timer, if any
    pub fn cancel(&mut self) -> Option<PendingSettle> {
        let cancelled = self.pending.take();
        if cancelled.is_some() {
            self.state = SettleState::Idle;
        }
        cancelled
    }

    /// Take the pending timer if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<PendingSettle> {
        if self.pending.is_some_and(|p| p.deadline <= now) {
            let fired = self.pending.take()?;
            self.state = SettleState::Settled(fired.kind);
            self.fired += 1;
            return Some(fired);
        }
        None
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    pub fn pending(&self) -> Option<&PendingSettle> {
        self.pending.as_ref()
    }

    pub fn state(&self) -> SettleState {
        self.state
    }

    /// Number of timers that fired
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> SettleScheduler {
        SettleScheduler::new(Duration::from_millis(800), Duration::from_millis(1000))
    }

    #[test]
    fn test_final_fires_after_debounce() {
        let mut sched = scheduler();
        let t0 = Instant::now();

        sched.arm_final(42, t0);
        assert_eq!(sched.state(), SettleState::Pending(SettleKind::Final));
        assert!(sched.poll(t0 + Duration::from_millis(799)).is_none());

        let fired = sched.poll(t0 + Duration::from_millis(800)).unwrap();
        assert_eq!(fired.value, 42);
        assert_eq!(sched.state(), SettleState::Settled(SettleKind::Final));
        assert!(sched.poll(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_rearm_cancels_previous() {
        let mut sched = scheduler();
        let t0 = Instant::now();

        sched.arm_final(5, t0);
        let replaced = sched.arm_final(10, t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(replaced.value, 5);

        // The first deadline passes without firing
        assert!(sched.poll(t0 + Duration::from_millis(800)).is_none());

        let fired = sched.poll(t0 + Duration::from_millis(1000)).unwrap();
        assert_eq!(fired.value, 10);
        assert_eq!(sched.fired(), 1);
    }

    #[test]
    fn test_struggle_replaces_final() {
        let mut sched = scheduler();
        let t0 = Instant::now();

        sched.arm_final(5, t0);
        sched.arm_fallback(300, t0 + Duration::from_millis(100));

        assert!(sched.poll(t0 + Duration::from_millis(900)).is_none());
        let fired = sched.poll(t0 + Duration::from_millis(1100)).unwrap();
        assert_eq!(fired.kind, SettleKind::StruggleFallback);
    }

    #[test]
    fn test_cancel() {
        let mut sched = scheduler();
        let t0 = Instant::now();
        assert!(sched.cancel().is_none());

        sched.arm_final(1, t0);
        assert!(sched.cancel().is_some());
        assert_eq!(sched.state(), SettleState::Idle);
        assert_eq!(sched.deadline(), None);
    }
}
