//! Admission control for evolution cycles.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Why a tick may or may not start a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Admit,
    /// `max_daily_cycles` cycles already started on this UTC day
    DailyCapReached,
    /// The previous cycle started less than `interval` ago
    TooSoon { remaining: Duration },
}

/// Daily cap plus minimum spacing between cycle starts.
#[derive(Debug, Clone)]
pub struct CycleGate {
    max_daily_cycles: u32,
    interval: Duration,
}

impl CycleGate {
    pub fn new(max_daily_cycles: u32, interval: Duration) -> Self {
        Self {
            max_daily_cycles,
            interval,
        }
    }

    pub fn max_daily_cycles(&self) -> u32 {
        self.max_daily_cycles
    }

    /// Decide whether a scheduled cycle may start at `now`, given the start
    /// times of earlier cycles (oldest first).
    pub fn check(&self, now: DateTime<Utc>, starts: &[DateTime<Utc>]) -> GateDecision {
        match self.check_cap(now, starts) {
            GateDecision::Admit => {}
            denied => return denied,
        }
        match self.remaining(now, starts) {
            Some(remaining) => GateDecision::TooSoon { remaining },
            None => GateDecision::Admit,
        }
    }

    /// The daily cap alone; forced cycles skip the interval.
    pub fn check_cap(&self, now: DateTime<Utc>, starts: &[DateTime<Utc>]) -> GateDecision {
        if started_on_day(now, starts) >= self.max_daily_cycles as usize {
            GateDecision::DailyCapReached
        } else {
            GateDecision::Admit
        }
    }

    /// Time left before the interval since the last start has elapsed.
    /// `None` once it has (or when nothing has run yet).
    pub fn remaining(&self, now: DateTime<Utc>, starts: &[DateTime<Utc>]) -> Option<Duration> {
        let last = starts.last()?;
        let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
        (elapsed < self.interval).then(|| self.interval - elapsed)
    }

    /// How long until a scheduled cycle could be admitted. `None` when the
    /// cap is zero and nothing will ever run.
    pub fn next_admission(&self, now: DateTime<Utc>, starts: &[DateTime<Utc>]) -> Option<Duration> {
        if self.max_daily_cycles == 0 {
            return None;
        }
        let spacing = self.remaining(now, starts).unwrap_or(Duration::ZERO);
        let cap = match self.check_cap(now, starts) {
            GateDecision::Admit => Duration::ZERO,
            _ => until_next_day(now),
        };
        Some(spacing.max(cap))
    }
}

fn until_next_day(now: DateTime<Utc>) -> Duration {
    now.date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|midnight| (midnight.and_utc() - now).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

fn started_on_day(now: DateTime<Utc>, starts: &[DateTime<Utc>]) -> usize {
    let today = now.date_naive();
    starts.iter().filter(|s| s.date_naive() == today).count()
}
