//! The countdown clock.
//!
//! Remaining time is never decremented in place. A running clock remembers the instant its
//! current run segment began and the time that was left at that instant, and every reading is
//! derived from those two values. Missed or late ticks therefore never make the clock drift.

use crate::EpochMillis;
use log::*;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use thiserror::Error;

const MILLIS_PER_SEC: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClockFields", into = "ClockFields")]
pub enum ClockState {
    Stopped {
        remaining_secs: u32,
    },
    CountingDown {
        start_time: EpochMillis,
        remaining_at_start: u32,
    },
}

impl Default for ClockState {
    fn default() -> Self {
        ClockState::Stopped { remaining_secs: 0 }
    }
}

impl ClockState {
    pub fn new(remaining_secs: u32) -> Self {
        ClockState::Stopped { remaining_secs }
    }

    pub fn is_running(&self) -> bool {
        match self {
            ClockState::CountingDown { .. } => true,
            ClockState::Stopped { .. } => false,
        }
    }

    /// The instant the current run segment began, if the clock is running
    pub fn anchor(&self) -> Option<EpochMillis> {
        match self {
            ClockState::CountingDown { start_time, .. } => Some(*start_time),
            ClockState::Stopped { .. } => None,
        }
    }

    /// Whole seconds elapsed since `start_time`. A `now` before the start counts as no time.
    fn elapsed_secs(start_time: EpochMillis, now: EpochMillis) -> u64 {
        now.saturating_sub(start_time) / MILLIS_PER_SEC
    }

    pub fn remaining_at(&self, now: EpochMillis) -> u32 {
        match *self {
            ClockState::Stopped { remaining_secs } => remaining_secs,
            ClockState::CountingDown {
                start_time,
                remaining_at_start,
            } => {
                let elapsed = Self::elapsed_secs(start_time, now);
                u64::from(remaining_at_start).saturating_sub(elapsed) as u32
            }
        }
    }

    /// The remaining time stored in the state: the current value if stopped, the value at the
    /// anchor if running
    pub fn recorded_secs(&self) -> u32 {
        match *self {
            ClockState::Stopped { remaining_secs } => remaining_secs,
            ClockState::CountingDown {
                remaining_at_start, ..
            } => remaining_at_start,
        }
    }

    /// Returns true if the clock was started, false if it was already running or had no time
    /// left to count down
    pub fn start(&mut self, now: EpochMillis) -> bool {
        match *self {
            ClockState::Stopped { remaining_secs } if remaining_secs > 0 => {
                *self = ClockState::CountingDown {
                    start_time: now,
                    remaining_at_start: remaining_secs,
                };
                true
            }
            ClockState::Stopped { .. } | ClockState::CountingDown { .. } => false,
        }
    }

    /// Returns true if the clock was stopped, false if it was already stopped
    pub fn pause(&mut self, now: EpochMillis) -> bool {
        match *self {
            ClockState::CountingDown { .. } => {
                *self = ClockState::Stopped {
                    remaining_secs: self.remaining_at(now),
                };
                true
            }
            ClockState::Stopped { .. } => false,
        }
    }

    pub fn reset(&mut self, remaining_secs: u32) {
        *self = ClockState::Stopped { remaining_secs };
    }

    /// Replaces the remaining time without changing whether the clock is running. A running
    /// clock keeps running from the new value, anchored at `now`.
    pub fn set_remaining(&mut self, remaining_secs: u32, now: EpochMillis) {
        *self = match *self {
            ClockState::CountingDown { .. } if remaining_secs > 0 => ClockState::CountingDown {
                start_time: now,
                remaining_at_start: remaining_secs,
            },
            ClockState::CountingDown { .. } | ClockState::Stopped { .. } => {
                ClockState::Stopped { remaining_secs }
            }
        };
    }

    /// Reads the clock at `now`. The first reading of zero on a running clock stops it.
    pub fn tick(&mut self, now: EpochMillis) -> u32 {
        let remaining = self.remaining_at(now);
        if remaining == 0 && self.is_running() {
            info!("Clock reached zero");
            *self = ClockState::Stopped { remaining_secs: 0 };
        }
        remaining
    }

    /// An equivalent clock whose run segment begins at the last whole second consumed before
    /// `now`. Both clocks read the same value at every instant from `now` on.
    pub fn rebased(&self, now: EpochMillis) -> ClockState {
        match *self {
            ClockState::Stopped { .. } => *self,
            ClockState::CountingDown {
                start_time,
                remaining_at_start,
            } => {
                let elapsed = Self::elapsed_secs(start_time, now).min(remaining_at_start.into());
                let remaining = remaining_at_start - elapsed as u32;
                if remaining == 0 {
                    ClockState::Stopped { remaining_secs: 0 }
                } else {
                    ClockState::CountingDown {
                        start_time: start_time + elapsed * MILLIS_PER_SEC,
                        remaining_at_start: remaining,
                    }
                }
            }
        }
    }

    /// The next instant at which the displayed number of seconds changes
    pub fn next_change_at(&self, now: EpochMillis) -> Option<EpochMillis> {
        match *self {
            ClockState::Stopped { .. } => None,
            ClockState::CountingDown { start_time, .. } => {
                let elapsed = Self::elapsed_secs(start_time, now);
                Some(start_time + (elapsed + 1) * MILLIS_PER_SEC)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockStateError {
    #[error("A running clock needs an anchor timestamp")]
    MissingAnchor,
    #[error("A stopped clock can't have an anchor timestamp")]
    UnexpectedAnchor,
    #[error("A running clock must have time remaining")]
    RunningAtZero,
}

/// The shape of a clock on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockFields {
    remaining_seconds: u32,
    running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor_epoch_millis: Option<EpochMillis>,
}

impl TryFrom<ClockFields> for ClockState {
    type Error = ClockStateError;

    fn try_from(fields: ClockFields) -> Result<Self, Self::Error> {
        match (fields.running, fields.anchor_epoch_millis) {
            (true, None) => Err(ClockStateError::MissingAnchor),
            (true, Some(_)) if fields.remaining_seconds == 0 => {
                Err(ClockStateError::RunningAtZero)
            }
            (true, Some(start_time)) => Ok(ClockState::CountingDown {
                start_time,
                remaining_at_start: fields.remaining_seconds,
            }),
            (false, Some(_)) => Err(ClockStateError::UnexpectedAnchor),
            (false, None) => Ok(ClockState::Stopped {
                remaining_secs: fields.remaining_seconds,
            }),
        }
    }
}

impl From<ClockState> for ClockFields {
    fn from(state: ClockState) -> Self {
        match state {
            ClockState::Stopped { remaining_secs } => ClockFields {
                remaining_seconds: remaining_secs,
                running: false,
                anchor_epoch_millis: None,
            },
            ClockState::CountingDown {
                start_time,
                remaining_at_start,
            } => ClockFields {
                remaining_seconds: remaining_at_start,
                running: true,
                anchor_epoch_millis: Some(start_time),
            },
        }
    }
}
