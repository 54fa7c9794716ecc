//! Pulse and pulse-train types for timed GPIO playback.
//!
//! A [`Pulse`] is one timed GPIO level: hold the line at [`Level::High`]
//! or [`Level::Low`] for a duration in microseconds. A [`PulseTrain`] is
//! a finite, ordered sequence of pulses plus a playback cursor, sized to
//! hold one full Somfy RTS transmission burst.
//!
//! The train is protocol-agnostic: the frame codec renders RTS frames
//! into it, but any finite pulse sequence can be queued on the
//! [`PulseEngine`](crate::engine::PulseEngine).
//!
//! ## Representation
//!
//! A pulse packs into a single `i32`: the magnitude is the duration in
//! microseconds and the sign carries the level (negative = low). This
//! keeps a full 379-pulse burst at ~1.5 KiB and makes cursor advancement
//! in the alarm handler a plain array read.

use crate::consts::TRAIN_MAX_PULSES;
use heapless::Vec;
use thiserror::Error;

/// GPIO line level during a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Line driven low (carrier off).
    Low,
    /// Line driven high (carrier on).
    High,
}

/// Errors reported by the pulse train and pulse engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PulseError {
    /// Zero or out-of-range duration, empty train, or train capacity
    /// exceeded. Rejected before any state mutation.
    #[error("invalid pulse or pulse train")]
    InvalidArgument,
    /// The work queue stayed full for the whole bounded submission wait.
    #[error("pulse engine work queue is full")]
    Timeout,
    /// The engine has been torn down and accepts no further trains.
    #[error("pulse engine is stopped")]
    Stopped,
}

/// One timed GPIO level, packed into an `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse(i32);

impl Pulse {
    /// Builds a pulse from a duration in microseconds and a level.
    ///
    /// # Errors
    /// [`PulseError::InvalidArgument`] if the duration is zero or does
    /// not fit the packed representation (> `i32::MAX` µs).
    pub fn new(duration_us: u32, level: Level) -> Result<Self, PulseError> {
        if duration_us == 0 || duration_us > i32::MAX as u32 {
            return Err(PulseError::InvalidArgument);
        }
        let packed = match level {
            Level::High => duration_us as i32,
            Level::Low => -(duration_us as i32),
        };
        Ok(Self(packed))
    }

    /// Duration of the pulse in microseconds.
    pub fn duration_us(&self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Level the line holds for the duration of the pulse.
    pub fn level(&self) -> Level {
        if self.0 >= 0 { Level::High } else { Level::Low }
    }
}

/// An ordered, finite sequence of pulses with a playback cursor.
///
/// Owned by the producer while being filled, then handed to the pulse
/// engine on submission; the engine owns it until playback completes.
#[derive(Debug, Default)]
pub struct PulseTrain {
    pulses: Vec<Pulse, TRAIN_MAX_PULSES>,
    cursor: usize,
}

impl PulseTrain {
    /// Creates an empty train.
    pub fn new() -> Self {
        Self {
            pulses: Vec::new(),
            cursor: 0,
        }
    }

    /// Appends one pulse.
    ///
    /// # Errors
    /// [`PulseError::InvalidArgument`] for a zero/out-of-range duration
    /// or when the train is already at burst capacity.
    pub fn push(&mut self, duration_us: u32, level: Level) -> Result<(), PulseError> {
        let pulse = Pulse::new(duration_us, level)?;
        self.pulses
            .push(pulse)
            .map_err(|_| PulseError::InvalidArgument)
    }

    /// Number of pulses in the train.
    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    /// Whether the train holds no pulses.
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Pulses appended so far, in playback order.
    pub fn as_slice(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Rewinds the playback cursor to the first pulse.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Yields the next pulse and advances the cursor.
    ///
    /// Allocation-free; safe to call from the alarm handler.
    pub fn next_pulse(&mut self) -> Option<Pulse> {
        let pulse = self.pulses.get(self.cursor).copied();
        if pulse.is_some() {
            self.cursor += 1;
        }
        pulse
    }
}
