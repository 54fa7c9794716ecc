//! Alarm scheduling for pulse playback.
//!
//! The engine needs exactly one timing primitive: a one-shot alarm it
//! can re-arm from the alarm handler with the duration of the pulse it
//! just started. [`AlarmTimer`] is that seam; platforms implement it
//! over whatever hardware timer they have.
//!
//! Two scheduling front-ends are provided:
//! - `timer-isr` (default): the controller lives in a
//!   `critical_section`-protected global and a hardware timer interrupt
//!   calls into it. See [`global_ctl_alarm`] and the
//!   [`init_somfy_ctl!`](crate::init_somfy_ctl) /
//!   [`somfy_alarm_tick!`](crate::somfy_alarm_tick) macros.
//! - `delay-loop`: no interrupts; the blocking `run_pulse_loop` replays
//!   the armed durations with a `DelayNs`, trading CPU for simplicity.

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// One-shot alarm timer with microsecond resolution.
///
/// The engine arms the alarm from inside the previous alarm's handler,
/// so implementations must tolerate `arm` being called in interrupt
/// context. Pulse timing accuracy is bounded by how precisely the
/// platform honors the armed duration; the protocol tolerates the
/// interrupt-latency jitter of typical microcontroller timers.
pub trait AlarmTimer {
    /// Enables the alarm. The most recently armed duration applies.
    fn start(&mut self);

    /// Schedules the next alarm `duration_us` microseconds from now.
    fn arm(&mut self, duration_us: u32);

    /// Disables the alarm. A later `start` resumes with whatever is
    /// armed next.
    fn stop(&mut self);
}
