use crate::engine::{EngineState, PulseEngine};
use crate::timer::AlarmTimer;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Software [`AlarmTimer`] that records armed durations instead of
/// generating interrupts.
///
/// Pair it with [`run_pulse_loop`], which replays the recorded
/// durations through a blocking delay provider. Also handy in tests,
/// where the recorded duration and running flag make the engine's
/// timer interaction observable.
#[derive(Debug, Default)]
pub struct SoftAlarmTimer {
    pending: Option<u32>,
    running: bool,
}

impl SoftAlarmTimer {
    /// Creates a stopped timer with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the most recently armed duration, if any.
    pub fn take_pending(&mut self) -> Option<u32> {
        self.pending.take()
    }

    /// Whether the alarm is enabled.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl AlarmTimer for SoftAlarmTimer {
    fn start(&mut self) {
        self.running = true;
    }

    fn arm(&mut self, duration_us: u32) {
        self.pending = Some(duration_us);
    }

    fn stop(&mut self) {
        self.running = false;
        self.pending = None;
    }
}

/// Blocking playback loop for interrupt-free firmware.
///
/// Pumps the engine and, while a train is playing, sleeps for each
/// armed pulse duration before delivering the alarm by hand. Returns
/// once the engine has drained its work queue or has been torn down.
///
/// Timing accuracy is whatever the delay provider gives; busy-wait
/// delays on a microcontroller are typically well within protocol
/// tolerance.
pub fn run_pulse_loop<TX, D, const DEPTH: usize>(
    engine: &mut PulseEngine<TX, SoftAlarmTimer, DEPTH>,
    delay: &mut D,
) where
    TX: OutputPin,
    D: DelayNs,
{
    loop {
        if engine.poll() == EngineState::Stopped {
            return;
        }
        match engine.timer.take_pending() {
            Some(duration_us) if engine.timer.is_running() => {
                delay.delay_us(duration_us);
                engine.on_alarm();
            }
            _ => {
                if engine.is_idle() {
                    return;
                }
            }
        }
    }
}
