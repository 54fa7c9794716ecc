//! Timer-driven pulse playback engine.
//!
//! The engine owns the TX pin and an [`AlarmTimer`] and plays queued
//! [`PulseTrain`]s through them, one pulse per alarm. It is split along
//! the same line as the hardware: [`PulseEngine::poll`] runs in thread
//! context and does everything that may log or drop memory, while
//! [`PulseEngine::on_alarm`] runs in the alarm interrupt and only reads
//! the cursor, drives the pin, and re-arms the timer.
//!
//! Completion and shutdown travel over a small internal control queue.
//! The alarm handler posts [`ControlMessage::TrainDone`] when a train is
//! exhausted; [`PulseEngine::teardown`] posts [`ControlMessage::Kill`]
//! at the *front* of the queue, so a shutdown request is always handled
//! before any pending completion.
//!
//! When both contexts share one engine (the `timer-isr` feature), the
//! whole engine lives behind a `critical_section` mutex; see
//! [`crate::timer`].

use crate::consts::{CONTROL_QUEUE_DEPTH, SUBMIT_TIMEOUT_MS, WORK_QUEUE_DEPTH};
use crate::pulse::{Level, PulseError, PulseTrain};
use crate::timer::AlarmTimer;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::Deque;

/// Message from the alarm handler or teardown path to the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// The current train has played its last pulse.
    TrainDone,
    /// Stop playback, drop all queued work, refuse further submissions.
    Kill,
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No train is playing; queued work starts on the next poll.
    Idle,
    /// A train is playing; the alarm handler is advancing it.
    Playing,
    /// Torn down. The pin is low, the timer stopped, all queues empty.
    Stopped,
}

/// Interrupt-driven player for queued pulse trains.
///
/// `DEPTH` bounds the work queue; a full queue pushes back on
/// submitters rather than growing.
pub struct PulseEngine<TX: OutputPin, TM: AlarmTimer, const DEPTH: usize = WORK_QUEUE_DEPTH> {
    /// Transmitter data pin, public so integrations and tests can reach
    /// the concrete pin when needed.
    pub tx: TX,
    /// Alarm timer driving pulse edges.
    pub timer: TM,
    work: Deque<PulseTrain, DEPTH>,
    control: Deque<ControlMessage, CONTROL_QUEUE_DEPTH>,
    current: Option<PulseTrain>,
    state: EngineState,
    trains_done: u32,
}

impl<TX: OutputPin, TM: AlarmTimer, const DEPTH: usize> core::fmt::Debug
    for PulseEngine<TX, TM, DEPTH>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PulseEngine")
            .field("state", &self.state)
            .field("queued", &self.work.len())
            .field("playing", &self.current.is_some())
            .field("trains_done", &self.trains_done)
            .finish()
    }
}

impl<TX: OutputPin, TM: AlarmTimer, const DEPTH: usize> PulseEngine<TX, TM, DEPTH> {
    /// Creates an idle engine and parks the TX line low.
    pub fn new(tx: TX, timer: TM) -> Self {
        let mut engine = Self {
            tx,
            timer,
            work: Deque::new(),
            control: Deque::new(),
            current: None,
            state: EngineState::Idle,
            trains_done: 0,
        };
        engine.drive(Level::Low);
        engine
    }

    /// Queues a train without waiting.
    ///
    /// Playback starts on the next [`PulseEngine::poll`].
    ///
    /// # Errors
    /// [`PulseError::InvalidArgument`] for an empty train,
    /// [`PulseError::Timeout`] when the work queue is full,
    /// [`PulseError::Stopped`] after teardown.
    pub fn try_submit(&mut self, train: PulseTrain) -> Result<(), PulseError> {
        if self.state == EngineState::Stopped {
            return Err(PulseError::Stopped);
        }
        if train.is_empty() {
            return Err(PulseError::InvalidArgument);
        }
        self.work.push_back(train).map_err(|_| PulseError::Timeout)
    }

    /// Queues a train, waiting up to the submission timeout for a work
    /// slot, and pumps the engine so an idle engine starts immediately.
    ///
    /// # Errors
    /// As [`PulseEngine::try_submit`], with [`PulseError::Timeout`]
    /// meaning the queue stayed full for the whole wait.
    pub fn submit<D: DelayNs>(
        &mut self,
        train: PulseTrain,
        delay: &mut D,
    ) -> Result<(), PulseError> {
        if train.is_empty() {
            return Err(PulseError::InvalidArgument);
        }
        let mut train = train;
        for _ in 0..=SUBMIT_TIMEOUT_MS {
            if self.poll() == EngineState::Stopped {
                return Err(PulseError::Stopped);
            }
            match self.work.push_back(train) {
                Ok(()) => {
                    let _ = self.poll();
                    return Ok(());
                }
                Err(rejected) => train = rejected,
            }
            delay.delay_ms(1);
        }
        Err(PulseError::Timeout)
    }

    /// Thread-context pump: drains control messages, frees completed
    /// trains, and starts the next queued train. Returns the resulting
    /// state so driving loops can exit on [`EngineState::Stopped`].
    ///
    /// Call this from the main loop, or rely on [`PulseEngine::submit`]
    /// and [`PulseEngine::wait_idle`] which pump internally.
    pub fn poll(&mut self) -> EngineState {
        while let Some(msg) = self.control.pop_front() {
            match msg {
                ControlMessage::Kill => {
                    self.shutdown();
                    return self.state;
                }
                ControlMessage::TrainDone => {
                    // The finished train is dropped here, in thread
                    // context, never in the alarm handler.
                    let _ = self.current.take();
                    self.trains_done = self.trains_done.wrapping_add(1);
                    self.state = EngineState::Idle;
                    rts_info!("pulse train complete ({} total)", self.trains_done);
                }
            }
        }
        if self.state == EngineState::Idle && self.current.is_none() {
            if let Some(train) = self.work.pop_front() {
                self.start_train(train);
            }
        }
        self.state
    }

    /// Alarm-interrupt entry point: emits the next pulse or finishes
    /// the train.
    ///
    /// Allocation-free and silent. A spurious alarm with no train
    /// playing just stops the timer.
    pub fn on_alarm(&mut self) {
        let Some(train) = self.current.as_mut() else {
            self.timer.stop();
            return;
        };
        match train.next_pulse() {
            Some(pulse) => {
                self.drive(pulse.level());
                self.timer.arm(pulse.duration_us());
            }
            None => {
                self.drive(Level::Low);
                self.timer.stop();
                // Full control queue means a kill is already pending
                // and everything gets discarded anyway.
                let _ = self.control.push_back(ControlMessage::TrainDone);
            }
        }
    }

    /// Requests shutdown. The kill message jumps the control queue, so
    /// it is handled before any pending completion; the shutdown itself
    /// happens in the poll this method performs.
    pub fn teardown(&mut self) {
        if self.control.push_front(ControlMessage::Kill).is_err() {
            let _ = self.control.pop_back();
            let _ = self.control.push_front(ControlMessage::Kill);
        }
        let _ = self.poll();
    }

    /// Non-blocking idle check in the `nb` style: `Ok` once no train is
    /// playing and no work is queued, `WouldBlock` otherwise. Pumps the
    /// engine on every call.
    pub fn wait_idle(&mut self) -> nb::Result<(), Infallible> {
        if self.poll() == EngineState::Playing || !self.work.is_empty() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether no train is playing and no work is queued.
    pub fn is_idle(&self) -> bool {
        self.state != EngineState::Playing && self.work.is_empty()
    }

    /// Number of trains queued or playing.
    pub fn pending_trains(&self) -> usize {
        self.work.len() + usize::from(self.current.is_some())
    }

    /// Number of trains played to completion since construction.
    pub fn trains_done(&self) -> u32 {
        self.trains_done
    }

    fn start_train(&mut self, mut train: PulseTrain) {
        train.reset();
        let Some(first) = train.next_pulse() else {
            return;
        };
        rts_info!("starting pulse train ({} pulses)", train.len());
        self.current = Some(train);
        self.state = EngineState::Playing;
        self.drive(first.level());
        self.timer.arm(first.duration_us());
        self.timer.start();
    }

    fn shutdown(&mut self) {
        self.timer.stop();
        self.drive(Level::Low);
        let _ = self.current.take();
        self.work.clear();
        self.control.clear();
        self.state = EngineState::Stopped;
        rts_info!("pulse engine stopped");
    }

    fn drive(&mut self, level: Level) {
        match level {
            Level::High => self.tx.set_high().unwrap(),
            Level::Low => self.tx.set_low().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SoftAlarmTimer;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn one_pulse_train() -> PulseTrain {
        let mut train = PulseTrain::new();
        train.push(640, Level::High).unwrap();
        train
    }

    #[test]
    fn empty_trains_are_rejected() {
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut engine: PulseEngine<_, _, 3> = PulseEngine::new(tx, SoftAlarmTimer::new());
        assert_eq!(
            engine.try_submit(PulseTrain::new()),
            Err(PulseError::InvalidArgument)
        );
        let mut delay = NoopDelay::new();
        assert_eq!(
            engine.submit(PulseTrain::new(), &mut delay),
            Err(PulseError::InvalidArgument)
        );
        engine.tx.done();
    }

    #[test]
    fn plays_a_train_pulse_by_pulse() {
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
        ];
        let tx = PinMock::new(&expectations);
        let mut engine: PulseEngine<_, _, 3> = PulseEngine::new(tx, SoftAlarmTimer::new());

        let mut train = PulseTrain::new();
        train.push(640, Level::High).unwrap();
        train.push(1280, Level::Low).unwrap();
        engine.try_submit(train).unwrap();
        assert!(matches!(engine.wait_idle(), Err(nb::Error::WouldBlock)));
        assert_eq!(engine.state(), EngineState::Playing);
        assert_eq!(engine.timer.take_pending(), Some(640));
        assert!(engine.timer.is_running());

        engine.on_alarm();
        assert_eq!(engine.timer.take_pending(), Some(1280));

        engine.on_alarm();
        assert!(!engine.timer.is_running());
        assert!(matches!(engine.wait_idle(), Ok(())));
        assert_eq!(engine.trains_done(), 1);
        assert_eq!(engine.pending_trains(), 0);
        engine.tx.done();
    }

    #[test]
    fn submission_times_out_when_the_queue_stays_full() {
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let tx = PinMock::new(&expectations);
        let mut engine: PulseEngine<_, _, 1> = PulseEngine::new(tx, SoftAlarmTimer::new());
        let mut delay = NoopDelay::new();

        // First train starts playing, second fills the only work slot.
        engine.submit(one_pulse_train(), &mut delay).unwrap();
        engine.submit(one_pulse_train(), &mut delay).unwrap();
        assert_eq!(
            engine.submit(one_pulse_train(), &mut delay),
            Err(PulseError::Timeout)
        );
        assert_eq!(engine.pending_trains(), 2);
        engine.tx.done();
    }

    #[test]
    fn kill_preempts_a_pending_completion() {
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
        ];
        let tx = PinMock::new(&expectations);
        let mut engine: PulseEngine<_, _, 3> = PulseEngine::new(tx, SoftAlarmTimer::new());

        engine.try_submit(one_pulse_train()).unwrap();
        assert_eq!(engine.poll(), EngineState::Playing);
        engine.on_alarm();
        // TrainDone is now queued but unpolled; teardown must win.
        engine.teardown();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert_eq!(engine.trains_done(), 0);
        assert_eq!(engine.pending_trains(), 0);
        engine.tx.done();
    }

    #[test]
    fn stopped_engine_refuses_submissions() {
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
        ];
        let tx = PinMock::new(&expectations);
        let mut engine: PulseEngine<_, _, 3> = PulseEngine::new(tx, SoftAlarmTimer::new());
        engine.teardown();

        assert_eq!(
            engine.try_submit(one_pulse_train()),
            Err(PulseError::Stopped)
        );
        let mut delay = NoopDelay::new();
        assert_eq!(
            engine.submit(one_pulse_train(), &mut delay),
            Err(PulseError::Stopped)
        );
        // A stopped engine stays idle from the caller's point of view.
        assert!(matches!(engine.wait_idle(), Ok(())));
        engine.tx.done();
    }

    #[test]
    fn spurious_alarm_with_no_train_stops_the_timer() {
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut engine: PulseEngine<_, _, 3> = PulseEngine::new(tx, SoftAlarmTimer::new());
        engine.timer.start();
        engine.on_alarm();
        assert!(!engine.timer.is_running());
        engine.tx.done();
    }
}
