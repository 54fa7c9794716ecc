//! Top-level Somfy RTS controller.
//!
//! [`SomfyCtl`] glues the three layers together: the rolling-code store
//! advances and persists the per-remote counter, the frame codec turns
//! the command into an obfuscated pulse burst, and the pulse engine
//! plays it out the TX pin. One controller drives any number of
//! registered remotes over a single transmitter.
//!
//! The ordering in [`SomfyCtl::send`] is load-bearing: the rolling code
//! is committed durably *before* the burst is queued. A crash after the
//! commit loses one code, which receivers tolerate; the reverse order
//! could transmit a code with no durable record and desynchronize the
//! receiver permanently.

use crate::config::{ConfigError, ConfigStore, Remote, RollingCode, RollingCodeStore};
use crate::consts::WORK_QUEUE_DEPTH;
use crate::engine::{EngineState, PulseEngine};
use crate::frame::{Command, Frame};
use crate::pulse::PulseError;
use crate::storage::{BlobStore, BlobTransport, NoTransport};
use crate::timer::AlarmTimer;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use thiserror::Error;

/// Errors surfaced by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SomfyError {
    /// Registry or persistence failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Pulse playback failure.
    #[error(transparent)]
    Pulse(#[from] PulseError),
}

/// Somfy RTS transmitter controller.
///
/// Construct once per TX pin, register remotes, then [`SomfyCtl::send`]
/// commands. With the `timer-isr` feature the controller lives in a
/// `critical_section` global (see [`crate::timer`]); with `delay-loop`
/// it is driven inline by the blocking `run_pulse_loop`.
#[derive(Debug)]
pub struct SomfyCtl<
    TX: OutputPin,
    TM: AlarmTimer,
    S: BlobStore,
    T: BlobTransport = NoTransport,
    const DEPTH: usize = WORK_QUEUE_DEPTH,
> {
    /// The playback engine, public so integrations can pump it directly
    /// and tests can reach the pin and timer.
    pub engine: PulseEngine<TX, TM, DEPTH>,
    store: RollingCodeStore<S, T>,
}

impl<TX, TM, S, T, const DEPTH: usize> SomfyCtl<TX, TM, S, T, DEPTH>
where
    TX: OutputPin,
    TM: AlarmTimer,
    S: BlobStore,
    T: BlobTransport,
{
    /// Creates a controller, loading the persisted remote registry.
    ///
    /// # Errors
    /// [`ConfigError::Corrupt`] or [`ConfigError::Storage`] when a
    /// persisted registry exists but cannot be read; aborting here
    /// beats transmitting with a stale rolling-code base.
    pub fn new(tx: TX, timer: TM, blobs: S, transport: Option<T>) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: PulseEngine::new(tx, timer),
            store: RollingCodeStore::load(blobs, transport)?,
        })
    }

    /// Sends one command: advances and commits the remote's rolling
    /// code, encodes the frame, and queues the transmission burst.
    ///
    /// The rolling code is spent once the commit succeeds, even if
    /// queueing then fails; receivers tolerate gaps in the code
    /// sequence, but never a reuse.
    ///
    /// # Errors
    /// [`SomfyError::Config`] if the remote is unknown or the commit
    /// fails (the code is then rolled back), [`SomfyError::Pulse`] if
    /// the engine is stopped or its queue stays full.
    pub fn send<D: DelayNs>(
        &mut self,
        command: Command,
        delay: &mut D,
    ) -> Result<(), SomfyError> {
        let code = self.store.advance_and_persist(command.remote)?;
        let frame = Frame::build(command.remote, command.button, code);
        let train = frame.render_burst()?;
        self.engine.submit(train, delay)?;
        rts_info!(
            "burst queued (remote {:06x}, button {:?}, code {})",
            command.remote,
            command.button,
            code
        );
        Ok(())
    }

    /// Registers a remote with its initial rolling code and persists
    /// the registry.
    pub fn register(
        &mut self,
        remote: Remote,
        name: &str,
        initial_code: RollingCode,
    ) -> Result<(), ConfigError> {
        self.store.register(remote, name, initial_code)
    }

    /// Deregisters a remote and persists the registry.
    pub fn deregister(&mut self, remote: Remote) -> Result<(), ConfigError> {
        self.store.remove(remote)
    }

    /// The registered remotes.
    pub fn remotes(&self) -> &ConfigStore {
        self.store.config()
    }

    /// The rolling code most recently committed for a remote.
    pub fn rolling_code(&self, remote: Remote) -> Option<RollingCode> {
        self.store.rolling_code(remote)
    }

    /// Pumps the engine from thread context, returning its state.
    pub fn poll(&mut self) -> EngineState {
        self.engine.poll()
    }

    /// Delivers a timer alarm to the engine. ISR-safe.
    pub fn on_alarm(&mut self) {
        self.engine.on_alarm();
    }

    /// Shuts playback down; subsequent sends fail with
    /// [`PulseError::Stopped`].
    pub fn teardown(&mut self) {
        self.engine.teardown();
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::consts::WAKEUP_HIGH_US;
    use crate::frame::{Button, FRAME_MARKER};
    use crate::storage::MemoryBlobStore;
    use crate::timer::SoftAlarmTimer;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn send_advances_persists_and_queues_the_burst() {
        let mut blobs = MemoryBlobStore::new();
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ];
        let tx = PinMock::new(&expectations);
        let mut ctl: SomfyCtl<_, _, _> =
            SomfyCtl::new(tx, SoftAlarmTimer::new(), &mut blobs, None).unwrap();
        ctl.register(0x10_0000, "bedroom", 15).unwrap();

        let command = Command {
            remote: 0x10_0000,
            button: Button::Up,
        };
        ctl.send(command, &mut NoopDelay::new()).unwrap();

        // Code 16 was committed and the burst started with the wake-up
        // pulse.
        assert_eq!(ctl.rolling_code(0x10_0000), Some(16));
        assert_eq!(ctl.engine.pending_trains(), 1);
        assert_eq!(ctl.engine.timer.take_pending(), Some(WAKEUP_HIGH_US));
        ctl.engine.tx.done();
        drop(ctl);

        // The committed code survives a reload from the same storage.
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut reloaded: SomfyCtl<_, _, _> =
            SomfyCtl::new(tx, SoftAlarmTimer::new(), &mut blobs, None).unwrap();
        assert_eq!(reloaded.rolling_code(0x10_0000), Some(16));
        reloaded.engine.tx.done();
    }

    #[test]
    fn send_to_an_unregistered_remote_touches_nothing() {
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut ctl: SomfyCtl<_, _, _> =
            SomfyCtl::new(tx, SoftAlarmTimer::new(), MemoryBlobStore::new(), None).unwrap();

        let command = Command {
            remote: 0xBEEF00,
            button: Button::Down,
        };
        assert_eq!(
            ctl.send(command, &mut NoopDelay::new()),
            Err(SomfyError::Config(ConfigError::NotFound))
        );
        assert!(ctl.engine.is_idle());
        ctl.engine.tx.done();
    }

    #[test]
    fn code_is_spent_even_when_the_engine_is_stopped() {
        let expectations = [
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::Low),
        ];
        let tx = PinMock::new(&expectations);
        let mut ctl: SomfyCtl<_, _, _> =
            SomfyCtl::new(tx, SoftAlarmTimer::new(), MemoryBlobStore::new(), None).unwrap();
        ctl.register(0x10_0000, "bedroom", 15).unwrap();
        ctl.teardown();

        let command = Command {
            remote: 0x10_0000,
            button: Button::Stop,
        };
        assert_eq!(
            ctl.send(command, &mut NoopDelay::new()),
            Err(SomfyError::Pulse(PulseError::Stopped))
        );
        // The commit happened before the engine refused the burst.
        assert_eq!(ctl.rolling_code(0x10_0000), Some(16));
        ctl.engine.tx.done();
    }

    #[test]
    fn register_and_deregister_round_trip() {
        let tx = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut ctl: SomfyCtl<_, _, _> =
            SomfyCtl::new(tx, SoftAlarmTimer::new(), MemoryBlobStore::new(), None).unwrap();

        ctl.register(0x10_0000, "bedroom", 15).unwrap();
        assert_eq!(ctl.remotes().len(), 1);
        assert_eq!(ctl.remotes().get(0x10_0000).unwrap().name(), "bedroom");

        ctl.deregister(0x10_0000).unwrap();
        assert!(ctl.remotes().is_empty());
        assert_eq!(ctl.deregister(0x10_0000), Err(ConfigError::NotFound));
        ctl.engine.tx.done();
    }

    #[test]
    fn known_command_produces_the_expected_wire_bytes() {
        // Reference vector: remote 0x100000, UP, rolling code 16.
        let frame = Frame::build(0x10_0000, Button::Up, 16);
        assert_eq!(
            frame.bytes(),
            &[0xA7, 0x88, 0x88, 0x98, 0x88, 0x88, 0x88]
        );
        let clear = frame.deobfuscate();
        assert_eq!(clear[0], FRAME_MARKER);
        assert_eq!(clear[1] >> 4, Button::Up.flag());
        assert_eq!(u16::from_be_bytes([clear[2], clear[3]]), 16);
    }
}
