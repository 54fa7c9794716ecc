use crate::ctl::SomfyCtl;
use crate::storage::{BlobStore, BlobTransport};
use crate::timer::AlarmTimer;
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

/// Builds the empty `critical_section` cell for a global static
/// [`SomfyCtl`], for use when the generic parameters make the
/// [`init_somfy_ctl!`](crate::init_somfy_ctl) macro awkward.
///
/// # Example
/// ```ignore
/// static SOMFY_CTL: Mutex<RefCell<Option<SomfyCtl<Tx, Tim, Nvs>>>> =
///     global_ctl_init::<Tx, Tim, Nvs, NoTransport, 3>();
/// ```
pub const fn global_ctl_init<TX, TM, S, T, const DEPTH: usize>()
-> Mutex<RefCell<Option<SomfyCtl<TX, TM, S, T, DEPTH>>>>
where
    TX: OutputPin,
    TM: AlarmTimer,
    S: BlobStore,
    T: BlobTransport,
{
    Mutex::new(RefCell::new(None))
}

/// Delivers a timer alarm to the global controller.
///
/// Call from the platform's timer interrupt handler. Does nothing until
/// the controller has been installed.
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn TIM2() {
///     global_ctl_alarm(&SOMFY_CTL);
/// }
/// ```
pub fn global_ctl_alarm<TX, TM, S, T, const DEPTH: usize>(
    global_ctl: &'static Mutex<RefCell<Option<SomfyCtl<TX, TM, S, T, DEPTH>>>>,
) where
    TX: OutputPin,
    TM: AlarmTimer,
    S: BlobStore,
    T: BlobTransport,
{
    critical_section::with(|cs| {
        if let Some(ctl) = global_ctl.borrow(cs).borrow_mut().as_mut() {
            ctl.on_alarm();
        }
    });
}

/// Pumps the global controller from thread context.
///
/// Call from the main loop; completed trains are freed and queued
/// trains started here, never in the interrupt.
pub fn global_ctl_poll<TX, TM, S, T, const DEPTH: usize>(
    global_ctl: &'static Mutex<RefCell<Option<SomfyCtl<TX, TM, S, T, DEPTH>>>>,
) where
    TX: OutputPin,
    TM: AlarmTimer,
    S: BlobStore,
    T: BlobTransport,
{
    critical_section::with(|cs| {
        if let Some(ctl) = global_ctl.borrow(cs).borrow_mut().as_mut() {
            let _ = ctl.poll();
        }
    });
}
