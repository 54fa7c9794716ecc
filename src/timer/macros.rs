/// Declares a static global `SOMFY_CTL` instance protected by a
/// `critical_section` mutex.
///
/// Use when the main thread and a timer ISR share one controller.
/// Install the controller with [`setup_somfy_ctl!`](crate::setup_somfy_ctl)
/// before the first interrupt fires.
///
/// # Arguments
/// - `$tx`: concrete TX pin type (must implement `OutputPin`)
/// - `$tm`: concrete alarm timer type (must implement `AlarmTimer`)
/// - `$s`: concrete blob store type (must implement `BlobStore`)
/// - `$t`: concrete transport type (must implement `BlobTransport`)
///
/// # Example
/// ```ignore
/// init_somfy_ctl!(TxPin, HwAlarm, NvsStore, NoTransport);
/// ```
#[macro_export]
macro_rules! init_somfy_ctl {
    ( $tx:ty, $tm:ty, $s:ty, $t:ty ) => {
        pub static SOMFY_CTL: $crate::critical_section::Mutex<
            core::cell::RefCell<Option<$crate::ctl::SomfyCtl<$tx, $tm, $s, $t>>>,
        > = $crate::critical_section::Mutex::new(core::cell::RefCell::new(None));
    };
}

/// Installs a constructed controller into the `SOMFY_CTL` global
/// declared by [`init_somfy_ctl!`](crate::init_somfy_ctl).
///
/// # Example
/// ```ignore
/// let ctl = SomfyCtl::new(tx, timer, nvs, None)?;
/// setup_somfy_ctl!(ctl);
/// ```
#[macro_export]
macro_rules! setup_somfy_ctl {
    ( $ctl:expr ) => {
        $crate::critical_section::with(|cs| {
            let _ = SOMFY_CTL.borrow(cs).replace(Some($ctl));
        });
    };
}

/// Delivers a timer alarm to the `SOMFY_CTL` global.
///
/// Invoke from the platform timer interrupt. Silently does nothing if
/// the controller has not been installed yet.
///
/// # Example
/// ```ignore
/// #[interrupt]
/// fn TIM2() {
///     somfy_alarm_tick!();
/// }
/// ```
#[macro_export]
macro_rules! somfy_alarm_tick {
    () => {
        $crate::critical_section::with(|cs| {
            if let Some(ctl) = SOMFY_CTL.borrow(cs).borrow_mut().as_mut() {
                ctl.on_alarm();
            }
        });
    };
}

/// Pumps the `SOMFY_CTL` global from the main loop.
#[macro_export]
macro_rules! somfy_ctl_poll {
    () => {
        $crate::critical_section::with(|cs| {
            if let Some(ctl) = SOMFY_CTL.borrow(cs).borrow_mut().as_mut() {
                let _ = ctl.poll();
            }
        });
    };
}
