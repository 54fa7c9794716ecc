//! Internal logging shims.
//!
//! The crate logs through these macros so the `log` dependency stays
//! optional. With the `log` feature off they expand to nothing.
//!
//! Never call these from interrupt context; the alarm handler must
//! stay silent and allocation-free.

#[cfg(feature = "log")]
macro_rules! rts_info {
    ($($arg:tt)*) => {
        ::log::info!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! rts_info {
    ($($arg:tt)*) => {{}};
}

#[cfg(feature = "log")]
macro_rules! rts_warn {
    ($($arg:tt)*) => {
        ::log::warn!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! rts_warn {
    ($($arg:tt)*) => {{}};
}
