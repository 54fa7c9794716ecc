//! # rts433
//!
//! A portable, no_std Rust driver for transmitting Somfy RTS rolling-code
//! frames to 433.42 MHz roller-shutter receivers, using a cheap ASK/OOK
//! transmitter module on a single GPIO pin.
//!
//! This driver implements the full transmit path in software:
//! - `embedded-hal` traits for digital I/O and timing
//! - an interrupt-driven pulse engine with a bounded work queue
//! - the RTS frame codec (checksum, obfuscation, Manchester data bits)
//! - a persisted per-remote rolling-code store with crash-safe commits
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]`, swaps `heapless` collections for `std` ones, adds the in-memory blob store |
//! | `timer-isr` (default) | Shares the controller with a timer ISR via `critical_section` |
//! | `delay-loop`          | Drives playback with a blocking `embedded_hal::delay::DelayNs` loop |
//! | `log`                 | Emits `log` records from thread-context paths |
//!
//! ## Usage
//!
//! ```rust
//! use embedded_hal_mock::eh1::delay::NoopDelay;
//! use embedded_hal_mock::eh1::digital::{Mock, State, Transaction};
//! use rts433::ctl::SomfyCtl;
//! use rts433::frame::{Button, Command};
//! use rts433::storage::MemoryBlobStore;
//! use rts433::timer::SoftAlarmTimer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let tx = Mock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
//! # let mut delay = NoopDelay::new();
//! let mut ctl: SomfyCtl<_, _, _> =
//!     SomfyCtl::new(tx, SoftAlarmTimer::new(), MemoryBlobStore::new(), None)?;
//! ctl.register(0x10_0000, "bedroom", 15)?;
//! ctl.send(Command { remote: 0x10_0000, button: Button::Up }, &mut delay)?;
//! # ctl.engine.tx.done();
//! # Ok(())
//! # }
//! ```
//!
//! On hardware, hand `SomfyCtl` your TX pin, a one-shot alarm timer
//! implementing [`timer::AlarmTimer`], and your platform's key-value
//! blob store implementing [`storage::BlobStore`]; then either wire a
//! timer interrupt with the `timer-isr` macros or run the `delay-loop`
//! playback loop.
//!
//! ## Integration Notes
//!
//! - Pulse timing is microsecond-granular; symbol width is 640 µs and
//!   the protocol tolerates typical interrupt-latency jitter
//! - Rolling codes are committed durably before every transmission; do
//!   not bypass the store or receivers will desynchronize
//! - Only one controller instance should drive a given TX pin
//!
//! Designed for `#![no_std]` use in resource-constrained embedded
//! environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

#[macro_use]
mod fmt;

pub mod config;
pub mod consts;
pub mod ctl;
pub mod engine;
pub mod frame;
pub mod pulse;
pub mod storage;
pub mod timer;
