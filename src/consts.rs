//! Constants used across the Somfy RTS protocol implementation.
//!
//! This module defines the protocol-wide timing table, frame geometry,
//! queue sizing, and config-store limits.
//!
//! The timing values are the Somfy RTS on-air format as observed by
//! receivers in the field; they are not tunable. Everything is expressed
//! in microseconds because the pulse engine arms its hardware alarm in
//! microsecond units.
//!
//! ## Key Concepts
//!
//! - **Symbol**: the 640 µs base timing unit. Each data bit occupies two
//!   symbol halves in one of two orders (Manchester-style inversion).
//! - **Hardware sync**: fixed 4-symbol-wide preamble pairs that let the
//!   receiver's AGC and clock lock before data.
//! - **Wake-up**: a long pulse plus silence emitted once per burst, ahead
//!   of the first frame only.
//! - **Burst**: the same 7-byte frame rendered three times (sync counts
//!   2, 7, 7) so receivers can accept any one undamaged repetition.

/// The 640 µs base symbol width. Data bits are pairs of symbol halves.
pub const SYMBOL_US: u32 = 640;

/// Wake-up pulse width, emitted high once at the start of a burst.
pub const WAKEUP_HIGH_US: u32 = 9415;

/// Silence following the wake-up pulse.
pub const WAKEUP_LOW_US: u32 = 89565;

/// Width of each half of a hardware-sync pair (4 symbols).
pub const HW_SYNC_US: u32 = 4 * SYMBOL_US;

/// High half of the software-sync pair.
pub const SW_SYNC_HIGH_US: u32 = 4550;

/// Low half of the software-sync pair (one symbol).
pub const SW_SYNC_LOW_US: u32 = SYMBOL_US;

/// Inter-frame silence appended after each frame's data bits.
pub const FRAME_GAP_US: u32 = 30415;

/// Size of the wire payload in bytes.
pub const FRAME_LEN: usize = 7;

/// Number of data bits per frame (7 bytes, MSB first).
pub const FRAME_BITS: usize = FRAME_LEN * 8;

/// Hardware-sync pair count for the first frame of a burst.
///
/// The value doubles as the "emit the wake-up preamble" marker in
/// [`Frame::write_pulses`](crate::frame::Frame::write_pulses).
pub const FIRST_FRAME_SYNC: u8 = 2;

/// Hardware-sync pair count for every repeated frame.
pub const REPEAT_FRAME_SYNC: u8 = 7;

/// Number of times the frame is rendered into one burst.
pub const FRAME_REPEATS: usize = 3;

/// Pulses in the first frame of a burst: wake-up pair, 2 sync pairs,
/// software-sync pair, 112 data pulses, trailing gap.
pub const FIRST_FRAME_PULSES: usize = 2 + 2 * FIRST_FRAME_SYNC as usize + 2 + 2 * FRAME_BITS + 1;

/// Pulses in a repeated frame: 7 sync pairs, software-sync pair,
/// 112 data pulses, trailing gap.
pub const REPEAT_FRAME_PULSES: usize = 2 * REPEAT_FRAME_SYNC as usize + 2 + 2 * FRAME_BITS + 1;

/// Capacity of a [`PulseTrain`](crate::pulse::PulseTrain): one full
/// three-frame burst.
pub const TRAIN_MAX_PULSES: usize = FIRST_FRAME_PULSES + (FRAME_REPEATS - 1) * REPEAT_FRAME_PULSES;

/// Default depth of the pulse engine's work queue (queued trains).
pub const WORK_QUEUE_DEPTH: usize = 3;

/// Depth of the engine's control queue (completion/kill signals).
pub const CONTROL_QUEUE_DEPTH: usize = 2;

/// Bounded wait applied by [`submit`](crate::engine::PulseEngine::submit)
/// before it gives up with a timeout, in milliseconds.
pub const SUBMIT_TIMEOUT_MS: u32 = 1000;

/// Namespace under which the serialized config blob is stored.
pub const CONFIG_NAMESPACE: &str = "somfy-cfg";

/// Key under which the serialized config blob is stored.
pub const CONFIG_KEY: &str = "config_data";

/// Maximum length of a remote's display name in bytes.
///
/// The serialization format stores the length in a single byte.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum number of registered remotes when the store is backed by
/// `heapless` collections (no_std builds). With `std` the store grows
/// to the format's limit of 255 records.
#[cfg(not(feature = "std"))]
pub const MAX_REMOTES: usize = 16;

/// Serialized size of one remote record, excluding its name bytes.
pub const RECORD_HEADER_LEN: usize = 4 + 2 + 1;

/// Upper bound on the serialized config blob for no_std builds.
#[cfg(not(feature = "std"))]
pub const CONFIG_BLOB_MAX_LEN: usize = 1 + MAX_REMOTES * (RECORD_HEADER_LEN + MAX_NAME_LEN);
