//! Somfy RTS frame encoding.
//!
//! This module turns a logical command (remote id, button, rolling code)
//! into the 7-byte obfuscated wire payload and renders that payload into
//! timed pulses.
//!
//! ## Wire format
//!
//! Byte layout before obfuscation:
//!
//! | Byte | Content |
//! |------|---------|
//! | 0    | `0xA7` encoding marker |
//! | 1    | button flags in the high nibble, checksum in the low nibble |
//! | 2–3  | rolling code, big-endian |
//! | 4–6  | remote id, big-endian (24 bits) |
//!
//! The checksum XOR-folds every byte with itself shifted right four bits
//! and keeps the low nibble. Obfuscation then XORs each byte with its
//! already-obfuscated predecessor, byte 0 untouched. Receivers undo the
//! chain in reverse, so [`Frame::deobfuscate`] is its exact inverse.
//!
//! Encoding is a pure function of its inputs: the rolling code is
//! advanced and persisted by the caller *before* the frame is built,
//! never in here.

use crate::consts::{
    FIRST_FRAME_SYNC, FRAME_BITS, FRAME_GAP_US, FRAME_LEN, HW_SYNC_US, REPEAT_FRAME_SYNC,
    SW_SYNC_HIGH_US, SW_SYNC_LOW_US, SYMBOL_US, WAKEUP_HIGH_US, WAKEUP_LOW_US,
};
use crate::pulse::{Level, PulseError, PulseTrain};

/// Wire marker carried in byte 0 of every frame.
pub const FRAME_MARKER: u8 = 0xA7;

/// Button flags carried in the high nibble of byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Button {
    /// Stop the motor / move to the "my" position.
    Stop = 1,
    /// Raise the shutter.
    Up = 2,
    /// Lower the shutter.
    Down = 4,
    /// Pair the remote with a receiver.
    Prog = 8,
}

impl Button {
    /// The 4-bit flag value placed in the frame.
    pub fn flag(self) -> u8 {
        self as u8
    }

    /// Parses a raw flag value, as received from a bridge or HTTP layer.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            1 => Some(Button::Stop),
            2 => Some(Button::Up),
            4 => Some(Button::Down),
            8 => Some(Button::Prog),
            _ => None,
        }
    }
}

/// A single user action: which remote pressed which button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// 24-bit remote identifier.
    pub remote: u32,
    /// Button being pressed.
    pub button: Button,
}

/// The 7-byte obfuscated wire payload for one command instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Encodes a frame from its logical parts.
    ///
    /// Deterministic: the same inputs always yield the same bytes. The
    /// remote id is masked to its significant 24 bits.
    pub fn build(remote: u32, button: Button, rolling_code: u16) -> Self {
        let remote = remote & 0x00ff_ffff;
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = FRAME_MARKER;
        frame[1] = button.flag() << 4;
        frame[2] = (rolling_code >> 8) as u8;
        frame[3] = rolling_code as u8;
        frame[4] = (remote >> 16) as u8;
        frame[5] = (remote >> 8) as u8;
        frame[6] = remote as u8;

        let mut checksum = 0u8;
        for b in &frame {
            checksum = checksum ^ b ^ (b >> 4);
        }
        frame[1] |= checksum & 0x0f;

        // Running XOR cipher; each byte folds in the already-obfuscated
        // predecessor.
        for i in 1..FRAME_LEN {
            frame[i] ^= frame[i - 1];
        }

        Self(frame)
    }

    /// The obfuscated wire bytes.
    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Undoes the obfuscation chain, recovering the pre-cipher bytes.
    ///
    /// The chain inverts by walking it backwards, from byte 6 down to 1.
    pub fn deobfuscate(&self) -> [u8; FRAME_LEN] {
        let mut clear = self.0;
        for i in (1..FRAME_LEN).rev() {
            clear[i] ^= clear[i - 1];
        }
        clear
    }

    /// Renders the frame once into `train`.
    ///
    /// `sync_count` selects the hardware-sync pair count; the value
    /// [`FIRST_FRAME_SYNC`] also prepends the wake-up pulse and its
    /// silence, which belong to the first frame of a burst only.
    ///
    /// # Errors
    /// [`PulseError::InvalidArgument`] if the train runs out of
    /// capacity; the train may then hold a partial rendering and should
    /// be discarded.
    pub fn write_pulses(&self, train: &mut PulseTrain, sync_count: u8) -> Result<(), PulseError> {
        if sync_count == FIRST_FRAME_SYNC {
            train.push(WAKEUP_HIGH_US, Level::High)?;
            train.push(WAKEUP_LOW_US, Level::Low)?;
        }

        for _ in 0..sync_count {
            train.push(HW_SYNC_US, Level::High)?;
            train.push(HW_SYNC_US, Level::Low)?;
        }

        train.push(SW_SYNC_HIGH_US, Level::High)?;
        train.push(SW_SYNC_LOW_US, Level::Low)?;

        // Data bits go out MSB first; a set bit leads with the low half.
        for i in 0..FRAME_BITS {
            let bit = (self.0[i / 8] >> (7 - (i % 8))) & 1;
            if bit == 1 {
                train.push(SYMBOL_US, Level::Low)?;
                train.push(SYMBOL_US, Level::High)?;
            } else {
                train.push(SYMBOL_US, Level::High)?;
                train.push(SYMBOL_US, Level::Low)?;
            }
        }

        train.push(FRAME_GAP_US, Level::Low)
    }

    /// Renders the full redundant transmission burst: the frame once
    /// with the wake-up preamble and twice more with the long sync.
    ///
    /// Receivers accept any one correctly-framed repetition, which is
    /// what makes a truncated burst tolerable.
    pub fn render_burst(&self) -> Result<PulseTrain, PulseError> {
        let mut train = PulseTrain::new();
        self.write_pulses(&mut train, FIRST_FRAME_SYNC)?;
        self.write_pulses(&mut train, REPEAT_FRAME_SYNC)?;
        self.write_pulses(&mut train, REPEAT_FRAME_SYNC)?;
        Ok(train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FIRST_FRAME_PULSES, REPEAT_FRAME_PULSES, TRAIN_MAX_PULSES};

    fn checksum_fold(bytes: &[u8; FRAME_LEN]) -> u8 {
        let mut acc = 0u8;
        for b in bytes {
            acc = acc ^ b ^ (b >> 4);
        }
        acc & 0x0f
    }

    #[test]
    fn build_is_deterministic() {
        let a = Frame::build(0x12_3456, Button::Down, 0x0102);
        let b = Frame::build(0x12_3456, Button::Down, 0x0102);
        assert_eq!(a, b);
    }

    #[test]
    fn marker_survives_obfuscation() {
        let frame = Frame::build(0xAB_CDEF, Button::Stop, 42);
        assert_eq!(frame.bytes()[0], FRAME_MARKER);
    }

    #[test]
    fn checksum_folds_to_zero_over_clear_frame() {
        // With the checksum nibble in place, the fold over the whole
        // pre-obfuscation frame must cancel out.
        let frame = Frame::build(0x10_0000, Button::Up, 16);
        let clear = frame.deobfuscate();
        assert_eq!(checksum_fold(&clear), 0);
    }

    #[test]
    fn deobfuscate_inverts_the_cipher_chain() {
        let frame = Frame::build(0x55_AA55, Button::Prog, 0xBEEF);
        let clear = frame.deobfuscate();
        // Re-apply the forward chain and compare with the wire bytes.
        let mut rebuilt = clear;
        for i in 1..FRAME_LEN {
            rebuilt[i] ^= rebuilt[i - 1];
        }
        assert_eq!(&rebuilt, frame.bytes());
        // Clear layout checks.
        assert_eq!(clear[0], FRAME_MARKER);
        assert_eq!(clear[1] >> 4, Button::Prog.flag());
        assert_eq!(u16::from_be_bytes([clear[2], clear[3]]), 0xBEEF);
        assert_eq!(clear[4], 0x55);
        assert_eq!(clear[5], 0xAA);
        assert_eq!(clear[6], 0x55);
    }

    #[test]
    fn any_single_input_change_alters_the_frame() {
        let base = Frame::build(0x10_0000, Button::Up, 16);
        for bit in 0..24 {
            let frame = Frame::build(0x10_0000 ^ (1 << bit), Button::Up, 16);
            assert_ne!(frame, base, "remote bit {bit}");
        }
        for bit in 0..16 {
            let frame = Frame::build(0x10_0000, Button::Up, 16 ^ (1 << bit));
            assert_ne!(frame, base, "code bit {bit}");
        }
        for button in [Button::Stop, Button::Down, Button::Prog] {
            assert_ne!(Frame::build(0x10_0000, button, 16), base);
        }
    }

    #[test]
    fn first_frame_train_shape() {
        let frame = Frame::build(0x01_0203, Button::Up, 7);
        let mut train = PulseTrain::new();
        frame.write_pulses(&mut train, FIRST_FRAME_SYNC).unwrap();
        let pulses = train.as_slice();
        assert_eq!(pulses.len(), FIRST_FRAME_PULSES);

        // Wake-up preamble.
        assert_eq!(pulses[0].duration_us(), WAKEUP_HIGH_US);
        assert_eq!(pulses[0].level(), Level::High);
        assert_eq!(pulses[1].duration_us(), WAKEUP_LOW_US);
        assert_eq!(pulses[1].level(), Level::Low);

        // Two hardware-sync pairs.
        for pair in 0..2 {
            let high = pulses[2 + 2 * pair];
            let low = pulses[3 + 2 * pair];
            assert_eq!((high.duration_us(), high.level()), (HW_SYNC_US, Level::High));
            assert_eq!((low.duration_us(), low.level()), (HW_SYNC_US, Level::Low));
        }

        // Software sync.
        assert_eq!(pulses[6].duration_us(), SW_SYNC_HIGH_US);
        assert_eq!(pulses[7].duration_us(), SW_SYNC_LOW_US);

        // 112 data pulses, all one symbol wide.
        for p in &pulses[8..8 + 2 * FRAME_BITS] {
            assert_eq!(p.duration_us(), SYMBOL_US);
        }

        // Trailing silence.
        let last = pulses[pulses.len() - 1];
        assert_eq!((last.duration_us(), last.level()), (FRAME_GAP_US, Level::Low));
    }

    #[test]
    fn repeat_frame_train_shape() {
        let frame = Frame::build(0x01_0203, Button::Up, 7);
        let mut train = PulseTrain::new();
        frame.write_pulses(&mut train, REPEAT_FRAME_SYNC).unwrap();
        let pulses = train.as_slice();
        assert_eq!(pulses.len(), REPEAT_FRAME_PULSES);
        // No wake-up: the train opens straight on hardware sync.
        assert_eq!(pulses[0].duration_us(), HW_SYNC_US);
        // Seven sync pairs before software sync.
        assert_eq!(pulses[14].duration_us(), SW_SYNC_HIGH_US);
    }

    #[test]
    fn data_bits_follow_manchester_polarity() {
        let frame = Frame::build(0, Button::Stop, 0);
        let mut train = PulseTrain::new();
        frame.write_pulses(&mut train, REPEAT_FRAME_SYNC).unwrap();
        let data = &train.as_slice()[16..16 + 2 * FRAME_BITS];
        for (i, halves) in data.chunks(2).enumerate() {
            let bit = (frame.bytes()[i / 8] >> (7 - (i % 8))) & 1;
            if bit == 1 {
                assert_eq!(halves[0].level(), Level::Low, "bit {i}");
                assert_eq!(halves[1].level(), Level::High, "bit {i}");
            } else {
                assert_eq!(halves[0].level(), Level::High, "bit {i}");
                assert_eq!(halves[1].level(), Level::Low, "bit {i}");
            }
        }
    }

    #[test]
    fn burst_fills_the_train_exactly() {
        let frame = Frame::build(0xFE_DCBA, Button::Down, 0xFFFF);
        let train = frame.render_burst().unwrap();
        assert_eq!(train.len(), TRAIN_MAX_PULSES);
    }

    #[test]
    fn button_flags_round_trip() {
        for button in [Button::Stop, Button::Up, Button::Down, Button::Prog] {
            assert_eq!(Button::from_flag(button.flag()), Some(button));
        }
        assert_eq!(Button::from_flag(0), None);
        assert_eq!(Button::from_flag(3), None);
    }
}
