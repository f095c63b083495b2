// src/io/serial/utils.rs
//
// Frame format parsing and conversion to the serialport crate's types.

use serialport::{DataBits, Parity as SpParity, StopBits};
use std::fmt;
use std::str::FromStr;

use crate::error::SettingsError;

// ============================================================================
// Types
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

/// Character framing, written the usual way as e.g. `8N1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for FrameFormat {
    fn default() -> Self {
        FrameFormat {
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

impl FromStr for FrameFormat {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SettingsError::Framing(s.to_string());
        let chars: Vec<char> = s.trim().chars().collect();
        if chars.len() != 3 {
            return Err(err());
        }

        let data_bits = match chars[0] {
            '5' => 5,
            '6' => 6,
            '7' => 7,
            '8' => 8,
            _ => return Err(err()),
        };
        let parity = match chars[1].to_ascii_uppercase() {
            'N' => Parity::None,
            'O' => Parity::Odd,
            'E' => Parity::Even,
            _ => return Err(err()),
        };
        let stop_bits = match chars[2] {
            '1' => 1,
            '2' => 2,
            _ => return Err(err()),
        };

        Ok(FrameFormat {
            data_bits,
            parity,
            stop_bits,
        })
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.data_bits, self.parity.letter(), self.stop_bits)
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our Parity enum to serialport crate's Parity type
pub fn to_serialport_parity(p: Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Convert data bits count to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

// ============================================================================
// Tests
// ============================================================================
