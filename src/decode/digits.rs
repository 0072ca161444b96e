//! Board digit encoding and board status codes
//!
//! Each decimal digit is shown on four LEDs using a fixed pattern table that
//! is not binary-coded decimal. A handful of whole-board patterns signal
//! status instead of time.

use crate::io::configuration::{LED_COUNT, LEDS_PER_DIGIT};
use bitvec::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Digit shown by each 4-LED pattern, indexed by the pattern read MSB first
const DIGIT_CODES: [Option<u8>; 16] = [
    Some(0), // 0000
    Some(1), // 0001
    Some(2), // 0010
    Some(5), // 0011
    Some(3), // 0100
    None,    // 0101
    Some(6), // 0110
    Some(8), // 0111
    Some(4), // 1000
    None,    // 1001
    None,    // 1010
    None,    // 1011
    Some(7), // 1100
    None,    // 1101
    None,    // 1110
    Some(9), // 1111
];

/// LED pattern for each digit, the inverse of [`DIGIT_CODES`]
const DIGIT_PATTERNS: [u8; 10] = [
    0b0000, 0b0001, 0b0010, 0b0100, 0b1000, 0b0011, 0b0110, 0b1100, 0b0111, 0b1111,
];

/// Non-time states the board reports through fixed LED patterns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    /// All LEDs dark
    PoweredOff,
    /// Internal oscillator drifted beyond tolerance
    ClockDrift,
    /// Satellite time reference lost
    GnssLost,
    /// Startup stage: waiting for a satellite fix
    WaitingForFix,
    /// Startup stage: measuring internal clock drift
    MeasuringDrift,
    /// Startup stage: setup complete
    SetupFinished,
}

/// Status patterns as 20-bit words, LED 0 in the most significant bit
const BOARD_STATUS_CODES: [(u32, BoardStatus); 6] = [
    (0b0000_0000_0000_0000_0000, BoardStatus::PoweredOff),
    (0b1010_0000_0000_0000_0000, BoardStatus::ClockDrift),
    (0b1010_1000_0000_0000_0000, BoardStatus::GnssLost),
    (0b1010_1010_0000_0000_0000, BoardStatus::WaitingForFix),
    (0b1010_1010_1000_0000_0000, BoardStatus::MeasuringDrift),
    (0b1010_1010_1010_0000_0000, BoardStatus::SetupFinished),
];

impl BoardStatus {
    /// Every status pattern the board can show
    pub const ALL: [Self; 6] = [
        Self::PoweredOff,
        Self::ClockDrift,
        Self::GnssLost,
        Self::WaitingForFix,
        Self::MeasuringDrift,
        Self::SetupFinished,
    ];

    /// Match a full 20-LED vector against the status table, exact match only
    pub fn from_bits(bits: &BitSlice) -> Option<Self> {
        if bits.len() != LED_COUNT {
            return None;
        }
        let word = pack_msb_first(bits);
        BOARD_STATUS_CODES
            .iter()
            .find(|(code, _)| *code == word)
            .map(|&(_, status)| status)
    }

    /// The 20-LED pattern for this status
    pub fn bits(self) -> BitVec {
        let word = BOARD_STATUS_CODES
            .iter()
            .find(|(_, status)| *status == self)
            .map_or(0, |&(code, _)| code);
        (0..LED_COUNT)
            .map(|led| (word >> (LED_COUNT - 1 - led)) & 1 == 1)
            .collect()
    }

    /// Human-readable description shown to operators
    pub const fn message(self) -> &'static str {
        match self {
            Self::PoweredOff => "Powered off",
            Self::ClockDrift => "Internal clock drift too large",
            Self::GnssLost => "GNSS signal lost",
            Self::WaitingForFix => "Initial setup - waiting for GNSS fix",
            Self::MeasuringDrift => "Initial setup - measuring internal clock drift",
            Self::SetupFinished => "Initial setup - finished",
        }
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A time value read from one sensor row
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecodedValue {
    /// Decimal seconds modulo 10 as shown on the board, e.g. `"5.2344"`
    pub value: String,
    /// Power of ten of the last trustworthy digit (`-4` = 0.1 ms)
    #[serde(rename = "err")]
    pub resolution: i32,
    /// Number of LEDs observed in the row
    pub led_count: usize,
    /// Undecoded LED states after the first invalid digit, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsb: Option<String>,
    #[serde(skip)]
    seconds: f64,
}

impl DecodedValue {
    /// Build from decoded digits, ones-of-seconds first
    pub fn from_digits(digits: &[u8], resolution: i32, led_count: usize) -> Self {
        let mut value = String::with_capacity(digits.len() + 1);
        let mut seconds = 0.0;
        let mut scale = 1.0;
        for (position, &digit) in digits.iter().enumerate() {
            if position == 1 {
                value.push('.');
            }
            value.push(char::from(b'0' + digit));
            seconds = f64::from(digit).mul_add(scale, seconds);
            scale /= 10.0;
        }

        Self {
            value,
            resolution,
            led_count,
            lsb: None,
            seconds,
        }
    }

    /// Decoded value in seconds within `[0, 10)`
    pub const fn seconds(&self) -> f64 {
        self.seconds
    }
}

/// Decoded rows keyed by sensor row, ascending
pub type TimedRowTable = BTreeMap<usize, DecodedValue>;

/// Outcome of decoding one row of LED states
#[derive(Clone, Debug, PartialEq)]
pub enum RowDecode {
    /// The row shows a time value
    Time(DecodedValue),
    /// The row shows a board status pattern
    Status(BoardStatus),
    /// The leading digit is not a valid pattern
    Undecodable {
        /// LED states of the row as `0`/`1` text
        bits: String,
    },
}

/// Decode one 4-LED group, `None` for patterns outside the table
pub fn decode_digit(group: &BitSlice) -> Option<u8> {
    if group.len() != LEDS_PER_DIGIT {
        return None;
    }
    DIGIT_CODES
        .get(pack_msb_first(group) as usize)
        .copied()
        .flatten()
}

/// LED pattern for a decimal digit
pub fn encode_digit(digit: u8) -> Option<BitVec> {
    let pattern = DIGIT_PATTERNS.get(usize::from(digit))?;
    Some(
        (0..LEDS_PER_DIGIT)
            .map(|led| (*pattern >> (LEDS_PER_DIGIT - 1 - led)) & 1 == 1)
            .collect(),
    )
}

/// LED vector for a sequence of digits, ones-of-seconds first
pub fn encode_digits(digits: &[u8]) -> Option<BitVec> {
    let mut bits = BitVec::with_capacity(digits.len() * LEDS_PER_DIGIT);
    for &digit in digits {
        bits.extend_from_bitslice(&encode_digit(digit)?);
    }
    Some(bits)
}

/// Full 20-LED vector for a clock reading in units of 10^-4 s
pub fn encode_ticks(ticks: u32) -> BitVec {
    let ticks = ticks % 100_000;
    let digits: Vec<u8> = (0..5)
        .rev()
        .map(|power| (ticks / 10_u32.pow(power) % 10) as u8)
        .collect();
    encode_digits(&digits).unwrap_or_else(|| bitvec![0; LED_COUNT])
}

/// Render LED states as `0`/`1` text
pub fn bits_to_string(bits: &BitSlice) -> String {
    bits.iter()
        .by_vals()
        .map(|on| if on { '1' } else { '0' })
        .collect()
}

/// Decode the LED states of one row into a clock value
///
/// The row is padded with dark LEDs to the full board width. Digits are read
/// four LEDs at a time until the first invalid group or the end of the
/// observed LEDs. The resolution is the power of ten of the last digit read,
/// never finer than the exposure time can resolve.
pub fn decode_row(leds: &BitSlice, exposure_time: f64) -> RowDecode {
    let led_count = leds.len().min(LED_COUNT);
    let mut padded = bitvec![0; LED_COUNT];
    if let (Some(target), Some(source)) = (padded.get_mut(..led_count), leds.get(..led_count)) {
        target.copy_from_bitslice(source);
    }

    if let Some(status) = BoardStatus::from_bits(&padded) {
        return RowDecode::Status(status);
    }

    let observed_groups = led_count.div_ceil(LEDS_PER_DIGIT);
    let mut digits = Vec::with_capacity(observed_groups);
    let mut lsb = None;
    for (index, group) in padded
        .chunks_exact(LEDS_PER_DIGIT)
        .take(observed_groups)
        .enumerate()
    {
        if let Some(digit) = decode_digit(group) {
            digits.push(digit);
        } else {
            lsb = leds.get(index * LEDS_PER_DIGIT..).map(bits_to_string);
            break;
        }
    }

    if digits.is_empty() {
        return RowDecode::Undecodable {
            bits: bits_to_string(leds),
        };
    }

    let mut resolution = 1 - digits.len() as i32;
    if let Some(bound) = resolution_bound(exposure_time) {
        if resolution < bound {
            resolution = bound;
            let keep = usize::try_from(1 - bound).unwrap_or(1).max(1);
            digits.truncate(keep);
        }
    }

    let mut value = DecodedValue::from_digits(&digits, resolution, leds.len());
    value.lsb = lsb;
    RowDecode::Time(value)
}

/// Finest resolution an exposure of `exposure_time` seconds can justify
pub fn resolution_bound(exposure_time: f64) -> Option<i32> {
    (exposure_time.is_finite() && exposure_time > 0.0)
        .then(|| exposure_time.log10().floor() as i32)
}

fn pack_msb_first(bits: &BitSlice) -> u32 {
    bits.iter()
        .by_vals()
        .fold(0, |word, on| (word << 1) | u32::from(on))
}
