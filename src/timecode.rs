/*!
 * SMPTE time expression conversion.
 *
 * Converts TTML time expressions (`"12.5s"`, `"01:02:03:04"`, ...) into
 * absolute milliseconds for one of six fixed frame-rate profiles.
 *
 * All arithmetic runs on exact rationals over a 90 kHz tick clock; the only
 * rounding step is the final truncating division from ticks to milliseconds
 * (plus the frame ceiling of the film-sync profile). Long caption files
 * therefore never accumulate floating-point drift.
 */

use std::fmt;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::TimeExpressionError;

// @const: Offset form, a decimal number followed by a unit suffix
static OFFSET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]*)?|\.[0-9]+)(ms|h|m|s|f)$").unwrap()
});

/// Ticks per millisecond on the 90 kHz clock
const TICKS_PER_MS: u128 = 90;

/// Frame-rate bucket used when the document does not say otherwise
const DEFAULT_NOMINAL_RATE: u64 = 30;

/// Longest fractional part accepted in a numeric field
const MAX_FRACTION_DIGITS: usize = 18;

/// SMPTE drop mode declared on the document root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropMode {
    /// NTSC drop-frame counting
    DropNtsc,
    /// PAL drop-frame counting
    DropPal,
    /// Plain frame counting
    NonDrop,
}

impl DropMode {
    /// Parse the raw `dropMode` attribute. Unknown or missing values count as non-drop.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("dropNTSC") => Self::DropNtsc,
            Some("dropPAL") => Self::DropPal,
            _ => Self::NonDrop,
        }
    }
}

/// One of the six frame-rate conventions a caption document can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRateProfile {
    /// 23.976 fps film sync
    FilmSync23976,
    /// 24 fps
    Fps24,
    /// 25 fps PAL
    Fps25,
    /// 29.97 fps NTSC drop frame
    DropFrame2997,
    /// 29.97 fps NTSC non-drop
    NonDrop2997,
    /// 30 fps
    #[default]
    Fps30,
}

impl FrameRateProfile {
    /// All profiles, in ascending frame-rate order
    pub const ALL: [FrameRateProfile; 6] = [
        Self::FilmSync23976,
        Self::Fps24,
        Self::Fps25,
        Self::DropFrame2997,
        Self::NonDrop2997,
        Self::Fps30,
    ];

    /// Pick the profile for a document from its raw root attributes.
    ///
    /// Drop-frame documents always use the 29.97 drop profile. Otherwise the
    /// nominal rate (default 30) is scaled by the `"num den"` multiplier
    /// (default `1 1`) and floored into a bucket.
    pub fn select(drop_mode: Option<&str>, frame_rate: Option<&str>, multiplier: Option<&str>) -> Self {
        match DropMode::parse(drop_mode) {
            DropMode::DropNtsc | DropMode::DropPal => Self::DropFrame2997,
            DropMode::NonDrop => {
                let nominal = parse_nominal_rate(frame_rate);
                let (numerator, denominator) = parse_multiplier(multiplier);
                let effective = nominal.saturating_mul(numerator) / denominator;
                Self::from_rate_bucket(effective)
            }
        }
    }

    /// Map a floored integer frame rate to its profile
    pub fn from_rate_bucket(rate: u64) -> Self {
        match rate {
            23 => Self::FilmSync23976,
            24 => Self::Fps24,
            25 | 50 => Self::Fps25,
            29 | 59 => Self::NonDrop2997,
            30 | 60 => Self::Fps30,
            _ => Self::Fps30,
        }
    }

    /// Human readable name
    pub fn description(&self) -> &'static str {
        match self {
            Self::FilmSync23976 => "23.976 fps (film sync)",
            Self::Fps24 => "24 fps",
            Self::Fps25 => "25 fps (PAL)",
            Self::DropFrame2997 => "29.97 fps drop frame (NTSC)",
            Self::NonDrop2997 => "29.97 fps non-drop (NTSC)",
            Self::Fps30 => "30 fps",
        }
    }

    // @returns: Exact 90 kHz tick count for the given clock fields
    fn ticks(&self, fields: &ClockFields) -> Option<Ratio> {
        let ClockFields { hours, minutes, seconds, frames } = *fields;
        // s + 60 * (m + 60 * h)
        let total_seconds = seconds.checked_add(minutes.checked_add(hours.checked_mul(60)?)?.checked_mul(60)?)?;

        match self {
            Self::FilmSync23976 => {
                // 3753.75 ticks per frame, rounded up before the seconds are added
                let frame_ticks = Ratio::integer(frames.checked_mul(15015)?.checked_div(4)?.ceil());
                frame_ticks.checked_add(total_seconds.checked_mul(90090)?)
            }
            Self::Fps24 => frames.checked_mul(3750)?.checked_add(total_seconds.checked_mul(90000)?),
            Self::Fps25 => frames.checked_mul(3600)?.checked_add(total_seconds.checked_mul(90000)?),
            Self::DropFrame2997 => frames
                .checked_mul(3003)?
                .checked_add(seconds.checked_mul(90090)?)?
                .checked_add(minutes.checked_mul(26999973)?.checked_div(5)?)?
                .checked_add(hours.checked_mul(323999676)?),
            Self::NonDrop2997 => frames.checked_mul(3003)?.checked_add(total_seconds.checked_mul(90090)?),
            Self::Fps30 => frames.checked_mul(3000)?.checked_add(total_seconds.checked_mul(90000)?),
        }
    }
}

impl fmt::Display for FrameRateProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Convert a time expression to absolute milliseconds under the given profile
pub fn convert(expression: &str, profile: FrameRateProfile) -> Result<u64, TimeExpressionError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(TimeExpressionError::Empty);
    }

    let fields = ClockFields::parse(expression)?;
    let ticks = profile
        .ticks(&fields)
        .ok_or_else(|| TimeExpressionError::Overflow(expression.to_string()))?;

    let millis = ticks
        .checked_div(TICKS_PER_MS)
        .map(Ratio::floor)
        .ok_or_else(|| TimeExpressionError::Overflow(expression.to_string()))?;

    u64::try_from(millis).map_err(|_| TimeExpressionError::Overflow(expression.to_string()))
}

/// Lenient conversion: logs the failure and yields 0 ms
pub fn convert_or_zero(expression: &str, profile: FrameRateProfile) -> u64 {
    match convert(expression, profile) {
        Ok(ms) => ms,
        Err(e) => {
            warn!("{}, using 0 ms", e);
            0
        }
    }
}

/// Format milliseconds as `HH:MM:SS.mmm`
pub fn format_clock(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

// @struct: Parsed hour/minute/second/frame fields of a time expression
#[derive(Debug, Clone, Copy)]
struct ClockFields {
    hours: Ratio,
    minutes: Ratio,
    seconds: Ratio,
    frames: Ratio,
}

impl ClockFields {
    fn parse(expression: &str) -> Result<Self, TimeExpressionError> {
        let mut fields = ClockFields {
            hours: Ratio::ZERO,
            minutes: Ratio::ZERO,
            seconds: Ratio::ZERO,
            frames: Ratio::ZERO,
        };

        if let Some(caps) = OFFSET_REGEX.captures(expression) {
            let value = parse_decimal(expression, &caps[1])?;
            match &caps[2] {
                "h" => fields.hours = value,
                "m" => fields.minutes = value,
                "s" => fields.seconds = value,
                "f" => fields.frames = value,
                "ms" => {
                    fields.seconds = value
                        .checked_div(1000)
                        .ok_or_else(|| TimeExpressionError::Overflow(expression.to_string()))?
                }
                _ => return Err(TimeExpressionError::Malformed(expression.to_string())),
            }
            return Ok(fields);
        }

        let parts: Vec<&str> = expression.split(':').collect();
        match parts.len() {
            3 | 4 => {
                fields.hours = parse_decimal(expression, parts[0])?;
                fields.minutes = parse_decimal(expression, parts[1])?;
                fields.seconds = parse_decimal(expression, parts[2])?;
                if let Some(frames) = parts.get(3) {
                    fields.frames = parse_decimal(expression, frames)?;
                }
                Ok(fields)
            }
            _ => Err(TimeExpressionError::Malformed(expression.to_string())),
        }
    }
}

// @parses: Non-negative decimal string into an exact rational
fn parse_decimal(expression: &str, field: &str) -> Result<Ratio, TimeExpressionError> {
    let invalid = || TimeExpressionError::InvalidField {
        expr: expression.to_string(),
        field: field.to_string(),
    };

    let field = field.trim();
    let (whole, fraction) = match field.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (field, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > MAX_FRACTION_DIGITS {
        return Err(invalid());
    }

    let digits = format!("{}{}", whole, fraction);
    let numerator: u128 = digits
        .parse()
        .map_err(|_| TimeExpressionError::Overflow(expression.to_string()))?;
    let denominator = 10u128.pow(fraction.len() as u32);

    Ok(Ratio::new(numerator, denominator))
}

fn parse_nominal_rate(raw: Option<&str>) -> u64 {
    match raw.map(str::trim) {
        None => DEFAULT_NOMINAL_RATE,
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!("Invalid frameRate \"{}\", assuming {}", value, DEFAULT_NOMINAL_RATE);
            DEFAULT_NOMINAL_RATE
        }),
    }
}

fn parse_multiplier(raw: Option<&str>) -> (u64, u64) {
    let Some(value) = raw else {
        return (1, 1);
    };

    let parts: Vec<&str> = value.split_whitespace().collect();
    if let [numerator, denominator] = parts.as_slice() {
        if let (Ok(n), Ok(d)) = (numerator.parse::<u64>(), denominator.parse::<u64>()) {
            if d != 0 {
                return (n, d);
            }
        }
    }

    warn!("Invalid frameRateMultiplier \"{}\", assuming 1 1", value);
    (1, 1)
}

/// Exact non-negative rational used for tick arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ratio {
    num: u128,
    den: u128,
}

impl Ratio {
    const ZERO: Ratio = Ratio { num: 0, den: 1 };

    fn new(num: u128, den: u128) -> Self {
        let divisor = gcd(num, den).max(1);
        Ratio {
            num: num / divisor,
            den: den / divisor,
        }
    }

    fn integer(value: u128) -> Self {
        Ratio { num: value, den: 1 }
    }

    fn checked_add(self, other: Ratio) -> Option<Ratio> {
        let num = self
            .num
            .checked_mul(other.den)?
            .checked_add(other.num.checked_mul(self.den)?)?;
        let den = self.den.checked_mul(other.den)?;
        Some(Ratio::new(num, den))
    }

    fn checked_mul(self, factor: u128) -> Option<Ratio> {
        // reduce against the denominator first to keep the numerator small
        let divisor = gcd(factor, self.den).max(1);
        let num = self.num.checked_mul(factor / divisor)?;
        Some(Ratio::new(num, self.den / divisor))
    }

    fn checked_div(self, divisor: u128) -> Option<Ratio> {
        if divisor == 0 {
            return None;
        }
        let common = gcd(self.num, divisor).max(1);
        let den = self.den.checked_mul(divisor / common)?;
        Some(Ratio::new(self.num / common, den))
    }

    fn floor(self) -> u128 {
        self.num / self.den
    }

    fn ceil(self) -> u128 {
        self.num / self.den + u128::from(self.num % self.den != 0)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
