//! ## nostime-core::time
//! **Tick arithmetic and canonical second/nanosecond values**
//!
//! All conversions use truncating integer arithmetic so that every port of
//! the flight software computes bit-identical times from the same tick
//! count. Intermediate products are widened to `u128`; nothing here can
//! overflow silently.

use std::fmt;
use std::num::NonZeroU64;
use std::ops::{Add, Sub};
use std::time::Duration;

use crate::error::{TimeError, TimeResult};

pub const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_SEC_WIDE: u128 = NANOS_PER_SEC as u128;

/// How a requested time is interpreted by sleeps and timer arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// Offset from the current virtual time.
    #[default]
    Relative,
    /// Absolute virtual time.
    Absolute,
}

/// Ticks per second of the virtual clock.
///
/// Bounded to `1..=1_000_000_000` so one tick always lasts at least one
/// nanosecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickRate(NonZeroU64);

impl TickRate {
    pub const MAX: u64 = NANOS_PER_SEC as u64;

    pub fn new(ticks_per_second: u64) -> TimeResult<Self> {
        if ticks_per_second > Self::MAX {
            return Err(TimeError::invalid(format!(
                "tick rate {ticks_per_second} exceeds {} ticks per second",
                Self::MAX
            )));
        }
        NonZeroU64::new(ticks_per_second)
            .map(Self)
            .ok_or_else(|| TimeError::invalid("tick rate must be positive"))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Duration of one tick, truncated to whole nanoseconds.
    ///
    /// This is a lower bound whenever the rate does not divide one billion.
    pub fn resolution(self) -> TimeValue {
        TimeValue::canonical(0, NANOS_PER_SEC / self.get() as i64)
    }
}

impl fmt::Display for TickRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.get())
    }
}

/// A `(seconds, nanoseconds)` pair.
///
/// Values crossing the public boundary satisfy `seconds >= 0` and
/// `0 <= nanoseconds < 1e9` (see [`TimeValue::validate`]). Differences are
/// produced with [`TimeValue::canonical`], which keeps the nanosecond field in
/// range but may leave `seconds` negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeValue {
    seconds: i64,
    nanoseconds: i64,
}

impl TimeValue {
    pub const ZERO: TimeValue = TimeValue {
        seconds: 0,
        nanoseconds: 0,
    };

    /// Builds a boundary value, rejecting anything not already normalized.
    pub fn new(seconds: i64, nanoseconds: i64) -> TimeResult<Self> {
        let value = Self {
            seconds,
            nanoseconds,
        };
        value.validate()?;
        Ok(value)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::from(Duration::from_millis(millis))
    }

    /// Carries or borrows an out-of-range nanosecond field into seconds.
    pub fn canonical(seconds: i64, nanoseconds: i64) -> Self {
        Self {
            seconds: seconds.saturating_add(nanoseconds.div_euclid(NANOS_PER_SEC)),
            nanoseconds: nanoseconds.rem_euclid(NANOS_PER_SEC),
        }
    }

    pub fn canonicalize(self) -> Self {
        Self::canonical(self.seconds, self.nanoseconds)
    }

    pub fn is_canonical(&self) -> bool {
        (0..NANOS_PER_SEC).contains(&self.nanoseconds)
    }

    /// Boundary check: non-negative seconds, nanoseconds in `[0, 1e9)`.
    pub fn validate(&self) -> TimeResult<()> {
        if self.seconds < 0 {
            return Err(TimeError::invalid(format!(
                "negative seconds: {}",
                self.seconds
            )));
        }
        if !self.is_canonical() {
            return Err(TimeError::invalid(format!(
                "nanoseconds out of range: {}",
                self.nanoseconds
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.nanoseconds == 0
    }

    #[inline]
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    #[inline]
    pub fn nanoseconds(&self) -> i64 {
        self.nanoseconds
    }

    /// `seconds = ticks / rate`, `nanoseconds = (ticks % rate) * 1e9 / rate`.
    ///
    /// Only a rate of 1 can push `seconds` past `i64::MAX` (ticks above
    /// `i64::MAX`); the seconds then saturate, so such values do not round
    /// trip through [`TimeValue::to_ticks`].
    pub fn from_ticks(ticks: u64, rate: TickRate) -> Self {
        let rate = rate.get();
        let nanoseconds = u128::from(ticks % rate) * NANOS_PER_SEC_WIDE / u128::from(rate);
        Self {
            seconds: i64::try_from(ticks / rate).unwrap_or(i64::MAX),
            // < 1e9 because ticks % rate < rate
            nanoseconds: nanoseconds as i64,
        }
    }

    /// `seconds * rate + nanoseconds * rate / 1e9`, truncating.
    pub fn to_ticks(self, rate: TickRate) -> TimeResult<u64> {
        self.validate()?;
        let rate = u128::from(rate.get());
        let ticks =
            self.seconds as u128 * rate + self.nanoseconds as u128 * rate / NANOS_PER_SEC_WIDE;
        u64::try_from(ticks)
            .map_err(|_| TimeError::invalid(format!("{self} overflows the tick counter")))
    }

    /// Host duration for this value; negative values map to zero.
    pub fn as_duration(self) -> Duration {
        if self.seconds < 0 {
            return Duration::ZERO;
        }
        Duration::new(self.seconds as u64, self.nanoseconds as u32)
    }
}

impl From<Duration> for TimeValue {
    fn from(duration: Duration) -> Self {
        Self {
            seconds: i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
            nanoseconds: i64::from(duration.subsec_nanos()),
        }
    }
}

impl Add for TimeValue {
    type Output = TimeValue;

    fn add(self, rhs: TimeValue) -> TimeValue {
        TimeValue::canonical(
            self.seconds.saturating_add(rhs.seconds),
            self.nanoseconds + rhs.nanoseconds,
        )
    }
}

impl Sub for TimeValue {
    type Output = TimeValue;

    fn sub(self, rhs: TimeValue) -> TimeValue {
        TimeValue::canonical(
            self.seconds.saturating_sub(rhs.seconds),
            self.nanoseconds - rhs.nanoseconds,
        )
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.canonicalize();
        if value.seconds < 0 && value.nanoseconds > 0 {
            write!(
                f,
                "-{}.{:09}s",
                -(value.seconds + 1),
                NANOS_PER_SEC - value.nanoseconds
            )
        } else {
            write!(f, "{}.{:09}s", value.seconds, value.nanoseconds)
        }
    }
}
