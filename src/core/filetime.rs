//! Windows FILETIME timestamps
//!
//! 100-nanosecond ticks since 1601-01-01 00:00:00 UTC, the unit used by
//! the cell record and by `TimeStamp` values.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const TICKS_PER_SECOND: u64 = 10_000_000;
const NANOS_PER_TICK: u32 = 100;

/// Seconds between 1601-01-01 and 1970-01-01
const EPOCH_DIFFERENCE_SECONDS: i64 = 11_644_473_600;

const TEXT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FileTime(pub u64);

impl FileTime {
    pub const ZERO: FileTime = FileTime(0);

    /// Current system time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now()).unwrap_or(FileTime::ZERO)
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// `None` before 1601
    pub fn from_datetime(time: DateTime<Utc>) -> Option<Self> {
        let seconds = u64::try_from(time.timestamp() + EPOCH_DIFFERENCE_SECONDS).ok()?;
        let ticks = seconds
            .checked_mul(TICKS_PER_SECOND)?
            .checked_add((time.timestamp_subsec_nanos() / NANOS_PER_TICK) as u64)?;
        Some(FileTime(ticks))
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let seconds = (self.0 / TICKS_PER_SECOND) as i64 - EPOCH_DIFFERENCE_SECONDS;
        let nanos = (self.0 % TICKS_PER_SECOND) as u32 * NANOS_PER_TICK;
        DateTime::from_timestamp(seconds, nanos)
    }

    /// From seconds since 1970-01-01
    pub fn from_unix_seconds(seconds: u64) -> Option<Self> {
        seconds
            .checked_add(EPOCH_DIFFERENCE_SECONDS as u64)?
            .checked_mul(TICKS_PER_SECOND)
            .map(FileTime)
    }

    /// Parse `YYYY-MM-DD hh:mm:ss[.fff]` (UTC); a `T` separator is accepted too
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        TEXT_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .and_then(|naive| Self::from_datetime(naive.and_utc()))
    }
}

impl From<u64> for FileTime {
    fn from(ticks: u64) -> Self {
        FileTime(ticks)
    }
}

impl fmt::Display for FileTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S%.3f")),
            None => write!(f, "#{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unix_epoch() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let time = FileTime::from_datetime(epoch).unwrap();
        assert_eq!(time.ticks(), 116_444_736_000_000_000);
        assert_eq!(time.to_datetime(), Some(epoch));
        assert_eq!(FileTime::from_unix_seconds(0), Some(time));
    }

    #[test]
    fn test_before_1601() {
        let early = Utc.with_ymd_and_hms(1600, 12, 31, 23, 59, 59).unwrap();
        assert!(FileTime::from_datetime(early).is_none());
    }

    #[test]
    fn test_display_and_parse() {
        let time = FileTime::parse("2024-03-05 07:08:09.123").unwrap();
        assert_eq!(time.to_string(), "2024-03-05 07:08:09.123");
        assert_eq!(FileTime::parse("2024-03-05T07:08:09.123"), Some(time));
        assert_eq!(FileTime::parse("2024-03-05 07:08:09").unwrap().to_string(), "2024-03-05 07:08:09.000");
        assert!(FileTime::parse("yesterday").is_none());
    }

    #[test]
    fn test_now_is_recent() {
        let now = FileTime::now();
        let y2020 = FileTime::parse("2020-01-01 00:00:00").unwrap();
        assert!(now > y2020);
    }

    #[test]
    fn test_zero_is_1601() {
        assert_eq!(FileTime::ZERO.to_string(), "1601-01-01 00:00:00.000");
    }
}
