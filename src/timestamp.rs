//! MS-DOS timestamps for archive entries.
//!
//! ZIP headers store modification times as a pair of 16-bit MS-DOS date and
//! time words with two-second resolution, covering 1980 through 2107. Every
//! entry of an archive written by this crate carries the same configured
//! timestamp so that identical inputs produce identical bytes.
//!
//! # Example
//!
//! ```rust
//! use parzip::DosDateTime;
//!
//! let ts = DosDateTime::default();
//! assert_eq!(ts.year(), 2008);
//! assert_eq!(ts.datepart(), 0x3821);
//! assert_eq!(ts.timepart(), 0);
//! ```

use crate::{Error, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// A date and time in MS-DOS format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DosDateTime {
    date: u16,
    time: u16,
}

impl DosDateTime {
    /// 2008-01-01 00:00:00, the timestamp given to every entry by default.
    ///
    /// Matches the value `jar`-compatible tooling uses for reproducible output.
    pub const DEFAULT: DosDateTime = DosDateTime {
        date: ((2008 - 1980) << 9) | (1 << 5) | 1,
        time: 0,
    };

    /// Builds a timestamp from calendar fields.
    ///
    /// Seconds are rounded down to an even value.
    pub fn from_parts(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self> {
        if !(1980..=2107).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(Error::InvalidDateTime(format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self {
            date: ((year - 1980) << 9) | (u16::from(month) << 5) | u16::from(day),
            time: (u16::from(hour) << 11) | (u16::from(minute) << 5) | u16::from(second / 2),
        })
    }

    /// Converts seconds since the Unix epoch (UTC) to a DOS timestamp.
    pub fn from_unix_secs(secs: i64) -> Result<Self> {
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let rem = secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        let year = u16::try_from(year)
            .map_err(|_| Error::InvalidDateTime(format!("unix time {secs}")))?;
        Self::from_parts(
            year,
            month,
            day,
            (rem / 3600) as u8,
            (rem % 3600 / 60) as u8,
            (rem % 60) as u8,
        )
    }

    /// Builds a timestamp from raw header words.
    pub const fn from_raw(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Raw date word, as stored in headers.
    pub const fn datepart(&self) -> u16 {
        self.date
    }

    /// Raw time word, as stored in headers.
    pub const fn timepart(&self) -> u16 {
        self.time
    }

    /// Calendar year.
    pub const fn year(&self) -> u16 {
        (self.date >> 9) + 1980
    }

    /// Month, 1 through 12.
    pub const fn month(&self) -> u8 {
        ((self.date >> 5) & 0x0f) as u8
    }

    /// Day of month.
    pub const fn day(&self) -> u8 {
        (self.date & 0x1f) as u8
    }

    /// Hour of day.
    pub const fn hour(&self) -> u8 {
        (self.time >> 11) as u8
    }

    /// Minute.
    pub const fn minute(&self) -> u8 {
        ((self.time >> 5) & 0x3f) as u8
    }

    /// Second, always even.
    pub const fn second(&self) -> u8 {
        ((self.time & 0x1f) * 2) as u8
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// Howard Hinnant's days-to-civil conversion.
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
