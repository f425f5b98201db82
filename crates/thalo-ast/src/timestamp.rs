//! Entry timestamps and their canonical UTC ordering.
//!
//! The canonical string form `YYYY-MM-DDThh:mmZ` (UTC-normalized) is the
//! cross-entry total order: lexicographic comparison of canonical strings
//! agrees with instant comparison, which the ordering tests pin down.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A civil calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl Date {
    /// Creates a date, validating month and day against the civil calendar.
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// Parses `YYYY-MM-DD`.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let year: i32 = text.get(0..4)?.parse().ok()?;
        let month: u8 = text.get(5..7)?.parse().ok()?;
        let day: u8 = text.get(8..10)?.parse().ok()?;
        Self::new(year, month, day)
    }

    /// Days since 1970-01-01, negative before the epoch.
    pub fn days_from_epoch(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A time of day at minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Either `Z` or a `±HH:MM` offset, stored as signed minutes east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timezone {
    Utc,
    Offset { minutes: i32 },
}

impl Timezone {
    /// The offset in signed minutes; zero for `Z`.
    pub fn offset_minutes(&self) -> i32 {
        match *self {
            Timezone::Utc => 0,
            Timezone::Offset { minutes } => minutes,
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Timezone::Utc => write!(f, "Z"),
            Timezone::Offset { minutes } => {
                let sign = if minutes < 0 { '-' } else { '+' };
                let abs = minutes.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
            }
        }
    }
}

/// A minute-precision instant with its written timezone.
///
/// Equality, hashing, and ordering all compare the UTC instant, so
/// `12:00+02:00` and `10:00Z` are the same timestamp for identity and
/// ordering purposes. The written form is still observable through the
/// fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timestamp {
    pub date: Date,
    pub time: Time,
    pub timezone: Timezone,
}

impl Timestamp {
    /// Minutes since the Unix epoch, normalized to UTC.
    pub fn utc_minutes(&self) -> i64 {
        self.date.days_from_epoch() * 24 * 60
            + i64::from(self.time.hour) * 60
            + i64::from(self.time.minute)
            - i64::from(self.timezone.offset_minutes())
    }

    /// The canonical UTC-normalized `YYYY-MM-DDThh:mmZ` string.
    pub fn canonical(&self) -> String {
        let total = self.utc_minutes();
        let days = total.div_euclid(24 * 60);
        let in_day = total.rem_euclid(24 * 60);
        let (year, month, day) = civil_from_days(days);
        format!("{:04}-{:02}-{:02}T{:02}:{:02}Z", year, month, day, in_day / 60, in_day % 60)
    }

    /// Builds a UTC timestamp from minutes since the Unix epoch.
    pub fn from_utc_minutes(total: i64) -> Self {
        let days = total.div_euclid(24 * 60);
        let in_day = total.rem_euclid(24 * 60);
        let (year, month, day) = civil_from_days(days);
        Self {
            date: Date { year, month, day },
            time: Time { hour: (in_day / 60) as u8, minute: (in_day % 60) as u8 },
            timezone: Timezone::Utc,
        }
    }

    /// Parses `YYYY-MM-DDThh:mm` followed by `Z` or `±HH:MM`.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() < 17 || bytes[10] != b'T' || bytes[13] != b':' {
            return None;
        }
        let date = Date::parse(text.get(0..10)?)?;
        let hour: u8 = text.get(11..13)?.parse().ok()?;
        let minute: u8 = text.get(14..16)?.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        let time = Time { hour, minute };
        let timezone = match text.get(16..)? {
            "Z" => Timezone::Utc,
            rest => {
                let tz = rest.as_bytes();
                if tz.len() != 6 || (tz[0] != b'+' && tz[0] != b'-') || tz[3] != b':' {
                    return None;
                }
                let hours: i32 = rest.get(1..3)?.parse().ok()?;
                let minutes: i32 = rest.get(4..6)?.parse().ok()?;
                if hours > 23 || minutes > 59 {
                    return None;
                }
                let total = hours * 60 + minutes;
                Timezone::Offset { minutes: if tz[0] == b'-' { -total } else { total } }
            }
        };
        Some(Self { date, time, timezone })
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.utc_minutes() == other.utc_minutes()
    }
}

impl Eq for Timestamp {}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.utc_minutes().hash(state);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.utc_minutes().cmp(&other.utc_minutes())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}{}", self.date, self.time, self.timezone)
    }
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

fn is_leap(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

// Civil <-> day-number conversion (proleptic Gregorian calendar).
fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (m + if m > 2 { -3 } else { 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    ((y + i64::from(m <= 2)) as i32, m as u8, d as u8)
}
