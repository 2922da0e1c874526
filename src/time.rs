// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions around time.
//!
//! All timestamps are handled as UTC [`Epoch`]s. The logs written by the
//! telescope use compact `YYYYMMDDhhmmss.ffffff` (FMLO log) and
//! `yymmddhhmmss.ffffff` (antenna log) forms; containers store ISO-8601 with
//! microseconds.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use hifitime::{Duration, Epoch, Unit};

use crate::config::ParseError;

/// The compact timestamp flavours found in the raw logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogTimeFormat {
    /// `YYYYMMDDhhmmss.ffffff`
    FullYear,

    /// `yymmddhhmmss.ffffff`
    ShortYear,
}

impl LogTimeFormat {
    fn num_digits(self) -> usize {
        match self {
            LogTimeFormat::FullYear => 14,
            LogTimeFormat::ShortYear => 12,
        }
    }
}

/// Parse a compact log timestamp. The fractional part is rounded to the
/// nearest microsecond.
pub(crate) fn parse_log_timestamp(s: &str, format: LogTimeFormat) -> Result<Epoch, ParseError> {
    let bad = || ParseError::Timestamp {
        input: s.to_string(),
    };

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.len() != format.num_digits() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }

    // The slices below are all ASCII digits, so the parses can't fail.
    let field = |range: std::ops::Range<usize>| -> u32 { whole[range].parse().unwrap_or(0) };
    let (year, rest) = match format {
        LogTimeFormat::FullYear => (field(0..4) as i32, 4),
        LogTimeFormat::ShortYear => {
            // Same pivot as strptime's %y.
            let yy = field(0..2) as i32;
            (if yy < 69 { 2000 + yy } else { 1900 + yy }, 2)
        }
    };
    let month = field(rest..rest + 2);
    let day = field(rest + 2..rest + 4);
    let hour = field(rest + 4..rest + 6);
    let minute = field(rest + 6..rest + 8);
    let second = field(rest + 8..rest + 10);

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(bad)?;

    let micros = round_fraction_to_micros(frac);
    Ok(naive_to_epoch(&naive) + Duration::from_f64(micros as f64, Unit::Microsecond))
}

/// Round the (ASCII digit) fractional part of a second to whole microseconds
/// on the exact decimal, half to even. The result may be 1_000_000.
fn round_fraction_to_micros(frac: &str) -> u64 {
    let split = frac.len().min(6);
    let (head, tail) = frac.split_at(split);
    let micros = head
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0, |acc, b| acc * 10 + u64::from(b - b'0'));

    let round_up = match tail.as_bytes().split_first() {
        None => false,
        Some((&first, rest)) => match first {
            b'0'..=b'4' => false,
            b'5' if rest.iter().all(|&b| b == b'0') => micros % 2 == 1,
            _ => true,
        },
    };
    micros + u64::from(round_up)
}

/// Parse an ISO-8601 timestamp as written into containers.
pub(crate) fn parse_iso_timestamp(s: &str) -> Result<Epoch, ParseError> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| {
        ParseError::Timestamp {
            input: s.to_string(),
        }
    })?;
    Ok(naive_to_epoch(&naive))
}

/// Format an [`Epoch`] as `YYYY-MM-DDThh:mm:ss.ffffff` (UTC).
pub(crate) fn format_iso_timestamp(e: Epoch) -> String {
    let (y, m, d, h, min, s, ns) = e.to_gregorian_utc();
    format!(
        "{y:04}-{m:02}-{d:02}T{h:02}:{min:02}:{s:02}.{:06}",
        ns / 1000
    )
}

/// Floor an [`Epoch`] to a multiple of `interval_ms` milliseconds within its
/// UTC second.
pub(crate) fn floor_to_millis(e: Epoch, interval_ms: i64) -> Epoch {
    let (y, m, d, h, min, s, ns) = e.to_gregorian_utc();
    let step = (interval_ms.max(1) * 1_000_000) as u32;
    Epoch::from_gregorian_utc(y, m, d, h, min, s, (ns / step) * step)
}

fn naive_to_epoch(naive: &NaiveDateTime) -> Epoch {
    Epoch::from_gregorian_utc(
        naive.year(),
        naive.month() as u8,
        naive.day() as u8,
        naive.hour() as u8,
        naive.minute() as u8,
        naive.second() as u8,
        naive.nanosecond(),
    )
}
