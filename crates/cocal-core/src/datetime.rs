use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Weekday
};
use chrono_tz::Tz;

use crate::config::Config;

/// Which way [`nearest_weekday`] walks
/// when the input date does not match.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Direction {
  Backward,
  Forward
}

#[must_use]
pub fn start_of_day(
  dt: NaiveDateTime
) -> NaiveDate {
  dt.date()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

#[must_use]
pub fn is_before(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a < b
}

#[must_use]
pub fn is_after(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a > b
}

#[must_use]
pub fn is_same_day(
  a: NaiveDateTime,
  b: NaiveDateTime
) -> bool {
  start_of_day(a) == start_of_day(b)
}

#[must_use]
pub fn is_same_or_before(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a <= b
}

/// Sunday-based weekday index, 0..=6.
#[must_use]
pub fn weekday_index(
  date: NaiveDate
) -> u32 {
  date.weekday().num_days_from_sunday()
}

/// Returns `date` itself when it already
/// falls on `target` (Sunday = 0),
/// otherwise the closest matching date
/// in `direction`.
#[must_use]
pub fn nearest_weekday(
  date: NaiveDate,
  target: u32,
  direction: Direction
) -> NaiveDate {
  let current =
    i64::from(weekday_index(date));
  let target = i64::from(target % 7);
  match direction {
    | Direction::Backward => {
      let diff =
        (7 + current - target) % 7;
      add_days(date, -diff)
    }
    | Direction::Forward => {
      let diff =
        (7 + target - current) % 7;
      add_days(date, diff)
    }
  }
}

#[must_use]
pub fn day_of_week_excluded(
  date: NaiveDate,
  config: &Config
) -> bool {
  let weekday = date.weekday();
  (config.exclude_sundays
    && weekday == Weekday::Sun)
    || (config.exclude_weekends
      && matches!(
        weekday,
        Weekday::Sat | Weekday::Sun
      ))
}

/// Every calendar date from `start` to
/// `end` inclusive. Empty when `end`
/// precedes `start`.
pub fn days_between(
  start: NaiveDate,
  end: NaiveDate
) -> impl Iterator<Item = NaiveDate> {
  let count =
    (end - start).num_days().max(-1);
  (0..=count).map(move |offset| {
    add_days(start, offset)
  })
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// The `day`-th of the given month,
/// clamped into `1..=days_in_month`.
#[must_use]
pub fn clamped_month_day(
  year: i32,
  month: u32,
  day: u32
) -> NaiveDate {
  let day = day
    .max(1)
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or_else(|| {
    first_day_of_month(year, month)
  })
}

/// `(year, month)` shifted by `months`,
/// normalizing across year boundaries.
#[must_use]
pub fn shift_year_month(
  year: i32,
  month: u32,
  months: i32
) -> (i32, u32) {
  let total = year
    .saturating_mul(12)
    .saturating_add(month as i32 - 1)
    .saturating_add(months);
  (
    total.div_euclid(12),
    total.rem_euclid(12) as u32 + 1
  )
}

/// Moves `date` by whole months, keeping
/// the day of month where possible
/// (Jan 31 + 1 month lands on the last
/// day of February).
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let (year, month) = shift_year_month(
    date.year(),
    date.month(),
    months
  );
  clamped_month_day(
    year,
    month,
    date.day()
  )
}

/// Like [`shift_months`] but keeps the
/// time of day.
#[must_use]
pub fn shift_months_datetime(
  dt: NaiveDateTime,
  months: i32
) -> NaiveDateTime {
  shift_months(dt.date(), months)
    .and_time(dt.time())
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => Some(tz),
    | Err(error) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %error,
        "invalid timezone id"
      );
      None
    }
  }
}

/// Epoch milliseconds as wall-clock time
/// in `timezone`.
#[must_use]
pub fn from_epoch_millis(
  millis: i64,
  timezone: Tz
) -> Option<NaiveDateTime> {
  timezone
    .timestamp_millis_opt(millis)
    .single()
    .map(|dt| dt.naive_local())
}

/// Parses the textual timestamp forms the
/// construction input accepts. Offsets in
/// RFC 3339 input are converted to
/// `timezone`; naive forms are taken as
/// already local.
#[must_use]
pub fn parse_timestamp(
  raw: &str,
  timezone: Tz
) -> Option<NaiveDateTime> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(
      dt.with_timezone(&timezone)
        .naive_local()
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return date.and_hms_opt(0, 0, 0);
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt);
    }
  }

  None
}
