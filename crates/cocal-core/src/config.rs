use chrono::{
  Datelike,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use serde_json::Value;
use tracing::{
  debug,
  info
};

use crate::datetime::{
  self,
  Direction
};
use crate::error::{
  CalendarError,
  Result
};
use crate::event::{
  Event,
  ingest_events
};
use crate::header::HeaderConfig;

const DEFAULT_VISIBLE_SLOTS: usize = 4;
/// Upper bound for `visibleSlots`; more
/// rows than this cannot fit a day cell.
pub const MAX_VISIBLE_SLOTS: usize = 64;

fn calendar_true() -> bool {
  true
}

fn calendar_default_week_start() -> i64
{
  1
}

fn calendar_default_month_start()
-> i64 {
  1
}

fn calendar_default_visible_slots()
-> usize {
  DEFAULT_VISIBLE_SLOTS
}

/// Settings exactly as they appear in
/// the construction input, before
/// normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
  #[serde(
    default = "calendar_default_week_start",
    alias = "weekStartDay"
  )]
  week_start:          i64,
  #[serde(
    default = "calendar_default_month_start",
    alias = "monthStartDay"
  )]
  month_start:         i64,
  #[serde(default)]
  exclude_weekends:    bool,
  #[serde(default)]
  exclude_sundays:     bool,
  #[serde(
    default,
    alias = "fixedWeekCount"
  )]
  weeks:               Option<u32>,
  #[serde(default = "calendar_true")]
  day_names:           bool,
  #[serde(default = "calendar_true")]
  edge_borders:        bool,
  #[serde(default = "calendar_true")]
  drop_overflow_weeks: bool,
  #[serde(
    default = "calendar_default_visible_slots"
  )]
  visible_slots:       usize,
  #[serde(default)]
  reingest_events:     bool,
  #[serde(default)]
  timezone:            Option<String>
}

/// Resolved, normalized settings. Fixed
/// for the lifetime of a calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  /// Sunday = 0.
  pub week_start_day:      u32,
  /// Day of month a logical month starts
  /// on, 1..=31.
  pub month_start_day:     u32,
  pub exclude_weekends:    bool,
  pub exclude_sundays:     bool,
  pub fixed_week_count:    Option<usize>,
  pub day_names:           bool,
  pub edge_borders:        bool,
  pub drop_overflow_weeks: bool,
  pub visible_slots:       usize,
  pub reingest_events:     bool,
  pub timezone:            Tz
}

impl Default for Config {
  fn default() -> Self {
    Self {
      week_start_day:      0,
      month_start_day:     1,
      exclude_weekends:    false,
      exclude_sundays:     false,
      fixed_week_count:    None,
      day_names:           true,
      edge_borders:        true,
      drop_overflow_weeks: true,
      visible_slots:
        DEFAULT_VISIBLE_SLOTS,
      reingest_events:     false,
      timezone:            chrono_tz::UTC
    }
  }
}

impl Config {
  /// Last weekday of a week, Sunday = 0.
  #[must_use]
  pub fn week_end_day(&self) -> u32 {
    (self.week_start_day + 6) % 7
  }
}

/// Maps the 1-based `weekStart` input
/// (1 = Sunday) onto 0..=6.
#[must_use]
pub fn normalize_week_start(
  input: i64
) -> u32 {
  (input - 1).clamp(0, 6) as u32
}

#[must_use]
pub fn normalize_month_start(
  input: i64
) -> u32 {
  input.clamp(1, 31) as u32
}

fn sanitize_settings(
  raw: RawSettings
) -> Result<Config> {
  let timezone = match raw
    .timezone
    .as_deref()
  {
    | None => chrono_tz::UTC,
    | Some(id) => {
      datetime::parse_timezone(
        id, "options"
      )
      .ok_or_else(|| {
        CalendarError::config(format!(
          "unknown timezone `{id}`"
        ))
      })?
    }
  };

  let visible_slots = match raw
    .visible_slots
  {
    | 0 => calendar_default_visible_slots(),
    | slots if slots > MAX_VISIBLE_SLOTS => {
      return Err(CalendarError::config(
        format!(
          "visibleSlots must be at most \
           {MAX_VISIBLE_SLOTS}, got {slots}"
        )
      ));
    }
    | slots => slots
  };

  Ok(Config {
    week_start_day:
      normalize_week_start(
        raw.week_start
      ),
    month_start_day:
      normalize_month_start(
        raw.month_start
      ),
    exclude_weekends: raw
      .exclude_weekends,
    exclude_sundays: raw
      .exclude_sundays,
    fixed_week_count: raw
      .weeks
      .filter(|weeks| *weeks > 0)
      .map(|weeks| weeks as usize),
    day_names: raw.day_names,
    edge_borders: raw.edge_borders,
    drop_overflow_weeks: raw
      .drop_overflow_weeks,
    visible_slots,
    reingest_events: raw
      .reingest_events,
    timezone
  })
}

/// The logical month implied by a
/// reference date and `month_start_day`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct Window {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl Window {
  /// The window containing `reference`.
  /// A `month_start_day` past the end of
  /// a month starts that month's window
  /// on its last day.
  ///
  /// The end is the day before the next
  /// window's start, not the day before
  /// the start's same day next month: with
  /// `month_start_day = 31` a window from
  /// Feb 28 ends on Mar 30, so Mar 28..=30
  /// still belong to some window.
  #[must_use]
  pub fn containing(
    reference: NaiveDate,
    config: &Config
  ) -> Self {
    let msd = config.month_start_day;
    let this_month =
      datetime::clamped_month_day(
        reference.year(),
        reference.month(),
        msd
      );

    let (year, month) =
      if reference >= this_month {
        (reference.year(), reference.month())
      } else {
        datetime::shift_year_month(
          reference.year(),
          reference.month(),
          -1
        )
      };

    let start =
      datetime::clamped_month_day(
        year, month, msd
      );
    let (next_year, next_month) =
      datetime::shift_year_month(
        year, month, 1
      );
    let next_start =
      datetime::clamped_month_day(
        next_year, next_month, msd
      );

    Self {
      start,
      end: datetime::add_days(
        next_start, -1
      )
    }
  }

  #[must_use]
  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    !datetime::is_before(
      date, self.start
    ) && !datetime::is_after(
      date, self.end
    )
  }

  /// The window extended outward to
  /// whole weeks.
  #[must_use]
  pub fn padded(
    &self,
    config: &Config
  ) -> (NaiveDate, NaiveDate) {
    (
      datetime::nearest_weekday(
        self.start,
        config.week_start_day,
        Direction::Backward
      ),
      datetime::nearest_weekday(
        self.end,
        config.week_end_day(),
        Direction::Forward
      )
    )
  }
}

/// Everything a calendar is constructed
/// from, validated.
#[derive(Debug, Clone)]
pub struct CalendarOptions {
  pub reference_date: NaiveDate,
  pub config:         Config,
  pub header:         Option<HeaderConfig>,
  pub events:         Vec<Event>,
  pub selector:       Option<String>,
  /// The `events` input as given, kept
  /// for re-ingestion.
  pub raw_events:     Value
}

impl CalendarOptions {
  #[tracing::instrument(skip_all)]
  pub fn from_json(
    value: &Value
  ) -> Result<Self> {
    let Some(object) = value.as_object()
    else {
      return Err(CalendarError::config(
        "options must be an object"
      ));
    };

    let raw = serde_json::from_value::<
      RawSettings
    >(value.clone())
    .map_err(|error| {
      CalendarError::config(format!(
        "invalid options: {error}"
      ))
    })?;
    let config = sanitize_settings(raw)?;

    let reference_date =
      resolve_reference_date(
        object.get("date"),
        &config
      )?;

    let header = match object
      .get("header")
    {
      | None | Some(Value::Null) => None,
      | Some(raw) => {
        Some(HeaderConfig::from_json(raw)?)
      }
    };

    let raw_events = object
      .get("events")
      .cloned()
      .unwrap_or(Value::Null);
    let events =
      ingest_events(&raw_events, &config)?;

    let selector = match object
      .get("selector")
    {
      | None | Some(Value::Null) => None,
      | Some(Value::String(selector)) => {
        Some(selector.clone())
      }
      | Some(_) => {
        return Err(CalendarError::config(
          "selector must be a string"
        ));
      }
    };

    info!(
      reference = %reference_date,
      week_start = config.week_start_day,
      month_start = config.month_start_day,
      events = events.len(),
      "resolved calendar options"
    );

    Ok(Self {
      reference_date,
      config,
      header,
      events,
      selector,
      raw_events
    })
  }

  pub fn from_json_str(
    text: &str
  ) -> Result<Self> {
    let value = serde_json::from_str::<
      Value
    >(text)
    .map_err(|error| {
      CalendarError::config(format!(
        "options are not valid JSON: \
         {error}"
      ))
    })?;
    Self::from_json(&value)
  }

  /// TOML documents are mapped onto the
  /// same value model as JSON; TOML
  /// dates and datetimes become strings.
  pub fn from_toml_str(
    text: &str
  ) -> Result<Self> {
    let table =
      toml::from_str::<toml::Table>(text)
        .map_err(|error| {
          CalendarError::config(format!(
            "options are not valid \
             TOML: {error}"
          ))
        })?;
    debug!(
      keys = table.len(),
      "parsed toml options"
    );
    Self::from_json(&toml_to_json(
      toml::Value::Table(table)
    ))
  }
}

fn resolve_reference_date(
  raw: Option<&Value>,
  config: &Config
) -> Result<NaiveDate> {
  let timezone = config.timezone;
  let resolved = match raw {
    | None | Some(Value::Null) => {
      Some(
        Utc::now()
          .with_timezone(&timezone)
          .naive_local()
      )
    }
    | Some(Value::Number(number)) => {
      number.as_i64().and_then(
        |millis| {
          datetime::from_epoch_millis(
            millis, timezone
          )
        }
      )
    }
    | Some(Value::String(text)) => {
      datetime::parse_timestamp(
        text, timezone
      )
    }
    | Some(_) => None
  };

  resolved
    .map(datetime::start_of_day)
    .ok_or_else(|| {
      CalendarError::config(
        "date must be a timestamp or a \
         date string"
      )
    })
}

fn toml_to_json(
  value: toml::Value
) -> Value {
  match value {
    | toml::Value::String(text) => {
      Value::String(text)
    }
    | toml::Value::Integer(number) => {
      Value::from(number)
    }
    | toml::Value::Float(number) => {
      Value::from(number)
    }
    | toml::Value::Boolean(flag) => {
      Value::Bool(flag)
    }
    | toml::Value::Datetime(dt) => {
      Value::String(dt.to_string())
    }
    | toml::Value::Array(items) => {
      Value::Array(
        items
          .into_iter()
          .map(toml_to_json)
          .collect()
      )
    }
    | toml::Value::Table(table) => {
      Value::Object(
        table
          .into_iter()
          .map(|(key, value)| {
            (key, toml_to_json(value))
          })
          .collect()
      )
    }
  }
}
