use std::fmt;

use chrono::{
  NaiveDate,
  NaiveDateTime,
  TimeDelta
};
use serde::Serialize;
use serde_json::{
  Map,
  Value
};
use tracing::{
  debug,
  trace
};
use uuid::Uuid;

use crate::config::Config;
use crate::datetime;
use crate::error::{
  CalendarError,
  Result
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
)]
pub struct EventId(Uuid);

impl EventId {
  #[must_use]
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }
}

impl Default for EventId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for EventId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Event {
  pub id:    EventId,
  pub name:  String,
  pub start: NaiveDateTime,
  pub end:   Option<NaiveDateTime>,
  pub label: Option<String>,
  pub tags:  Vec<String>
}

impl Event {
  pub fn new(
    name: impl Into<String>,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>
  ) -> Self {
    Self {
      id: EventId::new(),
      name: name.into(),
      start,
      end,
      label: None,
      tags: vec![]
    }
  }

  #[must_use]
  pub fn first_day(&self) -> NaiveDate {
    datetime::start_of_day(self.start)
  }

  #[must_use]
  pub fn last_day(&self) -> NaiveDate {
    datetime::start_of_day(
      self.end.unwrap_or(self.start)
    )
  }

  /// Every calendar date the event
  /// touches, first to last.
  pub fn days(
    &self
  ) -> impl Iterator<Item = NaiveDate>
  {
    datetime::days_between(
      self.first_day(),
      self.last_day()
    )
  }

  /// A copy moved by whole days; start
  /// and end shift together. `None` when
  /// either would leave the representable
  /// date range.
  #[must_use]
  pub fn shifted_by_days(
    &self,
    days: i64
  ) -> Option<Self> {
    let delta = TimeDelta::try_days(days)?;
    let start =
      self.start.checked_add_signed(delta)?;
    let end = match self.end {
      | Some(end) => {
        Some(end.checked_add_signed(delta)?)
      }
      | None => None
    };
    Some(Self {
      start,
      end,
      ..self.clone()
    })
  }
}

/// Validates the `events` construction
/// input. Input order is preserved; it is
/// the placement priority.
#[tracing::instrument(skip_all)]
pub fn ingest_events(
  raw: &Value,
  config: &Config
) -> Result<Vec<Event>> {
  let items = match raw {
    | Value::Null => return Ok(vec![]),
    | Value::Array(items) => items,
    | _ => {
      return Err(CalendarError::config(
        "events must be an array"
      ));
    }
  };

  let mut events =
    Vec::with_capacity(items.len());
  for (index, item) in
    items.iter().enumerate()
  {
    let Some(object) = item.as_object()
    else {
      return Err(CalendarError::config(
        format!(
          "event #{index} must be an \
           object"
        )
      ));
    };
    let event =
      parse_event(index, object, config)?;
    trace!(
      index,
      name = %event.name,
      start = %event.start,
      "ingested event"
    );
    events.push(event);
  }

  debug!(
    count = events.len(),
    "events ingested"
  );
  Ok(events)
}

fn parse_event(
  index: usize,
  object: &Map<String, Value>,
  config: &Config
) -> Result<Event> {
  let name = match object.get("name") {
    | None | Some(Value::Null) => {
      return Err(
        CalendarError::malformed(
          index,
          "missing required `name`"
        )
      );
    }
    | Some(Value::String(name)) => {
      name.clone()
    }
    | Some(_) => {
      return Err(
        CalendarError::EventType {
          index,
          field: "name",
          expected: "a string"
        }
      );
    }
  };
  if name.trim().is_empty() {
    return Err(
      CalendarError::malformed(
        index,
        "`name` must not be empty"
      )
    );
  }

  let start = match object.get("start")
  {
    | None | Some(Value::Null) => {
      return Err(
        CalendarError::malformed(
          index,
          "missing required `start`"
        )
      );
    }
    | Some(raw) => {
      parse_event_timestamp(
        index, "start", raw, config
      )?
    }
  };

  let end = match object.get("end") {
    | None | Some(Value::Null) => None,
    | Some(raw) => {
      Some(parse_event_timestamp(
        index, "end", raw, config
      )?)
    }
  };
  if let Some(end) = end
    && end < start
  {
    return Err(
      CalendarError::malformed(
        index,
        "`end` is earlier than `start`"
      )
    );
  }

  let label = match object.get("label")
  {
    | None | Some(Value::Null) => None,
    | Some(Value::String(label)) => {
      Some(label.clone())
    }
    | Some(_) => {
      return Err(
        CalendarError::EventType {
          index,
          field: "label",
          expected: "a string"
        }
      );
    }
  };

  let tags = match object.get("tags") {
    | None | Some(Value::Null) => vec![],
    | Some(Value::Array(items)) => items
      .iter()
      .map(|tag| {
        tag
          .as_str()
          .map(ToString::to_string)
          .ok_or(
            CalendarError::EventType {
              index,
              field: "tags",
              expected:
                "a list of strings"
            }
          )
      })
      .collect::<Result<Vec<_>>>()?,
    | Some(_) => {
      return Err(
        CalendarError::EventType {
          index,
          field: "tags",
          expected: "a list of strings"
        }
      );
    }
  };

  Ok(Event {
    id: EventId::new(),
    name,
    start,
    end,
    label,
    tags
  })
}

fn parse_event_timestamp(
  index: usize,
  field: &'static str,
  raw: &Value,
  config: &Config
) -> Result<NaiveDateTime> {
  let parsed = match raw {
    | Value::Number(number) => {
      number.as_i64().and_then(
        |millis| {
          datetime::from_epoch_millis(
            millis,
            config.timezone
          )
        }
      )
    }
    | Value::String(text) => {
      datetime::parse_timestamp(
        text,
        config.timezone
      )
    }
    | _ => None
  };

  parsed.ok_or(
    CalendarError::EventType {
      index,
      field,
      expected: "a timestamp or date"
    }
  )
}
