use chrono::{
  NaiveDate,
  TimeDelta
};
use serde::Serialize;
use tracing::trace;

use crate::event::{
  Event,
  EventId
};

/// An event held by the pointer. Only one
/// exists per calendar at a time.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize,
)]
pub struct DragSession {
  pub event_id:   EventId,
  /// The day cell the event was picked up
  /// from.
  pub grabbed_on: NaiveDate
}

impl DragSession {
  #[must_use]
  pub fn new(
    event_id: EventId,
    grabbed_on: NaiveDate
  ) -> Self {
    Self {
      event_id,
      grabbed_on
    }
  }

  /// Whole days between the grab cell and
  /// `dropped_on`.
  #[must_use]
  pub fn offset_to(
    &self,
    dropped_on: NaiveDate
  ) -> i64 {
    (dropped_on - self.grabbed_on).num_days()
  }

  /// Where the event's first day lands so
  /// the grabbed cell ends up under
  /// `dropped_on`.
  #[must_use]
  pub fn target_start(
    &self,
    event: &Event,
    dropped_on: NaiveDate
  ) -> Option<NaiveDate> {
    event.first_day().checked_add_signed(
      TimeDelta::try_days(
        self.offset_to(dropped_on)
      )?
    )
  }
}

/// Moves `event` so its first day is
/// `start_on`. Time of day and duration
/// are kept; `None` if the moved event
/// would end past the last representable
/// date.
#[must_use]
pub fn recompute_span(
  event: &Event,
  start_on: NaiveDate
) -> Option<Event> {
  let delta =
    (start_on - event.first_day()).num_days();
  trace!(
    event = %event.id,
    delta,
    "recomputing event span"
  );
  event.shifted_by_days(delta)
}
