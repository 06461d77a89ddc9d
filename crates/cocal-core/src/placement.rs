use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{
  debug,
  trace
};

use crate::datetime;
use crate::event::{
  Event,
  EventId
};
use crate::grid::{
  DayIndex,
  Grid
};

/// An event's entry in one day cell.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct DayPlacement {
  pub event_id:        EventId,
  pub slot:            usize,
  /// Beyond the visible rows; renderers
  /// show a "+more" marker instead.
  pub hidden:          bool,
  /// The event also covers the previous
  /// calendar date.
  pub continues_before: bool,
  /// The event also covers the next
  /// calendar date.
  pub continues_after: bool
}

/// One event bound to the visible days
/// it covers. The slot is shared by all
/// of them, across week boundaries too.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Placement {
  pub event_id: EventId,
  pub days:     Vec<NaiveDate>,
  pub slot:     usize,
  pub hidden:   bool
}

/// Packs `events` into the day cells of
/// `grid`, first fit, in input order.
/// Existing placements are discarded, so
/// freed slots are always reclaimed.
///
/// Days outside the grid (or excluded
/// weekdays) are skipped; an event with no
/// visible day gets no placement.
#[tracing::instrument(skip_all, fields(events = events.len()))]
pub fn place_events(
  grid: &mut Grid,
  events: &[Event],
  visible_slots: usize
) -> Vec<Placement> {
  grid.clear_placements();
  let index = grid.index();
  let placements: Vec<Placement> = events
    .iter()
    .filter_map(|event| {
      place_indexed(
        grid,
        &index,
        event,
        visible_slots
      )
    })
    .collect();

  debug!(
    placed = placements.len(),
    skipped =
      events.len() - placements.len(),
    hidden = placements
      .iter()
      .filter(|placement| placement.hidden)
      .count(),
    "events placed"
  );
  placements
}

/// Places one more event on top of the
/// current placements, leaving every other
/// event where it is.
pub fn place_event(
  grid: &mut Grid,
  event: &Event,
  visible_slots: usize
) -> Option<Placement> {
  let index = grid.index();
  place_indexed(
    grid,
    &index,
    event,
    visible_slots
  )
}

/// Frees the slots held by `event_id`.
/// Other events keep their rows; the gap
/// is only reused by later placements.
pub fn remove_event(
  grid: &mut Grid,
  event_id: EventId
) {
  for week in &mut grid.weeks {
    for day in &mut week.days {
      day.placements.retain(|entry| {
        entry.event_id != event_id
      });
    }
  }
}

fn place_indexed(
  grid: &mut Grid,
  index: &HashMap<NaiveDate, DayIndex>,
  event: &Event,
  visible_slots: usize
) -> Option<Placement> {
  // Only the overlap with the grid is
  // walked; events may span centuries.
  let (grid_start, grid_end) =
    grid.date_range()?;
  let span: Vec<(NaiveDate, DayIndex)> =
    datetime::days_between(
      event.first_day().max(grid_start),
      event.last_day().min(grid_end)
    )
    .filter_map(|date| {
      index
        .get(&date)
        .map(|at| (date, *at))
    })
    .collect();

  if span.is_empty() {
    trace!(
      event = %event.id,
      name = %event.name,
      "event not visible; skipped"
    );
    return None;
  }

  let slot = first_free_slot(
    grid,
    span.iter().map(|(_, at)| *at)
  );
  let hidden = slot >= visible_slots;

  for (date, at) in &span {
    let Some(day) = grid.day_at_mut(*at)
    else {
      continue;
    };
    let entry = DayPlacement {
      event_id: event.id,
      slot,
      hidden,
      continues_before: *date
        > event.first_day(),
      continues_after: *date
        < event.last_day()
    };
    let position = day
      .placements
      .partition_point(|existing| {
        existing.slot < slot
      });
    day.placements.insert(position, entry);
  }

  trace!(
    event = %event.id,
    name = %event.name,
    slot,
    hidden,
    days = span.len(),
    "event placed"
  );
  Some(Placement {
    event_id: event.id,
    days: span
      .into_iter()
      .map(|(date, _)| date)
      .collect(),
    slot,
    hidden
  })
}

/// Lowest slot free in every given day.
fn first_free_slot(
  grid: &Grid,
  span: impl Iterator<Item = DayIndex>
    + Clone
) -> usize {
  let mut slot = 0;
  loop {
    let free = span.clone().all(|at| {
      grid
        .weeks
        .get(at.week)
        .and_then(|week| week.days.get(at.day))
        .is_none_or(|day| {
          day.is_slot_free(slot)
        })
    });
    if free {
      return slot;
    }
    slot += 1;
  }
}
