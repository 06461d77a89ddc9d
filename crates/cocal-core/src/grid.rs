use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::{
  Config,
  Window
};
use crate::datetime::{
  self,
  add_days
};
use crate::placement::DayPlacement;

const WEEKDAY_LABELS: [&str; 7] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Day {
  pub date:        NaiveDate,
  /// Outside the window, in the padding.
  pub is_overflow: bool,
  /// Sorted by slot.
  pub placements:  Vec<DayPlacement>
}

impl Day {
  #[must_use]
  pub fn is_slot_free(
    &self,
    slot: usize
  ) -> bool {
    !self
      .placements
      .iter()
      .any(|entry| entry.slot == slot)
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Week {
  pub anchor: NaiveDate,
  pub days:   Vec<Day>
}

impl Week {
  #[must_use]
  pub fn is_all_overflow(&self) -> bool {
    self
      .days
      .iter()
      .all(|day| day.is_overflow)
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Grid {
  pub window:       Window,
  pub padded_start: NaiveDate,
  pub padded_end:   NaiveDate,
  pub weeks:        Vec<Week>
}

/// Position of a day inside
/// [`Grid::weeks`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DayIndex {
  pub week: usize,
  pub day:  usize
}

impl Grid {
  pub fn days(
    &self
  ) -> impl Iterator<Item = &Day> {
    self
      .weeks
      .iter()
      .flat_map(|week| week.days.iter())
  }

  /// First and last date covered by the
  /// weeks, excluded weekdays included.
  #[must_use]
  pub fn date_range(
    &self
  ) -> Option<(NaiveDate, NaiveDate)> {
    let first = self.weeks.first()?;
    let last = self.weeks.last()?;
    Some((
      first.anchor,
      add_days(last.anchor, 6)
    ))
  }

  /// date -> position lookup over every
  /// visible day.
  #[must_use]
  pub fn index(
    &self
  ) -> HashMap<NaiveDate, DayIndex> {
    let mut index = HashMap::new();
    for (week_idx, week) in
      self.weeks.iter().enumerate()
    {
      for (day_idx, day) in
        week.days.iter().enumerate()
      {
        index.insert(day.date, DayIndex {
          week: week_idx,
          day:  day_idx
        });
      }
    }
    index
  }

  #[must_use]
  pub fn day(
    &self,
    date: NaiveDate
  ) -> Option<&Day> {
    self
      .days()
      .find(|day| day.date == date)
  }

  /// The date shown in cell `at`, as
  /// reported by renderer hit testing.
  #[must_use]
  pub fn date_at(
    &self,
    at: DayIndex
  ) -> Option<NaiveDate> {
    self
      .weeks
      .get(at.week)
      .and_then(|week| week.days.get(at.day))
      .map(|day| day.date)
  }

  pub(crate) fn day_at_mut(
    &mut self,
    at: DayIndex
  ) -> Option<&mut Day> {
    self
      .weeks
      .get_mut(at.week)
      .and_then(|week| {
        week.days.get_mut(at.day)
      })
  }

  pub(crate) fn clear_placements(
    &mut self
  ) {
    for week in &mut self.weeks {
      for day in &mut week.days {
        day.placements.clear();
      }
    }
  }
}

/// Lays out the weeks for the window
/// containing `reference`.
#[tracing::instrument(skip(config))]
pub fn build_grid(
  reference: NaiveDate,
  config: &Config
) -> Grid {
  let window =
    Window::containing(reference, config);
  let (padded_start, padded_end) =
    window.padded(config);

  let mut weeks = Vec::new();
  let mut anchor = padded_start;
  while datetime::is_same_or_before(
    anchor, padded_end
  ) {
    weeks.push(build_week(
      anchor, &window, config
    ));
    anchor = add_days(anchor, 7);
  }

  let built = weeks.len();
  if config.drop_overflow_weeks {
    weeks.retain(|week| {
      !week.is_all_overflow()
    });
  }

  if let Some(count) =
    config.fixed_week_count
  {
    let mut next = weeks
      .last()
      .map(|week| add_days(week.anchor, 7))
      .unwrap_or(padded_start);
    while weeks.len() < count {
      weeks.push(build_week(
        next, &window, config
      ));
      next = add_days(next, 7);
    }
    weeks.truncate(count);
  }

  debug!(
    window_start = %window.start,
    window_end = %window.end,
    %padded_start,
    %padded_end,
    built,
    kept = weeks.len(),
    "grid built"
  );

  Grid {
    window,
    padded_start,
    padded_end,
    weeks
  }
}

fn build_week(
  anchor: NaiveDate,
  window: &Window,
  config: &Config
) -> Week {
  let days = (0_i64..7_i64)
    .map(|offset| add_days(anchor, offset))
    .filter(|date| {
      !datetime::day_of_week_excluded(
        *date, config
      )
    })
    .map(|date| Day {
      date,
      is_overflow: !window.contains(date),
      placements: vec![]
    })
    .collect();

  Week { anchor, days }
}

/// Abbreviated weekday names in column
/// order, without excluded weekdays.
#[must_use]
pub fn weekday_labels(
  config: &Config
) -> Vec<&'static str> {
  (0..7)
    .map(|offset| {
      (config.week_start_day + offset) % 7
    })
    .filter(|weekday| {
      !(config.exclude_sundays
        && *weekday == 0)
        && !(config.exclude_weekends
          && (*weekday == 0
            || *weekday == 6))
    })
    .map(|weekday| {
      WEEKDAY_LABELS[weekday as usize]
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    Weekday
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn weeks_tile_padded_range_without_gaps(
  ) {
    for week_start_day in 0..7 {
      for month_start_day in [1, 10, 29, 31]
      {
        let config = Config {
          week_start_day,
          month_start_day,
          drop_overflow_weeks: false,
          ..Config::default()
        };
        for reference in [
          date(2025, 2, 14),
          date(2024, 2, 29),
          date(2026, 12, 31),
          date(2026, 7, 1)
        ] {
          let grid =
            build_grid(reference, &config);
          let dates: Vec<_> = grid
            .days()
            .map(|day| day.date)
            .collect();
          let expected: Vec<_> =
            datetime::days_between(
              grid.padded_start,
              grid.padded_end
            )
            .collect();
          assert_eq!(dates, expected);
          assert_eq!(dates.len() % 7, 0);
          assert_eq!(
            grid.weeks[0].days[0]
              .date
              .weekday()
              .num_days_from_sunday(),
            week_start_day
          );
        }
      }
    }
  }

  #[test]
  fn overflow_days_are_outside_window() {
    let grid = build_grid(
      date(2026, 2, 17),
      &Config {
        week_start_day: 1,
        ..Config::default()
      }
    );
    assert_eq!(grid.weeks.len(), 5);
    for day in grid.days() {
      assert_eq!(
        day.is_overflow,
        day.date.month() != 2
      );
    }
    assert_eq!(
      grid.weeks[0].days[0].date,
      date(2026, 1, 26)
    );
  }

  #[test]
  fn excluded_weekends_are_skipped() {
    let config = Config {
      exclude_weekends: true,
      ..Config::default()
    };
    let grid =
      build_grid(date(2026, 3, 9), &config);
    for week in &grid.weeks {
      assert!(!week.days.is_empty());
      assert!(week.days.len() <= 5);
      for day in &week.days {
        assert!(!matches!(
          day.date.weekday(),
          Weekday::Sat | Weekday::Sun
        ));
      }
    }
  }

  #[test]
  fn all_overflow_week_dropped_by_default() {
    // 2025-11-01 is a Saturday and
    // 2025-11-30 a Sunday; with weekends
    // hidden the first and last weeks
    // show only overflow dates.
    let keep = Config {
      exclude_weekends: true,
      drop_overflow_weeks: false,
      ..Config::default()
    };
    let kept =
      build_grid(date(2025, 11, 12), &keep);
    assert_eq!(kept.weeks.len(), 6);
    assert!(kept.weeks[0].is_all_overflow());
    assert!(kept.weeks[5].is_all_overflow());

    let drop = Config {
      drop_overflow_weeks: true,
      ..keep
    };
    let dropped =
      build_grid(date(2025, 11, 12), &drop);
    assert_eq!(dropped.weeks.len(), 4);
    assert_eq!(
      dropped.weeks[0].anchor,
      date(2025, 11, 2)
    );
    assert!(
      dropped
        .weeks
        .iter()
        .all(|week| !week.is_all_overflow())
    );
  }

  #[test]
  fn fixed_week_count_pads_and_truncates() {
    // February 2026 fits exactly four
    // Sunday-based weeks.
    let padded = build_grid(
      date(2026, 2, 10),
      &Config {
        fixed_week_count: Some(6),
        ..Config::default()
      }
    );
    assert_eq!(padded.weeks.len(), 6);
    assert!(padded.weeks[4].is_all_overflow());
    assert_eq!(
      padded.weeks[5].anchor,
      date(2026, 3, 8)
    );

    let truncated = build_grid(
      date(2026, 2, 10),
      &Config {
        fixed_week_count: Some(2),
        ..Config::default()
      }
    );
    assert_eq!(truncated.weeks.len(), 2);
  }

  #[test]
  fn date_range_spans_kept_weeks() {
    let grid = build_grid(
      date(2026, 2, 10),
      &Config {
        fixed_week_count: Some(6),
        ..Config::default()
      }
    );
    assert_eq!(
      grid.date_range(),
      Some((date(2026, 2, 1), date(2026, 3, 14)))
    );
  }

  #[test]
  fn cells_map_back_to_dates() {
    let grid = build_grid(
      date(2026, 2, 17),
      &Config {
        exclude_weekends: true,
        ..Config::default()
      }
    );
    assert_eq!(
      grid.date_at(DayIndex { week: 2, day: 1 }),
      Some(date(2026, 2, 17))
    );
    assert_eq!(
      grid.date_at(DayIndex { week: 0, day: 5 }),
      None
    );
  }

  #[test]
  fn weekday_labels_follow_week_start() {
    assert_eq!(
      weekday_labels(&Config::default()),
      vec![
        "Sun", "Mon", "Tue", "Wed", "Thu",
        "Fri", "Sat"
      ]
    );
    assert_eq!(
      weekday_labels(&Config {
        week_start_day: 1,
        exclude_weekends: true,
        ..Config::default()
      }),
      vec!["Mon", "Tue", "Wed", "Thu", "Fri"]
    );
  }
}
