use std::cell::RefCell;
use std::io::{
  self,
  Write
};
use std::rc::Rc;
use std::sync::Arc;

use chrono::NaiveDate;
use cocal_core::grid::build_grid;
use cocal_core::placement::place_events;
use cocal_core::render::{
  CalendarView,
  Renderer,
  TextRenderer
};
use cocal_core::{
  Calendar,
  CalendarError
};
use serde_json::json;
use tempfile::NamedTempFile;

fn date(
  y: i32,
  m: u32,
  d: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d)
    .expect("valid date")
}

#[derive(Default)]
struct Recorder {
  targets: usize,
  draws:   Rc<RefCell<Vec<(NaiveDate, usize)>>>
}

impl Renderer for Recorder {
  fn mount(
    &mut self,
    _selector: &str
  ) -> usize {
    self.targets
  }

  fn draw(
    &mut self,
    view: &CalendarView<'_>
  ) -> anyhow::Result<()> {
    self
      .draws
      .borrow_mut()
      .push((view.reference_date, view.placements.len()));
    Ok(())
  }
}

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
  fn write(
    &mut self,
    buf: &[u8]
  ) -> io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl SharedBuffer {
  fn take_text(&self) -> String {
    let bytes =
      std::mem::take(&mut *self.0.borrow_mut());
    String::from_utf8(bytes).expect("utf8 output")
  }
}

fn team_calendar() -> Calendar {
  Calendar::from_json(&json!({
    "date": "2026-02-17",
    "weekStart": 2,
    "selector": "#calendar",
    "header": {
      "left": ["Prev::prev"],
      "center": ["format(%B %Y)"],
      "right": ["Next::next"]
    },
    "events": [
      { "name": "Standup", "start": "2026-02-17T09:00" },
      {
        "name": "Offsite",
        "start": "2026-02-19T08:00",
        "end": "2026-02-20T18:00"
      },
      { "name": "Retro", "start": "2026-03-13T15:00" }
    ]
  }))
  .expect("valid options")
}

#[test]
fn navigation_round_trip_matches_fresh_grid() {
  let mut calendar = team_calendar();
  calendar.next().expect("next");
  assert_eq!(calendar.reference_date(), date(2026, 3, 17));
  assert!(
    calendar
      .placements()
      .iter()
      .any(|placement| {
        calendar
          .event(placement.event_id)
          .is_some_and(|event| event.name == "Retro")
      })
  );

  calendar.prev().expect("prev");
  assert_eq!(calendar.reference_date(), date(2026, 2, 17));

  let mut fresh =
    build_grid(date(2026, 2, 17), calendar.config());
  let placements = place_events(
    &mut fresh,
    calendar.events(),
    calendar.config().visible_slots
  );
  assert_eq!(calendar.grid(), &fresh);
  assert_eq!(calendar.placements(), placements.as_slice());
}

#[test]
fn round_trip_keeps_late_month_start_window() {
  for month_start in [29, 30, 31] {
    for start in [
      date(2026, 1, 29),
      date(2026, 1, 30),
      date(2026, 1, 31),
      date(2026, 3, 31),
      date(2024, 1, 31)
    ] {
      let mut calendar = Calendar::from_json(&json!({
        "date": start.to_string(),
        "monthStart": month_start,
        "events": [
          { "name": "Close", "start": start.to_string() }
        ]
      }))
      .expect("valid options");
      let original = calendar.grid().clone();

      calendar.next().expect("next");
      calendar.prev().expect("prev");
      assert_eq!(
        calendar.reference_date(),
        start,
        "monthStart {month_start} from {start}"
      );
      assert_eq!(calendar.grid(), &original);

      calendar.prev().expect("prev");
      calendar.next().expect("next");
      assert_eq!(calendar.grid(), &original);
    }
  }
}

#[test]
fn header_commands_drive_navigation() {
  let mut calendar = team_calendar();
  let items = calendar.header_items();
  let texts: Vec<_> =
    items.iter().map(|item| item.text.as_str()).collect();
  assert_eq!(texts, vec!["Prev", "February 2026", "Next"]);

  let next = items[2].command.clone().expect("next command");
  assert!(calendar.fire_command(&next).expect("fired"));
  assert_eq!(
    calendar.header_items()[1].text,
    "March 2026"
  );
  assert!(calendar.fire_command("prev").expect("fired"));
  assert!(calendar.fire_command("prev").expect("fired"));
  assert_eq!(
    calendar.header_items()[1].text,
    "January 2026"
  );
}

#[test]
fn custom_commands_are_per_instance() {
  let mut first = team_calendar();
  let mut second = team_calendar();
  first.add_command(
    "today",
    Arc::new(|calendar: &mut Calendar| {
      calendar.go_to(date(2026, 6, 1))
    })
  );

  assert!(first.fire_command("today").expect("fired"));
  assert_eq!(first.reference_date(), date(2026, 6, 1));
  assert!(!second.fire_command("today").expect("ignored"));
  assert_eq!(second.reference_date(), date(2026, 2, 17));
}

#[test]
fn malformed_event_fails_construction() {
  let error = Calendar::from_json(&json!({
    "date": "2026-02-17",
    "events": [
      { "name": "Standup", "start": "2026-02-17T09:00" },
      { "name": "Broken" }
    ]
  }))
  .expect_err("second event has no start");
  assert!(matches!(
    error,
    CalendarError::MalformedEvent { index: 1, .. }
  ));
  assert!(error.to_string().starts_with("Company Calendar Error:"));
}

#[test]
fn mount_requires_a_matching_target() {
  let mut calendar = team_calendar();
  let error = calendar
    .mount(Box::new(Recorder::default()))
    .expect_err("no targets");
  assert!(matches!(
    error,
    CalendarError::Mount { ref selector } if selector == "#calendar"
  ));

  let draws = Rc::new(RefCell::new(vec![]));
  calendar
    .mount(Box::new(Recorder {
      targets: 1,
      draws:   Rc::clone(&draws)
    }))
    .expect("mounted");
  calendar.next().expect("next");
  assert_eq!(draws.borrow().as_slice(), &[
    (date(2026, 2, 17), 2),
    (date(2026, 3, 17), 1)
  ]);
}

#[test]
fn drag_moves_event_and_locks_other_drags() {
  let mut calendar = team_calendar();
  let offsite = calendar.events()[1].id;
  let standup = calendar.events()[0].id;

  // Grabbed by its second day.
  assert!(calendar.begin_drag(offsite, date(2026, 2, 20)));
  assert!(!calendar.begin_drag(standup, date(2026, 2, 17)));
  assert_eq!(
    calendar.dragging().map(|session| session.event_id),
    Some(offsite)
  );

  assert!(calendar.drop_on(date(2026, 2, 25)).expect("dropped"));
  assert!(calendar.dragging().is_none());

  let moved = calendar.event(offsite).expect("still present");
  assert_eq!(
    moved.start.to_string(),
    "2026-02-24 08:00:00"
  );
  assert_eq!(
    moved.end.map(|end| end.to_string()),
    Some("2026-02-25 18:00:00".to_string())
  );
  let placement = calendar.placement(offsite).expect("placed");
  assert_eq!(placement.days, vec![
    date(2026, 2, 24),
    date(2026, 2, 25)
  ]);
  assert_eq!(placement.slot, 0);

  assert!(calendar.begin_drag(standup, date(2026, 2, 17)));
  assert!(calendar.cancel_drag());
  assert_eq!(
    calendar.event(standup).map(|event| event.start.to_string()),
    Some("2026-02-17 09:00:00".to_string())
  );
}

#[test]
fn text_renderer_draws_month_table() {
  let mut calendar = team_calendar();
  let buffer = SharedBuffer::default();
  calendar
    .mount(Box::new(
      TextRenderer::new(buffer.clone()).with_target("#calendar")
    ))
    .expect("mounted");

  let text = buffer.take_text();
  let mut lines = text.lines();
  assert_eq!(
    lines.next(),
    Some("[Prev]  February 2026  [Next]")
  );
  let labels = lines.next().expect("day names row");
  assert!(labels.starts_with("| Mon"));
  assert!(labels.trim_end().ends_with("Sun |"));
  assert!(text.contains("Standup"));
  assert!(text.contains("Offsite>"));
  assert!(text.contains("<Offsite"));
  assert!(!text.contains("Retro"));
}

#[test]
fn options_load_from_toml_file() {
  let mut file = NamedTempFile::new().expect("temp file");
  writeln!(
    file,
    r#"
date = "2026-02-17"
weekStart = 2
excludeWeekends = true

[header]
center = ["format(%b %Y)"]

[[events]]
name = "Planning"
start = "2026-02-16T10:00"
"#
  )
  .expect("write options");

  let text =
    std::fs::read_to_string(file.path()).expect("read options");
  let calendar = Calendar::from_toml_str(&text).expect("valid toml");
  assert_eq!(calendar.config().week_start_day, 1);
  assert_eq!(calendar.header_items()[0].text, "Feb 2026");
  assert_eq!(calendar.placements().len(), 1);
  assert!(
    calendar
      .grid()
      .weeks
      .iter()
      .all(|week| week.days.len() == 5)
  );
}
