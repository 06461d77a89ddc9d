use std::collections::HashMap;
use std::io::Write;

use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::event::{
  Event,
  EventId
};
use crate::grid::{
  Day,
  Grid
};
use crate::header::RenderedHeaderItem;
use crate::placement::Placement;

/// What a renderer gets to draw: the
/// current state of one calendar,
/// borrowed.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView<'a> {
  pub reference_date: NaiveDate,
  pub header:         Vec<RenderedHeaderItem>,
  /// `None` when day names are turned off.
  pub day_names:      Option<Vec<&'static str>>,
  pub edge_borders:   bool,
  pub visible_slots:  usize,
  pub grid:           &'a Grid,
  pub placements:     &'a [Placement],
  pub events:         &'a [Event]
}

impl CalendarView<'_> {
  #[must_use]
  pub fn event(
    &self,
    id: EventId
  ) -> Option<&Event> {
    self
      .events
      .iter()
      .find(|event| event.id == id)
  }

  /// Number of placements on `day` that
  /// do not fit the visible rows.
  #[must_use]
  pub fn hidden_count(
    &self,
    day: &Day
  ) -> usize {
    day
      .placements
      .iter()
      .filter(|entry| entry.hidden)
      .count()
  }
}

/// Draws calendars somewhere. Browser,
/// terminal and test hosts each bring their
/// own.
pub trait Renderer {
  /// Attaches to every target matching
  /// `selector` and returns how many were
  /// found.
  fn mount(
    &mut self,
    selector: &str
  ) -> usize;

  fn draw(
    &mut self,
    view: &CalendarView<'_>
  ) -> anyhow::Result<()>;
}

/// Plain-text month table.
pub struct TextRenderer<W: Write> {
  writer:  W,
  targets: Vec<String>,
  color:   bool
}

impl<W: Write> TextRenderer<W> {
  pub fn new(writer: W) -> Self {
    Self {
      writer,
      targets: vec![],
      color: false
    }
  }

  /// Makes `selector` mountable.
  #[must_use]
  pub fn with_target(
    mut self,
    selector: impl Into<String>
  ) -> Self {
    self.targets.push(selector.into());
    self
  }

  /// Marks overflow days and "+more"
  /// markers with ANSI dim.
  #[must_use]
  pub fn with_color(
    mut self,
    color: bool
  ) -> Self {
    self.color = color;
    self
  }

  pub fn into_inner(self) -> W {
    self.writer
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }

  fn day_cells(
    &self,
    view: &CalendarView<'_>,
    names: &HashMap<EventId, &str>
  ) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for week in &view.grid.weeks {
      let mut dates = Vec::new();
      let used_rows = week
        .days
        .iter()
        .flat_map(|day| day.placements.iter())
        .filter(|entry| !entry.hidden)
        .map(|entry| entry.slot + 1)
        .max()
        .unwrap_or(0)
        .min(view.visible_slots);
      let mut lines: Vec<Vec<String>> =
        vec![vec![]; used_rows];
      let mut more = Vec::new();

      for day in &week.days {
        let number = day.date.day().to_string();
        dates.push(if day.is_overflow {
          self.paint(&number, "2")
        } else {
          number
        });

        for (slot, line) in
          lines.iter_mut().enumerate()
        {
          let text = day
            .placements
            .iter()
            .find(|entry| {
              entry.slot == slot && !entry.hidden
            })
            .map(|entry| {
              let name = names
                .get(&entry.event_id)
                .copied()
                .unwrap_or("?");
              format!(
                "{}{}{}",
                if entry.continues_before {
                  "<"
                } else {
                  ""
                },
                name,
                if entry.continues_after {
                  ">"
                } else {
                  ""
                }
              )
            })
            .unwrap_or_default();
          line.push(text);
        }

        let hidden = view.hidden_count(day);
        more.push(if hidden > 0 {
          self.paint(&format!("+{hidden} more"), "2")
        } else {
          String::new()
        });
      }

      rows.push(dates);
      rows.extend(lines.into_iter().filter(
        |line| line.iter().any(|cell| !cell.is_empty())
      ));
      if more.iter().any(|cell| !cell.is_empty()) {
        rows.push(more);
      }
    }
    rows
  }
}

impl<W: Write> Renderer for TextRenderer<W> {
  fn mount(
    &mut self,
    selector: &str
  ) -> usize {
    self
      .targets
      .iter()
      .filter(|target| target.as_str() == selector)
      .count()
  }

  fn draw(
    &mut self,
    view: &CalendarView<'_>
  ) -> anyhow::Result<()> {
    let names: HashMap<EventId, &str> = view
      .events
      .iter()
      .map(|event| (event.id, event.name.as_str()))
      .collect();

    if !view.header.is_empty() {
      let line = view
        .header
        .iter()
        .map(|item| match &item.command {
          | Some(_) => format!("[{}]", item.text),
          | None => item.text.clone()
        })
        .collect::<Vec<_>>()
        .join("  ");
      writeln!(self.writer, "{line}")?;
    }

    let columns = view
      .grid
      .weeks
      .iter()
      .map(|week| week.days.len())
      .max()
      .unwrap_or(0);
    let headers = match &view.day_names {
      | Some(labels) => labels
        .iter()
        .map(ToString::to_string)
        .collect(),
      | None => vec![String::new(); columns]
    };
    let rows = self.day_cells(view, &names);

    write_table(
      &mut self.writer,
      headers,
      rows,
      view.edge_borders
    )?;
    self.writer.flush()?;
    Ok(())
  }
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>,
  edge_borders: bool
) -> anyhow::Result<()> {
  let column_count = headers.len();
  let mut widths = vec![0usize; column_count];

  for (idx, header) in
    headers.iter().enumerate()
  {
    widths[idx] = widths[idx]
      .max(UnicodeWidthStr::width(header.as_str()));
  }
  for row in &rows {
    for (idx, cell) in
      row.iter().enumerate().take(column_count)
    {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  let edge = if edge_borders { "|" } else { "" };
  let write_row = |writer: &mut W,
                   cells: &[String]|
   -> anyhow::Result<()> {
    write!(writer, "{edge}")?;
    for (idx, width) in
      widths.iter().enumerate()
    {
      let cell = cells
        .get(idx)
        .map(String::as_str)
        .unwrap_or_default();
      let visible =
        UnicodeWidthStr::width(strip_ansi(cell).as_str());
      let padding = width.saturating_sub(visible);
      let separator = if idx + 1 == column_count {
        edge
      } else {
        "|"
      };
      write!(
        writer,
        " {cell}{} {separator}",
        " ".repeat(padding)
      )?;
    }
    writeln!(writer)?;
    Ok(())
  };

  write_row(&mut writer, &headers)?;
  write!(writer, "{edge}")?;
  for (idx, width) in widths.iter().enumerate()
  {
    let separator = if idx + 1 == column_count {
      edge
    } else {
      "+"
    };
    write!(
      writer,
      "{:-<width$}{separator}",
      "",
      width = width + 2
    )?;
  }
  writeln!(writer)?;

  for row in &rows {
    write_row(&mut writer, row)?;
  }

  Ok(())
}

fn strip_ansi(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut escaped = false;

  for ch in text.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }
    if ch == '\x1b' {
      escaped = true;
      continue;
    }
    out.push(ch);
  }

  out
}
