use std::fmt;

use chrono::{
  Datelike,
  NaiveDate
};
use serde_json::Value;
use tracing::{
  debug,
  info,
  warn
};

use crate::commands::{
  CommandHandler,
  CommandRegistry
};
use crate::config::{
  CalendarOptions,
  Config
};
use crate::datetime;
use crate::drag::{
  DragSession,
  recompute_span
};
use crate::error::{
  CalendarError,
  Result
};
use crate::event::{
  Event,
  EventId,
  ingest_events
};
use crate::grid::{
  DayIndex,
  Grid,
  build_grid,
  weekday_labels
};
use crate::header::{
  HeaderConfig,
  RenderedHeaderItem
};
use crate::placement::{
  Placement,
  place_events
};
use crate::render::{
  CalendarView,
  Renderer
};

/// One calendar instance: the reference
/// date, its grid and placements, and the
/// commands and drag state that mutate
/// them.
pub struct Calendar {
  reference_date: NaiveDate,
  /// Day of month navigation aims for;
  /// the reference date may sit on a
  /// clamped day in shorter months.
  anchor_day:     u32,
  config:         Config,
  header:         Option<HeaderConfig>,
  selector:       Option<String>,
  events:         Vec<Event>,
  raw_events:     Value,
  grid:           Grid,
  placements:     Vec<Placement>,
  commands:       CommandRegistry,
  drag:           Option<DragSession>,
  renderer:       Option<Box<dyn Renderer>>
}

impl fmt::Debug for Calendar {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("Calendar")
      .field("reference_date", &self.reference_date)
      .field("weeks", &self.grid.weeks.len())
      .field("events", &self.events.len())
      .field("placements", &self.placements.len())
      .field("commands", &self.commands)
      .field("drag", &self.drag)
      .field("mounted", &self.renderer.is_some())
      .finish_non_exhaustive()
  }
}

impl Calendar {
  /// Builds the grid and places events
  /// immediately.
  #[tracing::instrument(skip_all)]
  pub fn new(options: CalendarOptions) -> Self {
    let CalendarOptions {
      reference_date,
      config,
      header,
      events,
      selector,
      raw_events
    } = options;

    let mut grid =
      build_grid(reference_date, &config);
    let placements = place_events(
      &mut grid,
      &events,
      config.visible_slots
    );
    info!(
      reference = %reference_date,
      weeks = grid.weeks.len(),
      placed = placements.len(),
      "calendar created"
    );

    Self {
      reference_date,
      anchor_day: reference_date.day(),
      config,
      header,
      selector,
      events,
      raw_events,
      grid,
      placements,
      commands: CommandRegistry::new(),
      drag: None,
      renderer: None
    }
  }

  pub fn from_json(value: &Value) -> Result<Self> {
    CalendarOptions::from_json(value).map(Self::new)
  }

  pub fn from_json_str(text: &str) -> Result<Self> {
    CalendarOptions::from_json_str(text)
      .map(Self::new)
  }

  pub fn from_toml_str(text: &str) -> Result<Self> {
    CalendarOptions::from_toml_str(text)
      .map(Self::new)
  }

  /// Attaches `renderer` and draws. With a
  /// selector configured, the renderer must
  /// find at least one target for it.
  #[tracing::instrument(skip_all)]
  pub fn mount(
    &mut self,
    mut renderer: Box<dyn Renderer>
  ) -> Result<()> {
    if let Some(selector) = &self.selector {
      let found = renderer.mount(selector);
      if found == 0 {
        return Err(CalendarError::Mount {
          selector: selector.clone()
        });
      }
      debug!(
        selector = %selector,
        targets = found,
        "mounted renderer"
      );
    }
    self.renderer = Some(renderer);
    self.redraw()
  }

  /// Drops the renderer, handing it back.
  pub fn unmount(
    &mut self
  ) -> Option<Box<dyn Renderer>> {
    self.renderer.take()
  }

  pub fn next(&mut self) -> Result<()> {
    self.shift_by_months(1)
  }

  pub fn prev(&mut self) -> Result<()> {
    self.shift_by_months(-1)
  }

  /// Moves the reference date by whole
  /// months and rebuilds. The day of month
  /// is clamped to the target month but
  /// restored once a longer month allows
  /// it, so `next` then `prev` lands on
  /// the starting date.
  #[tracing::instrument(skip(self))]
  pub fn shift_by_months(
    &mut self,
    months: i32
  ) -> Result<()> {
    let (year, month) =
      datetime::shift_year_month(
        self.reference_date.year(),
        self.reference_date.month(),
        months
      );
    let reference = datetime::clamped_month_day(
      year,
      month,
      self.anchor_day
    );
    self.navigate(reference)
  }

  /// Jumps to the window containing
  /// `reference`.
  pub fn go_to(
    &mut self,
    reference: NaiveDate
  ) -> Result<()> {
    self.anchor_day = reference.day();
    self.navigate(reference)
  }

  fn navigate(
    &mut self,
    reference: NaiveDate
  ) -> Result<()> {
    if self.config.reingest_events {
      self.events = ingest_events(
        &self.raw_events,
        &self.config
      )?;
      debug!(
        count = self.events.len(),
        "events re-ingested"
      );
    }
    self.reference_date = reference;
    self.rebuild()
  }

  /// Runs a builtin or registered command.
  /// Unknown names are ignored and yield
  /// `false`.
  pub fn fire_command(
    &mut self,
    name: &str
  ) -> Result<bool> {
    let Some(handler) = self.commands.resolve(name)
    else {
      debug!(command = %name, "unknown command ignored");
      return Ok(false);
    };
    debug!(command = %name, "firing command");
    handler(self)?;
    Ok(true)
  }

  pub fn add_command(
    &mut self,
    name: impl Into<String>,
    handler: CommandHandler
  ) {
    self.commands.register(name, handler);
  }

  pub fn commands(&self) -> &CommandRegistry {
    &self.commands
  }

  /// Picks up `event_id` from the cell for
  /// `grabbed_on`. Refused while another
  /// drag is active or when the event is
  /// unknown.
  pub fn begin_drag(
    &mut self,
    event_id: EventId,
    grabbed_on: NaiveDate
  ) -> bool {
    if let Some(active) = &self.drag {
      debug!(
        active = %active.event_id,
        requested = %event_id,
        "drag already in progress"
      );
      return false;
    }
    if !self.events.iter().any(|event| event.id == event_id)
    {
      warn!(event = %event_id, "drag of unknown event");
      return false;
    }
    debug!(
      event = %event_id,
      %grabbed_on,
      "drag started"
    );
    self.drag =
      Some(DragSession::new(event_id, grabbed_on));
    true
  }

  /// Ends the drag without moving anything.
  pub fn cancel_drag(&mut self) -> bool {
    let cancelled = self.drag.take();
    if let Some(session) = &cancelled {
      debug!(event = %session.event_id, "drag cancelled");
    }
    cancelled.is_some()
  }

  /// Drops the dragged event on
  /// `dropped_on`, then re-places every
  /// event. Returns `false` when nothing was
  /// being dragged.
  #[tracing::instrument(skip(self))]
  pub fn drop_on(
    &mut self,
    dropped_on: NaiveDate
  ) -> Result<bool> {
    let Some(session) = self.drag.take() else {
      return Ok(false);
    };
    let Some(event) = self
      .events
      .iter_mut()
      .find(|event| event.id == session.event_id)
    else {
      warn!(
        event = %session.event_id,
        "dragged event vanished"
      );
      return Ok(false);
    };

    let Some(moved) = session
      .target_start(event, dropped_on)
      .and_then(|start_on| {
        recompute_span(event, start_on)
      })
    else {
      warn!(
        event = %session.event_id,
        %dropped_on,
        "drop target out of date range; \
         event left in place"
      );
      return Ok(false);
    };
    *event = moved;
    info!(
      event = %event.id,
      name = %event.name,
      start = %event.start,
      "event moved"
    );
    self.replace()?;
    Ok(true)
  }

  /// [`Self::drop_on`] for a renderer that
  /// reports the grid cell under the
  /// pointer. A cell outside the grid
  /// cancels the drag.
  pub fn drop_at(
    &mut self,
    at: DayIndex
  ) -> Result<bool> {
    match self.grid.date_at(at) {
      | Some(date) => self.drop_on(date),
      | None => {
        debug!(?at, "drop outside the grid");
        self.cancel_drag();
        Ok(false)
      }
    }
  }

  #[must_use]
  pub fn dragging(&self) -> Option<&DragSession> {
    self.drag.as_ref()
  }

  #[must_use]
  pub fn reference_date(&self) -> NaiveDate {
    self.reference_date
  }

  #[must_use]
  pub fn config(&self) -> &Config {
    &self.config
  }

  #[must_use]
  pub fn grid(&self) -> &Grid {
    &self.grid
  }

  #[must_use]
  pub fn events(&self) -> &[Event] {
    &self.events
  }

  #[must_use]
  pub fn event(&self, id: EventId) -> Option<&Event> {
    self.events.iter().find(|event| event.id == id)
  }

  #[must_use]
  pub fn placements(&self) -> &[Placement] {
    &self.placements
  }

  #[must_use]
  pub fn placement(
    &self,
    id: EventId
  ) -> Option<&Placement> {
    self
      .placements
      .iter()
      .find(|placement| placement.event_id == id)
  }

  #[must_use]
  pub fn header_items(&self) -> Vec<RenderedHeaderItem> {
    self
      .header
      .as_ref()
      .map(|header| header.render(self.reference_date))
      .unwrap_or_default()
  }

  #[must_use]
  pub fn view(&self) -> CalendarView<'_> {
    CalendarView {
      reference_date: self.reference_date,
      header: self.header_items(),
      day_names: self
        .config
        .day_names
        .then(|| weekday_labels(&self.config)),
      edge_borders: self.config.edge_borders,
      visible_slots: self.config.visible_slots,
      grid: &self.grid,
      placements: &self.placements,
      events: &self.events
    }
  }

  /// Grid first, then placement, then the
  /// renderer.
  fn rebuild(&mut self) -> Result<()> {
    self.grid =
      build_grid(self.reference_date, &self.config);
    self.replace()
  }

  fn replace(&mut self) -> Result<()> {
    self.placements = place_events(
      &mut self.grid,
      &self.events,
      self.config.visible_slots
    );
    self.redraw()
  }

  fn redraw(&mut self) -> Result<()> {
    let Some(mut renderer) = self.renderer.take()
    else {
      return Ok(());
    };
    let drawn = renderer
      .draw(&self.view())
      .map_err(CalendarError::Render);
    self.renderer = Some(renderer);
    drawn
  }
}
