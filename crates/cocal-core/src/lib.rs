pub mod commands;
pub mod config;
pub mod controller;
pub mod datetime;
pub mod drag;
pub mod error;
pub mod event;
pub mod grid;
pub mod header;
pub mod placement;
pub mod render;
pub mod telemetry;

pub use commands::{
  CommandHandler,
  CommandRegistry
};
pub use config::{
  CalendarOptions,
  Config,
  Window
};
pub use controller::Calendar;
pub use error::{
  CalendarError,
  Result
};
pub use event::{
  Event,
  EventId
};
pub use grid::{
  Day,
  DayIndex,
  Grid,
  Week
};
pub use header::{
  HeaderConfig,
  HeaderItem
};
pub use placement::{
  DayPlacement,
  Placement
};
pub use render::{
  CalendarView,
  Renderer,
  TextRenderer
};
