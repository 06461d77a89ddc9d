use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
  #[error(
    "Company Calendar Error: {0}"
  )]
  Config(String),

  #[error(
    "Company Calendar Error: event \
     #{index} is malformed: {reason}"
  )]
  MalformedEvent {
    index:  usize,
    reason: String
  },

  #[error(
    "Company Calendar Error: event \
     #{index} field `{field}` must be \
     {expected}"
  )]
  EventType {
    index:    usize,
    field:    &'static str,
    expected: &'static str
  },

  #[error(
    "Company Calendar Error: no \
     elements found matching the \
     given selector `{selector}`"
  )]
  Mount { selector: String },

  #[error("render failed: {0:#}")]
  Render(anyhow::Error)
}

pub type Result<T> =
  std::result::Result<T, CalendarError>;

impl CalendarError {
  pub(crate) fn config(
    message: impl Into<String>
  ) -> Self {
    Self::Config(message.into())
  }

  pub(crate) fn malformed(
    index: usize,
    reason: impl Into<String>
  ) -> Self {
    Self::MalformedEvent {
      index,
      reason: reason.into()
    }
  }
}
