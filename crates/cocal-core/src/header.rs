use std::fmt::Write;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{
  Captures,
  Regex
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

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
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPosition {
  Left,
  Center,
  Right
}

impl HeaderPosition {
  pub fn all() -> [Self; 3] {
    [Self::Left, Self::Center, Self::Right]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Left => "left",
      | Self::Center => "center",
      | Self::Right => "right"
    }
  }
}

/// One `"text::command"` entry.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct HeaderItem {
  pub text:    String,
  pub command: Option<String>
}

impl HeaderItem {
  #[must_use]
  pub fn parse(raw: &str) -> Self {
    let mut parts = raw.split("::");
    let text = parts
      .next()
      .unwrap_or_default()
      .trim()
      .to_string();
    let command = parts
      .next()
      .map(str::trim)
      .filter(|command| !command.is_empty())
      .map(ToString::to_string);
    Self { text, command }
  }

  /// The text with every `format(<fmt>)`
  /// replaced by `date` rendered through
  /// strftime. Invalid format strings are
  /// left as written.
  #[must_use]
  pub fn display_text(
    &self,
    date: NaiveDate
  ) -> String {
    FORMAT_RE
      .replace_all(
        &self.text,
        |caps: &Captures<'_>| {
          let mut out = String::new();
          match write!(
            out,
            "{}",
            date.format(&caps[1])
          ) {
            | Ok(()) => out,
            | Err(_) => {
              warn!(
                format = &caps[1],
                "invalid header date format"
              );
              caps[0].to_string()
            }
          }
        }
      )
      .into_owned()
  }

  #[must_use]
  pub fn is_actionable(&self) -> bool {
    self.command.is_some()
  }
}

/// `format(<fmt>)` with a lazy capture so
/// several calls on one line stay apart.
static FORMAT_RE: LazyLock<Regex> =
  LazyLock::new(|| {
    Regex::new(r"format\((.*?)\)")
      .expect("header format pattern compiles")
  });

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct HeaderConfig {
  pub left:   Vec<HeaderItem>,
  pub center: Vec<HeaderItem>,
  pub right:  Vec<HeaderItem>
}

/// A header item as shown for one
/// reference date.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct RenderedHeaderItem {
  pub position: HeaderPosition,
  pub text:     String,
  pub command:  Option<String>
}

impl HeaderConfig {
  pub fn from_json(
    raw: &Value
  ) -> Result<Self> {
    let Some(object) = raw.as_object()
    else {
      return Err(CalendarError::config(
        "header must be an object"
      ));
    };

    for key in object.keys() {
      if !HeaderPosition::all()
        .iter()
        .any(|position| {
          position.as_key() == key
        })
      {
        warn!(
          key = %key,
          "ignoring unknown header position"
        );
      }
    }

    let mut header = Self::default();
    for position in HeaderPosition::all() {
      let key = position.as_key();
      let items = match object.get(key) {
        | None | Some(Value::Null) => {
          continue;
        }
        | Some(Value::Array(items)) => {
          items
        }
        | Some(_) => {
          return Err(CalendarError::config(
            format!(
              "header item at position \
               \"{key}\" must be an array"
            )
          ));
        }
      };

      let parsed = items
        .iter()
        .map(|item| {
          item
            .as_str()
            .map(HeaderItem::parse)
            .ok_or_else(|| {
              CalendarError::config(format!(
                "header items at position \
                 \"{key}\" must be strings"
              ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
      *header.items_mut(position) = parsed;
    }

    Ok(header)
  }

  #[must_use]
  pub fn items(
    &self,
    position: HeaderPosition
  ) -> &[HeaderItem] {
    match position {
      | HeaderPosition::Left => &self.left,
      | HeaderPosition::Center => {
        &self.center
      }
      | HeaderPosition::Right => {
        &self.right
      }
    }
  }

  fn items_mut(
    &mut self,
    position: HeaderPosition
  ) -> &mut Vec<HeaderItem> {
    match position {
      | HeaderPosition::Left => {
        &mut self.left
      }
      | HeaderPosition::Center => {
        &mut self.center
      }
      | HeaderPosition::Right => {
        &mut self.right
      }
    }
  }

  /// Items in left, center, right order
  /// with their text resolved for `date`.
  #[must_use]
  pub fn render(
    &self,
    date: NaiveDate
  ) -> Vec<RenderedHeaderItem> {
    HeaderPosition::all()
      .into_iter()
      .flat_map(|position| {
        self.items(position).iter().map(
          move |item| RenderedHeaderItem {
            position,
            text: item.display_text(date),
            command: item.command.clone()
          }
        )
      })
      .collect()
  }
}
