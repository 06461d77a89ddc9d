use std::collections::BTreeMap;
use std::fmt;
use std::sync::{
  Arc,
  OnceLock
};

use tracing::debug;

use crate::controller::Calendar;
use crate::error::Result;

/// A named action a header item can
/// trigger.
pub type CommandHandler = Arc<
  dyn Fn(&mut Calendar) -> Result<()>
    + Send
    + Sync
>;

/// Commands every calendar understands.
pub const BUILTIN_COMMANDS: [&str; 2] =
  ["next", "prev"];

fn builtin_commands()
-> &'static BTreeMap<&'static str, CommandHandler>
{
  static BUILTINS: OnceLock<
    BTreeMap<&'static str, CommandHandler>
  > = OnceLock::new();
  BUILTINS.get_or_init(|| {
    let next: CommandHandler =
      Arc::new(|calendar: &mut Calendar| {
        calendar.next()
      });
    let prev: CommandHandler =
      Arc::new(|calendar: &mut Calendar| {
        calendar.prev()
      });
    BTreeMap::from([
      ("next", next),
      ("prev", prev)
    ])
  })
}

/// Per-calendar commands layered over the
/// shared builtins. A registered name
/// shadows a builtin of the same name for
/// this calendar only.
#[derive(Clone, Default)]
pub struct CommandRegistry {
  custom: BTreeMap<String, CommandHandler>
}

impl fmt::Debug for CommandRegistry {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("CommandRegistry")
      .field("names", &self.names())
      .finish()
  }
}

impl CommandRegistry {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(
    &mut self,
    name: impl Into<String>,
    handler: CommandHandler
  ) {
    let name = name.into();
    debug!(command = %name, "registered command");
    self.custom.insert(name, handler);
  }

  #[must_use]
  pub fn resolve(
    &self,
    name: &str
  ) -> Option<CommandHandler> {
    self
      .custom
      .get(name)
      .or_else(|| builtin_commands().get(name))
      .cloned()
  }

  #[must_use]
  pub fn contains(
    &self,
    name: &str
  ) -> bool {
    self.custom.contains_key(name)
      || builtin_commands().contains_key(name)
  }

  /// Every resolvable name, sorted.
  #[must_use]
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> =
      builtin_commands()
        .keys()
        .map(|name| (*name).to_string())
        .chain(self.custom.keys().cloned())
        .collect();
    names.sort();
    names.dedup();
    names
  }
}
