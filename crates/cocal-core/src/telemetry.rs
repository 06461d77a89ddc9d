use std::io::IsTerminal;

use anyhow::anyhow;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset.
/// Each `verbose` step raises it, each
/// `quiet` step lowers it.
#[must_use]
pub fn default_level(
  verbose: u8,
  quiet: u8
) -> &'static str {
  match (verbose, quiet) {
    | (_, q) if q >= 2 => "error",
    | (_, 1) => "warn",
    | (v, _) if v >= 3 => "trace",
    | (2, _) => "debug",
    | (1, _) => "info",
    | _ => "warn"
  }
}

/// Installs a stderr `fmt` subscriber for
/// hosts that have none. `RUST_LOG` takes
/// precedence over the computed level.
pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level(
          verbose, quiet
        ))
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log filter: \
           {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_level(true)
      .with_writer(std::io::stderr)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(
      error = %err,
      "tracing subscriber already set, \
       continuing"
    );
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quiet_wins_over_verbose() {
    assert_eq!(default_level(3, 2), "error");
    assert_eq!(default_level(3, 1), "warn");
  }

  #[test]
  fn verbosity_steps() {
    assert_eq!(default_level(0, 0), "warn");
    assert_eq!(default_level(1, 0), "info");
    assert_eq!(default_level(2, 0), "debug");
    assert_eq!(default_level(5, 0), "trace");
  }

  #[test]
  fn second_init_is_harmless() {
    init_tracing(0, 0).expect("first init");
    init_tracing(2, 0).expect("second init");
  }
}
