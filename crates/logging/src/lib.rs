#![warn(missing_docs)]

//! Shared logging CLI arguments and tracing filter helpers for the focus-origin workspace.
//!
//! Binaries flatten [`LogArgs`] into their CLI, turn it into a filter directive with
//! [`compute_spec`], and install it with [`env_filter_from_spec`].

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "focus_origin=trace,focus_replay=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Filter spec for these arguments, see [`compute_spec`].
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &["focus_origin", "focus_replay", "logging"]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    /// Minimal binary CLI embedding the shared flags.
    #[derive(Parser, Debug)]
    struct TestCli {
        /// Flattened logging flags.
        #[command(flatten)]
        log: LogArgs,
    }

    #[test]
    fn level_spec_covers_every_crate() {
        let spec = level_spec_for("DEBUG");
        assert_eq!(spec, "focus_origin=debug,focus_replay=debug,logging=debug");
    }

    #[test]
    fn explicit_filter_wins() {
        let spec = compute_spec(false, false, Some("warn"), Some("focus_origin=trace"));
        assert_eq!(spec, "focus_origin=trace");
    }

    #[test]
    fn trace_beats_debug_and_level() {
        assert_eq!(compute_spec(true, true, Some("warn"), None), level_spec_for("trace"));
        assert_eq!(compute_spec(false, true, Some("warn"), None), level_spec_for("debug"));
        assert_eq!(compute_spec(false, false, Some("warn"), None), level_spec_for("warn"));
    }

    #[test]
    fn flags_parse_into_spec() {
        let cli = TestCli::parse_from(["test", "--log-level", "error"]);
        assert_eq!(cli.log.spec(), level_spec_for("error"));

        let cli = TestCli::parse_from(["test", "--trace"]);
        assert!(cli.log.trace);
        assert_eq!(cli.log.spec(), level_spec_for("trace"));
    }

    #[test]
    fn trace_conflicts_with_filter() {
        let res = TestCli::try_parse_from(["test", "--trace", "--log-filter", "x=info"]);
        assert!(res.is_err());
    }
}
