// Tracing setup for binaries embedding the core
//
// The core only emits events; installing a subscriber is left to the host.
// Every driver run is wrapped in an `effect_program` span carrying the
// program's type name, and each dispatched effect is a `debug` event inside
// it, so the layers below keep the span attached to every line.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    EnvFilter, Registry,
};

/// Crates whose events a bare level applies to
const EFFECTFUL_TARGETS: &[&str] = &["effectful_core", "effectful_memory"];

/// Level kept for every other crate when a bare level is given
const OTHER_TARGETS_LEVEL: &str = "warn";

/// Expand `log_level` into filter directives.
///
/// A bare level such as `"debug"` applies to the effectful crates only and
/// leaves everything else at `warn`, so program traces are not drowned out
/// by the host's dependencies. Anything else is taken as directives as-is.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    let is_bare_level = matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    );
    if !is_bare_level {
        return level.to_string();
    }

    let mut directives = vec![OTHER_TARGETS_LEVEL.to_string()];
    directives.extend(EFFECTFUL_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.join(",")
}

//-----------------------------------------------------------------------------
// Tracing Initialization
//-----------------------------------------------------------------------------

/// Installs a global subscriber for effect program traces.
///
/// # Arguments
///
/// * `log_level`: a bare level (see [`filter_directives`]) or full filter
///   directives, defaulting to `"info"`. `RUST_LOG` takes precedence when set.
/// * `json_output`: emit one JSON object per event, with the enclosing
///   `effect_program` span's fields. Defaults to `false`.
///
/// Program runs are reported on span close with their busy and idle time.
///
/// Fails if the directives do not parse or a global subscriber is already
/// installed.
pub fn init_tracing(log_level: Option<&str>, json_output: Option<bool>) -> Result<()> {
    let directives = filter_directives(log_level.unwrap_or("info"));
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directives))?;

    let subscriber = Registry::default().with(env_filter);

    if json_output.unwrap_or(false) {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_span_list(false);
        tracing::subscriber::set_global_default(subscriber.with(json_layer))?;
    } else {
        let fmt_layer = fmt::layer()
            .compact()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false);
        tracing::subscriber::set_global_default(subscriber.with(fmt_layer))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_scopes_to_effectful_crates() {
        assert_eq!(
            filter_directives("debug"),
            "warn,effectful_core=debug,effectful_memory=debug"
        );
        assert_eq!(
            filter_directives(" TRACE "),
            "warn,effectful_core=TRACE,effectful_memory=TRACE"
        );
    }

    #[test]
    fn test_directives_pass_through() {
        assert_eq!(
            filter_directives("effectful_core[effect_program]=debug,info"),
            "effectful_core[effect_program]=debug,info"
        );
        assert!(EnvFilter::try_new(filter_directives("info")).is_ok());
    }

    #[test]
    fn test_second_init_is_rejected() {
        // Whichever call wins, the global default can only be set once
        let _ = init_tracing(Some("debug"), None);
        assert!(init_tracing(Some("debug"), Some(true)).is_err());
    }
}
