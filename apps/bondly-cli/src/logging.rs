//! Tracing/logging bootstrap for the terminal client.

use std::{env, io};

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,bondly_cli=debug,client_http=debug";

/// Initialize global tracing subscriber with severity gating from environment.
///
/// Output goes to stderr so the REPL on stdout stays readable.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `BONDLY_CLI_LOG`
/// 3) `BONDLY_LOG`
/// 4) internal default filter
pub fn init() {
    let env_filter = filter_from_env();
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_env_filter(env_filter)
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    for key in ["BONDLY_CLI_LOG", "BONDLY_LOG"] {
        if let Some(value) = env::var(key).ok().filter(|v| !v.trim().is_empty())
            && let Ok(filter) = EnvFilter::try_new(value)
        {
            return filter;
        }
    }

    EnvFilter::new(DEFAULT_FILTER)
}
