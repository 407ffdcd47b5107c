use std::{
    str::FromStr,
    sync::Once,
};

use tracing_core::Level;

/// Environment variable overriding the log level of test binaries, such as `trace` to see every
/// frame a listener or client handles.
pub const LOG_LEVEL_VAR: &str = "WAMP_TEST_LOG_LEVEL";

static INIT: Once = Once::new();

fn log_level() -> Level {
    std::env::var(LOG_LEVEL_VAR)
        .ok()
        .and_then(|level| Level::from_str(&level).ok())
        .unwrap_or(Level::DEBUG)
}

/// Installs a global subscriber that prints `log` and `tracing` records for the test binary.
///
/// Safe to call from every test; only the first call has an effect.
pub fn setup_test_environment() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(log_level())
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    });
}
