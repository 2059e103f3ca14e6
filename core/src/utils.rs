//! Logging bootstrap
//!
//! The engine logs through the `log` facade. Embedders that have no
//! logger of their own can install `env_logger` with these helpers.

use std::time::Instant;

use env_logger::{Builder, Env, DEFAULT_FILTER_ENV};
use log::debug;

use crate::config::CoreConfig;

/// Install `env_logger` with `level` as the default filter.
///
/// `RUST_LOG` takes precedence when set. Returns `false` when a logger
/// was already installed, which is not an error.
pub fn init_logging(level: &str) -> bool {
    Builder::from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, level))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Install `env_logger` at the level configured in `config`
pub fn init_logging_from_config(config: &CoreConfig) -> bool {
    let level = if config.debug_mode { "debug" } else { config.log_level.as_str() };
    init_logging(level)
}

/// Run `f`, logging how long it took at debug level
pub fn measure_time<F, T>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    debug!("{} took {}ms", name, start.elapsed().as_millis());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        // a second install is refused, not a panic
        assert!(!init_logging("info"));
        assert!(!init_logging_from_config(&CoreConfig::testing()));
    }

    #[test]
    fn test_measure_time() {
        assert_eq!(measure_time("sum", || 40 + 2), 42);
    }
}
