//! Test logging setup
//!
//! The backend passes log through the `log` facade (`debug!` for
//! per-function analysis decisions, `trace!` for per-value detail); the
//! driver that owns the process picks the sink. Tests route records through
//! `env_logger`'s capture-friendly test mode so `RUST_LOG=compiler=debug`
//! surfaces pass output inside `cargo test`.

use log::LevelFilter;

/// Initialize capture-friendly logging for tests; safe to call from every
/// test, repeated calls are no-ops.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test();
        init_test();
        log::debug!("captured by the test harness");
    }
}
