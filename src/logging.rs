//! Logger bootstrap.
//! `env_logger` on stderr, `info` unless `RUST_LOG` says otherwise.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the logger. Calling this more than once is a no-op.
pub fn init() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        // Fails only if another logger is already installed; keep that one.
        let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        log::info!("logger initialized twice without panicking");
    }
}
