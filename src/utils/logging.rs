//! Logging setup plus per-module switchable log macros.
//!
//! The macros expand to the matching `log` call only when the calling module
//! defines `const ENABLE_LOGS: bool = true;`. The capture path uses them so a
//! noisy module can be silenced without touching `RUST_LOG`.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("frame queued");
//! ```

use log::LevelFilter;

const DEBUG_ENV: &str = "SIGNCAM_DEBUG";

/// Install the global `env_logger`. Safe to call more than once.
///
/// `RUST_LOG` still wins for per-target filters; `SIGNCAM_DEBUG=1` lowers the
/// default level to `Debug`.
pub fn init_logging() {
    let level = if debug_enabled() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
