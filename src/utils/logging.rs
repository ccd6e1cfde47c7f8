//! Logging macros gated by a per-module `ENABLE_LOGS` switch.
//!
//! A module opts in by declaring the flag next to its imports:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("sweep expired {} notifications", count);
//! ```
//! Flipping the flag to `false` silences that module without touching the
//! global `RUST_LOG` filter.

/// `log::debug!` when the calling module has `ENABLE_LOGS = true`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` when the calling module has `ENABLE_LOGS = true`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module has `ENABLE_LOGS = true`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
