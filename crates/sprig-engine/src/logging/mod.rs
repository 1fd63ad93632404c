//! Logging utilities.
//!
//! This module centralizes logger initialization and the deduplicated soft-error
//! reporting used by the renderer. Everything goes through the `log` facade.

mod init;
mod warn_once;

pub use init::{init_logging, LoggingConfig};
pub use warn_once::WarnOnce;
