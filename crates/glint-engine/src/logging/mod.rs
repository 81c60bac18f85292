//! Logging setup.
//!
//! The crate logs through the `log` facade only; `init_logging` installs
//! `env_logger` for binaries that want it.

mod init;

pub use init::{init_logging, LoggingConfig};
