//! Subcommand implementations.

pub mod init;
pub mod inject_otel;
pub mod link;
pub mod start_dashboard;
pub mod status;
pub mod stop;
