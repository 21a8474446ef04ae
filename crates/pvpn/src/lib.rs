//! # ProtonVPN CLI Front-End Library
//!
//! This library wraps the ProtonVPN command-line client: it reads and writes
//! the client's settings and credentials, loads its cached server list, runs
//! its commands, and tracks the connection state for a desktop front-end.

pub mod cli;
pub mod config;
pub mod countries;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod probe;
pub mod profile;
pub mod servers;
pub mod utils;

// Re-export commonly used items
pub use cli::{ConnectTarget, ProtonCli};
pub use config::CliConfig;
pub use error::{CliError, ErrorCategory};
pub use logger::init_logger;
pub use utils::{get_app_data_dir, CliPaths};
