//! # CLI Module
//!
//! Command-line front end of the `resthost` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Host the sample calculator/object-store service over HTTP until
//! SIGINT or SIGTERM:
//!
//! ```bash
//! resthost serve --config host.yaml
//! resthost serve --addr 127.0.0.1:9200
//! ```
//!
//! Options:
//! - `--config <FILE>` - host configuration (see [`crate::config`]); also
//!   read from `RESTHOST_CONFIG`
//! - `--addr <HOST:PORT>` - serve an extra endpoint at `http://HOST:PORT/`
//!
//! Without a config file or `--addr` the service listens on
//! `http://127.0.0.1:9200/`.
//!
//! ### `routes`
//!
//! Compile the configured endpoints and print every operation with the
//! matcher generated for its template:
//!
//! ```bash
//! resthost routes --config host.yaml
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use resthost::cli::{Cli, run_cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{build_service, run_cli, Cli, Commands, DEFAULT_ADDR};
