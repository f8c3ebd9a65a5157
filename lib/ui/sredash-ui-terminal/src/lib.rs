//! Command-line host for the dashboard.

pub mod cli;
pub mod render;
pub mod runner;

pub use cli::{Cli, Command};
pub use render::summary_lines;
pub use runner::{execute, run};
