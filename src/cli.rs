// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build static-site assets from src/ into dist/, optionally serving and watching.",
    long_about = None
)]
pub struct CliArgs {
    /// Entry point to run. Omit to build in development mode and start the
    /// watch server.
    #[arg(value_enum, value_name = "TASK")]
    pub task: Option<EntryPoint>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory. A missing
    /// file at the default path means "use built-in defaults".
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: String,

    /// Run the selected task in development mode (source maps, no
    /// minification or image recompression).
    #[arg(long)]
    pub dev: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config and print the task plan, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Named entry points, one per task or aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum EntryPoint {
    Html,
    #[value(alias = "css")]
    Style,
    Js,
    Img,
    Webp,
    Avif,
    #[value(name = "critCSS", alias = "crit-css")]
    CritCss,
    Copy,
    Favicon,
    Server,
    Clear,
    Develop,
    Base,
    Build,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
