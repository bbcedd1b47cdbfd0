// src/cli.rs

//! CLI argument parsing using `clap`.

use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_SUITE_FILE;

/// Command-line arguments for `suiterun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "suiterun",
    version,
    about = "Run a suite of dependent tasks with bounded parallelism and resource locks.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SUITERUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Shorthand for `--log-level debug`: logs every lock attempt.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the tasks of a suite file.
    Run(RunArgs),
    /// List the leases currently held at a lock service.
    Locks(LocksArgs),
    /// Serve the reference lock service.
    ServeLocks(ServeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Path to the suite file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SUITE_FILE)]
    pub config: String,

    /// Maximum tasks in flight (0 = one at a time, in file order).
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Exit immediately on the first task failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Lock service URL, overriding `[locking].url`.
    #[arg(long, value_name = "URL")]
    pub lock_url: Option<String>,

    /// Lock client identity, overriding `[locking].client`.
    #[arg(long, value_name = "ID")]
    pub client: Option<String>,

    /// Disable resource locking entirely.
    #[arg(long)]
    pub no_locking: bool,

    /// Parse, validate and resolve, print the plan, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LocksArgs {
    /// Lock service URL.
    #[arg(long, value_name = "URL")]
    pub lock_url: String,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:7878")]
    pub listen: SocketAddr,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let args = CliArgs::try_parse_from([
            "suiterun", "-v", "run", "--config", "ci.toml", "-j", "4", "--fail-fast",
            "--lock-url", "http://locks:7878/locks",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.config, "ci.toml");
                assert_eq!(run.concurrency, Some(4));
                assert!(run.fail_fast);
                assert_eq!(run.lock_url.as_deref(), Some("http://locks:7878/locks"));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn serve_locks_has_default_listen_address() {
        let args = CliArgs::try_parse_from(["suiterun", "serve-locks"]).unwrap();
        match args.command {
            Command::ServeLocks(serve) => assert_eq!(serve.listen.port(), 7878),
            other => panic!("expected serve-locks, got {other:?}"),
        }
    }
}
