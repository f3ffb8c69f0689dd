// SPDX-License-Identifier: MIT
//
// michro — a minimal raw-mode terminal file viewer.
//
// This is the main binary that wires together the two crates:
//
//   michro-term   → raw mode, key decoding, frame output, event loop
//   michro-editor → line store, viewport, rendering, the Viewer app
//
// main() parses the command line, optionally starts file logging, and
// hands off to `michro_editor::viewer::run`. By the time that returns the
// terminal has been restored, so errors print to a normal screen. Every
// error's message already names its cause, so only the top is printed.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use michro_editor::options::Options;
use michro_editor::viewer;

/// View a file in the terminal, read-only.
#[derive(Parser, Debug)]
#[command(name = "michro")]
#[command(about = "A minimal raw-mode terminal file viewer", long_about = None)]
#[command(version)]
struct Cli {
    /// File to view
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Write long lines in full and let the terminal wrap them
    #[arg(long)]
    wrap: bool,

    /// Don't treat w/a/s/d as arrow keys
    #[arg(long)]
    no_wasd: bool,

    /// Write diagnostics to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `michro_term=trace`
    #[arg(long, value_name = "FILTER", default_value = "debug")]
    log_level: String,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            clip_lines: !self.wrap,
            wasd: !self.no_wasd,
        }
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

fn init_logging(path: &Path, filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| anyhow!("invalid log filter `{filter}`: {e}"))?;
    let file = File::create(path)
        .map_err(|e| anyhow!("cannot create log file {}: {e}", path.display()))?;

    let fmt_layer = fmt::layer().with_writer(Arc::new(file)).with_ansi(false);
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {e}"))?;
    Ok(())
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.log_file {
        init_logging(path, &cli.log_level)?;
    }
    tracing::info!(file = %cli.file.display(), "starting");
    viewer::run(&cli.file, cli.options())?;
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    if let Err(e) = run(&cli) {
        tracing::error!("{e}");
        eprintln!("michro: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("michro").chain(args.iter().copied()))
    }

    #[test]
    fn file_only() {
        let cli = parse(&["notes.txt"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("notes.txt"));
        assert!(cli.log_file.is_none());
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.options(), Options::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn extra_positional_is_an_error() {
        assert!(parse(&["a.txt", "b.txt"]).is_err());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse(&["--bogus", "a.txt"]).is_err());
    }

    #[test]
    fn wrap_disables_clipping() {
        let cli = parse(&["--wrap", "a.txt"]).unwrap();
        assert!(!cli.options().clip_lines);
        assert!(cli.options().wasd);
    }

    #[test]
    fn no_wasd() {
        let cli = parse(&["a.txt", "--no-wasd"]).unwrap();
        assert!(!cli.options().wasd);
        assert!(cli.options().clip_lines);
    }

    #[test]
    fn log_options() {
        let cli = parse(&["--log-file", "/tmp/m.log", "--log-level", "trace", "a.txt"]).unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/m.log")));
        assert_eq!(cli.log_level, "trace");
    }

    #[test]
    fn help_and_version_are_display_kinds() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse(&["--version"]).unwrap_err().kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
