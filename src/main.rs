mod cli;
mod commands;
mod engine;
mod paths;
mod provider;
mod resource;
mod schema;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConnectionArgs};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub manifest: Option<String>,
    pub connection: ConnectionArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest: cli.manifest,
        connection: cli.connection,
    };

    let result = match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Diff(args) => commands::diff::run(&ctx, &args),
        Command::Status => commands::status::run(&ctx),
        Command::List(args) => commands::list::run(&ctx, &args),
        Command::Validate => commands::validate::run(&ctx),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "couchbucket", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(err) = &result
        && let Some(hint) = commands::hint(err)
    {
        ui::hint(hint);
    }
    result
}
