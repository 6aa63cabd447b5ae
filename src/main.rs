//! oekofen - A slim CLI for Oekofen pellet heating controllers
//!
//! Reads the controller's JSON interface and writes control values back
//! from the terminal.

mod cli;
mod commands;
mod config;
mod output;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::RuntimeContext;

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(io::stderr(), "Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = RuntimeContext::new(&cli.global)?;
    ctx.init_logging()?;

    log::debug!("Config loaded from: {:?}", ctx.config_path());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_command(&ctx, cli.command))
}

async fn run_command(ctx: &RuntimeContext, command: Command) -> Result<()> {
    match command {
        Command::Status => commands::status::run(ctx).await,
        Command::List { filter } => commands::value::list(ctx, filter).await,
        Command::Get { key } => commands::value::get(ctx, &key).await,
        Command::Set { key, value, raw } => commands::value::set(ctx, &key, &value, raw).await,
        Command::Dump => commands::value::dump(ctx).await,
        Command::Log => commands::logfile::run(ctx).await,
        Command::Version => commands::version::run(ctx).await,
        Command::Config { command } => commands::config::run(ctx, command),
        Command::Completions { shell } => commands::completions::run(shell),
    }
}
