mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use grc_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("GRC_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        output::output_error(&e.to_string());
    }
    Ok(())
}

fn require_file(file: Option<String>) -> anyhow::Result<String> {
    file.ok_or_else(|| anyhow::anyhow!("--file is required (or set GRC_FILE)"))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "grc", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Migrate(cmd) => {
            return handlers::migrate::handle(&require_file(cli.file)?, cmd.action).await;
        }
        command => command,
    };

    let file_path = require_file(cli.file)?;
    let mut ctx = CliContext::load(&file_path, AppConfig::load()).await?;
    tracing::debug!(path = %ctx.path().display(), sqlite = ctx.is_sqlite(), "Opened data file");

    match command {
        Commands::Person(cmd) => handlers::person::handle(&mut ctx, cmd.action).await?,
        Commands::Workflow(cmd) => handlers::workflow::handle(&mut ctx, cmd.action).await?,
        Commands::Cycle(cmd) => handlers::workflow::handle_cycle(&mut ctx, cmd.action).await?,
        Commands::Task(cmd) => handlers::task::handle(&mut ctx, cmd.action).await?,
        Commands::Label(cmd) => handlers::label::handle(&mut ctx, cmd.action).await?,
        Commands::Calendar(cmd) => handlers::calendar::handle(&mut ctx, cmd.action).await?,
        Commands::Import(args) => handlers::transfer::handle_import(&mut ctx, args).await?,
        Commands::Export(args) => handlers::transfer::handle_export(&ctx, args).await?,
        Commands::Migrate(_) | Commands::Completions { .. } => {}
    }
    Ok(())
}
