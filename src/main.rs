use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use orphanage::cli::{Cli, Commands};
use orphanage::commands::adopt::AdoptSource;
use orphanage::output::{self, Verbosity};
use orphanage::{OrphanageContext, commands};
use std::io;
use std::process;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        output::set_verbosity(Verbosity::Quiet);
    }

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let mut ctx = OrphanageContext::new()?;
    ctx.verbose = cli.verbose;
    output::init_logging(cli.verbose || ctx.config.scan.verbose_logging);

    match cli.command {
        Commands::Scan { full } => commands::scan::execute(&ctx, full)?,
        Commands::List {
            limit,
            indexed,
            depth,
        } => commands::list::execute(&ctx, limit, indexed, depth)?,
        Commands::Chunk {
            resume,
            batch,
            time_limit,
        } => commands::chunk::execute(&ctx, resume.as_deref(), batch, time_limit)?,
        Commands::Index => commands::index::execute(&ctx)?,
        Commands::Adopt {
            uris,
            unmanaged,
            scan,
            limit,
        } => {
            let source = if scan {
                AdoptSource::Scan
            } else if unmanaged {
                AdoptSource::Index
            } else {
                AdoptSource::Explicit
            };
            commands::adopt::execute(&ctx, &uris, source, limit)?;
        }
        Commands::Release { uris } => commands::adopt::execute_release(&ctx, &uris)?,
        Commands::Status { orphans } => commands::status::execute(&ctx, orphans)?,
        Commands::Patterns => commands::patterns::execute(&ctx)?,
        Commands::Prune => commands::prune::execute(&ctx)?,
        Commands::Config { key, value, list } => {
            commands::config::execute(&mut ctx, key.as_deref(), value, list)?;
        }
        Commands::Completion { .. } => {}
    }

    Ok(())
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
