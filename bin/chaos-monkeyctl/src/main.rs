//! ---
//! cm_section: "08-operator-tooling"
//! cm_subsection: "binary"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Control CLI for operators working with Chaos Monkey settings."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use anyhow::Result;
use chaos_monkey_logging as logging;
use clap::{Parser, Subcommand};

mod drill;
mod settings;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Chaos Monkey settings and drill utility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse and validate a configuration file.
    Validate(settings::ValidateCommand),
    /// Print the effective settings after defaults are applied.
    Show(settings::ShowCommand),
    /// Drive synthetic boundary calls through the engine and report the outcome.
    Drill(drill::DrillCommand),
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(cmd) => cmd.execute()?,
        Commands::Show(cmd) => cmd.execute()?,
        Commands::Drill(cmd) => cmd.execute()?,
    }
    Ok(())
}
