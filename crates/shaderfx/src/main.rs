mod cli;
mod imageio;
mod menu;
mod paths;
mod run;
mod settings;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let config = settings::load(&cli.overrides)?;

    match cli.command {
        Some(Command::Apply(args)) => run::run_apply(&config, args),
        Some(Command::Effects) => run::run_effects(&config),
        Some(Command::Probe) => run::run_probe(&config),
        None => run::run_interactive(&config),
    }
}
