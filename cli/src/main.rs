#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[cfg(test)]
mod fixtures;
mod run;
mod serve;

#[derive(Parser, Debug)]
#[command(name = "classify", version, about = "Image classification on top of tract")]
struct Cli {
    /// Sets the level of verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    /// Configuration file (defaults to $CLASSIFY_CONFIG, then ./classify.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify images and print the ranked labels
    Run(run::RunArgs),
    /// Serve model assets over HTTP
    Serve(serve::ServeArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbosity {
        0 => "classify=warn,classifier=warn",
        1 => "classify=info,classifier=info",
        2 => "classify=debug,classifier=debug",
        _ => "classify=trace,classifier=trace",
    };
    let var = if std::env::var_os("CLASSIFY_LOG").is_some() {
        "CLASSIFY_LOG"
    } else {
        env_logger::DEFAULT_FILTER_ENV
    };
    let env = env_logger::Env::default().filter_or(var, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    if let Err(e) = handle(cli) {
        error!("{e:?}");
        process::exit(1)
    }
}

fn handle(cli: Cli) -> anyhow::Result<()> {
    let config = classifier::config::load_config(cli.config.as_deref())?;
    debug!("Configuration: {config:?}");
    match cli.command {
        Command::Run(args) => run::handle(config, args),
        Command::Serve(args) => serve::handle(config, args),
    }
}
