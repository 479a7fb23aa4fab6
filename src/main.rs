mod cli;

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use cryptex::Config;
use cryptex::config::ENV_LOG;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let mut session = cryptex::default_session(&config)?;
    cli::commands::run(args.command, &mut session, args.verbose)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cryptex=info" } else { "error" };
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
