//! MapGrab CLI: resolve map feature selectors offline
//!
//! ## Usage
//!
//! ```bash
//! mapgrab parse 'map[id=main] layer[type=line]'
//! mapgrab query --scene scene.json 'layer[id=stops]' --merge=line
//! mapgrab inspect --scene scene.json --map main 200 150
//! ```

use clap::Parser;
use mapgrab_cli::{
    handlers::{execute_inspect, execute_parse, execute_query},
    logging::init_logging,
    Cli, CliConfig, CliResult, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(config.verbosity);

    match cli.command {
        Commands::Parse(args) => execute_parse(&config, &args),
        Commands::Query(args) => execute_query(&config, &args),
        Commands::Inspect(args) => execute_inspect(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into())
        .with_format(cli.format.into())
}
