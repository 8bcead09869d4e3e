use clap::Parser;
use env_logger::Env;
use std::process::ExitCode;

use tagcsv::cli::{self, Cli, theme};

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    theme::init();

    let cli = Cli::parse();

    if let Err(e) = cli::run(cli) {
        eprintln!("{} {}", theme::error("Error:"), e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
