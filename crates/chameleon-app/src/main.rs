//! Command line entry point.

use chameleon_app::CliArgs;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();
    log::info!("Starting chameleon {}", env!("CARGO_PKG_VERSION"));

    match chameleon_app::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("Run failed: {:?}", err);
            eprintln!("chameleon: {}", err);
            if let Some(diagnostic) = err.diagnostic() {
                eprintln!("{}", diagnostic);
            }
            ExitCode::from(err.exit_code())
        }
    }
}
