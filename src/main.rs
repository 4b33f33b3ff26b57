use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use tourfe::cli::{self, CliArgs};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    tourfe::logger::init(level, true);
    log::info!("TourFE {} CLI", env!("CARGO_PKG_VERSION"));
    cli::run(args)
}
