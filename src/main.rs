mod args;
mod cli;

use clap::Parser;
use log::{debug, warn};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    let stdout = std::io::stdout();
    let res = cli::run(&args, &mut stdout.lock());
    if let Err(e) = res {
        if e.is_not_found() {
            warn!("{}", e);
            eprintln!("{}", e);
            std::process::exit(2);
        }
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
