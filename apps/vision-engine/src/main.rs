mod args;
mod calibration;
mod learn;
mod pipeline;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::args::Args;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = if args.learn { learn::run_learn(&args) } else { pipeline::run_streaming(&args) };

    if let Err(err) = result {
        tracing::error!(error = %err, "vision-engine exiting");
        std::process::exit(1);
    }
}
