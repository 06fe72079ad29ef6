use clap::Parser;
use std::io;

mod args;
mod compression;
mod config;
mod http;
mod logging;
mod router;
mod server;

use args::Args;
use config::Config;
use server::start_server;

fn main() -> io::Result<()> {
    logging::setup_logging();
    let args = Args::parse();
    let config = Config::from_args(args)?;
    start_server(config)
}
