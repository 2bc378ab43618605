use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Keeps a module host in sync with a declaration file.
#[derive(Parser, Debug)]
#[command(name = "modvisor", version, about)]
struct Args {
    /// Log at DEBUG level or more verbose, whatever the properties say
    #[arg(long)]
    debug: bool,

    /// Launch properties file (also the module declaration)
    #[arg(value_name = "PROPERTIES", default_value = modvisor::DEFAULT_DECLARATION)]
    properties: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match modvisor::launch(&args.properties, args.debug) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(label = e.as_label(), "{e}");
            eprintln!("modvisor: {e}");
            ExitCode::FAILURE
        }
    }
}
