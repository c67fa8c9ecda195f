use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use signature_consensus::config::RunParameters;
use signature_consensus::pipeline;

/// Similarity and bootstrap consensus between a spreadsheet and a signature set.
#[derive(Parser, Debug)]
#[command(name = "signature-consensus", version, about)]
struct Args {
    /// Directory holding the run file.
    #[arg(long, default_value = ".")]
    run_directory: PathBuf,

    /// TOML run file, relative to the run directory.
    #[arg(long)]
    run_file: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = match RunParameters::from_file(&args.run_directory.join(&args.run_file)) {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // network smoothing is supplied by library callers; the CLI runs without it
    match pipeline::run(&params, None) {
        Ok(paths) => {
            for p in paths {
                info!("Result written to {:?}", p);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
