use std::{io, process::ExitCode};

use geobench::{cli, dispatch, logging, Config};

fn main() -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("Failed to initialize logging: {err}");
    }

    let args: Vec<String> = std::env::args().collect();
    let invocation = match cli::parse_args(&args) {
        Ok(invocation) => invocation,
        Err(err) => {
            println!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let config = Config::from_env();
    match dispatch::execute(&invocation, &config, io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
