//! knock client binary.
//!
//! Usage: `knock <ipv4> [--port N] [--magic VALUE]`

use std::process::ExitCode;

use clap::Parser;
use knockgate_cli::exit::{codes, exit_code};
use knockgate_cli::{execute_knock, KnockCli};

fn main() -> ExitCode {
    let cli = KnockCli::parse();

    match execute_knock(&cli) {
        Ok(_) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("knock: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}
