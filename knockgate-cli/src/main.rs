//! knockgate CLI binary.
//!
//! Entry point for the `knockgate` command-line tool.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use knockgate_cli::exit::{codes, exit_code};
use knockgate_cli::{
    execute_config, execute_replay, init_tracing, Cli, Command, CommandError, ConfigArgs,
    ReplayArgs, TracingLogger,
};
use knockgate_core::Verbosity;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(Verbosity::from_count(cli.verbose));

    let result = match cli.command {
        Command::Replay(args) => run_replay(args),
        Command::Config(args) => run_config(args),
    };

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Run the replay command.
fn run_replay(args: ReplayArgs) -> Result<(), CommandError> {
    let input = BufReader::new(File::open(&args.input)?);

    let result = match &args.out {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            execute_replay(&args, input, &mut out, TracingLogger)?
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            execute_replay(&args, input, &mut out, TracingLogger)?
        }
    };

    let stats = result.stats;
    eprintln!("Replayed {} frames:", stats.frames);
    eprintln!("  Accepted: {}", stats.accepted);
    eprintln!("  Dropped: {}", stats.dropped);
    eprintln!("  Malformed: {}", stats.malformed);
    eprintln!(
        "  Knocks: {} recorded, {} rejected",
        stats.knocks_recorded, stats.knocks_rejected
    );
    eprintln!(
        "  Protected SYNs: {} authorized, {} no entry, {} expired",
        stats.authorized, stats.no_entry, stats.expired
    );
    eprintln!("  Entries remaining: {}", result.remaining_entries);

    Ok(())
}

/// Run the config command.
fn run_config(args: ConfigArgs) -> Result<(), CommandError> {
    let stdout = io::stdout();
    execute_config(&args, &mut stdout.lock())
}
