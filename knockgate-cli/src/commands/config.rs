//! Config command.

use std::io::Write;

use crate::cli::ConfigArgs;

use super::CommandResult;

/// Validate the gate settings and write them to `out` as pretty JSON.
pub fn execute_config<W: Write>(args: &ConfigArgs, out: &mut W) -> CommandResult<()> {
    let config = args.gate.to_gate_config();
    config.validate()?;

    let json = serde_json::to_string_pretty(&config).map_err(std::io::Error::from)?;
    writeln!(out, "{}", json)?;
    Ok(())
}
