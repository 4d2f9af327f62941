//! Exit codes for the knockgate binaries.
//!
//! Following Unix conventions for exit codes.

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments or gate configuration.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error.
    pub const IO_ERROR: i32 = 2;
    /// Unreadable replay input.
    pub const REPLAY_ERROR: i32 = 3;
    /// Knock could not be sent.
    pub const SOCKET_ERROR: i32 = 4;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Config(_) => codes::INVALID_ARGS,
        CommandError::Io(_) => codes::IO_ERROR,
        CommandError::Replay { .. } => codes::REPLAY_ERROR,
        CommandError::Knock(_) => codes::SOCKET_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliError;
    use crate::commands::KnockError;
    use knockgate_core::ConfigError;
    use knockgate_schema::SchemaError;

    #[test]
    fn test_exit_code_invalid_argument() {
        let error = CommandError::InvalidArgument(CliError::InvalidSweepEvery(0));
        assert_eq!(exit_code(&error), codes::INVALID_ARGS);
    }

    #[test]
    fn test_exit_code_config() {
        let error = CommandError::Config(ConfigError::PortCollision(22));
        assert_eq!(exit_code(&error), codes::INVALID_ARGS);
    }

    #[test]
    fn test_exit_code_io() {
        let error = CommandError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert_eq!(exit_code(&error), codes::IO_ERROR);
    }

    #[test]
    fn test_exit_code_replay() {
        let error = CommandError::Replay {
            line: 3,
            source: SchemaError::VersionMismatch {
                expected: 1,
                found: 2,
            },
        };
        assert_eq!(exit_code(&error), codes::REPLAY_ERROR);
        assert_eq!(
            error.to_string(),
            "replay input line 3: schema version mismatch: expected 1, found 2"
        );
    }

    #[test]
    fn test_exit_code_knock() {
        let error = CommandError::Knock(KnockError::Socket(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        )));
        assert_eq!(exit_code(&error), codes::SOCKET_ERROR);
    }

    #[test]
    fn test_exit_codes_distinct() {
        let all = [
            codes::SUCCESS,
            codes::INVALID_ARGS,
            codes::IO_ERROR,
            codes::REPLAY_ERROR,
            codes::SOCKET_ERROR,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
