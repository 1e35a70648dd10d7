//! Exit codes for the spc-core CLI.
//!
//! Exit codes communicate operation outcome without requiring output
//! parsing, and are a stable contract for automation.
//!
//! Ranges:
//! - 0-9: Operational outcomes
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for spc-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success; no violations detected.
    Clean = 0,

    /// Success; at least one rule violation was detected.
    Violations = 1,

    /// The input series file was missing or malformed.
    InputError = 2,

    /// The configuration file failed to load or validate.
    ConfigError = 3,

    /// Caller-supplied values violated a named invariant.
    ValidationError = 4,

    /// Invalid command-line arguments.
    ArgsError = 10,

    /// Internal error (bug - please report).
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::Violations.as_i32(), 1);
        assert_eq!(ExitCode::InputError.as_i32(), 2);
        assert_eq!(ExitCode::ConfigError.as_i32(), 3);
        assert_eq!(ExitCode::ValidationError.as_i32(), 4);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
    }
}
