/*
 * error.rs
 *
 * Exit codes follow the coreutils convention. Scripts depend on these.
 * 124 = timed out, 125 = our fault, 126 = not executable, 127 = not found,
 * 128+N = killed by signal N.
 *
 * Don't change them. You'll break CI pipelines.
 */

use std::fmt;

/// exit codes per coreutils convention. don't change these.
pub mod exit_codes {
    /// Command ran too long (timed out)
    pub const TIMEOUT: u8 = 124;
    /// timeout itself failed before or instead of running the command
    pub const INTERNAL_ERROR: u8 = 125;
    /// Command found but couldn't be executed (permissions, bad format)
    pub const CANNOT_INVOKE: u8 = 126;
    /// Command not found
    pub const NOT_FOUND: u8 = 127;
    /// Added to the signal number when a signal ends the command (or us)
    pub const SIGNAL_BASE: u8 = 128;

    /// 128 + signum, truncated to 8 bits like a shell would
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn for_signal(signum: i32) -> u8 {
        ((SIGNAL_BASE as i32 + signum) & 0xFF) as u8
    }
}

/* everything that can go wrong */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutError {
    InvalidDuration(String),
    NegativeDuration,
    DurationOverflow,
    InvalidSignal(String),
    MissingCommand,
    SpawnError(i32),  // errno from fork
    SignalError(i32), // errno from kill/killpg
    SetupError(String),
    WaitError(i32), // errno from waitpid
    Internal(String),
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration(s) => write!(f, "invalid duration: {s}"),
            Self::NegativeDuration => write!(f, "invalid duration: negative values not allowed"),
            Self::DurationOverflow => write!(f, "invalid duration: value too large"),
            Self::InvalidSignal(s) => write!(f, "invalid signal: {s}"),
            Self::MissingCommand => write!(f, "missing command"),
            Self::SpawnError(errno) => write!(f, "failed to fork: errno {errno}"),
            Self::SignalError(errno) => write!(f, "failed to send signal: errno {errno}"),
            Self::SetupError(s) => write!(f, "setup failed: {s}"),
            Self::WaitError(errno) => write!(f, "failed to wait for command: errno {errno}"),
            Self::Internal(s) => write!(f, "internal error: {s}"),
        }
    }
}

impl std::error::Error for TimeoutError {}

impl TimeoutError {
    /*
     * Anything that reaches here is our own failure. Exec failures never do:
     * the forked child reports them as 126/127 through its exit status.
     */
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        exit_codes::INTERNAL_ERROR
    }

    /* configuration errors get the "try --help" hint, runtime ones don't */
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidDuration(_)
                | Self::NegativeDuration
                | Self::DurationOverflow
                | Self::InvalidSignal(_)
                | Self::MissingCommand
        )
    }
}

pub type Result<T> = core::result::Result<T, TimeoutError>;

/* errno of the last failed libc call */
#[inline]
pub(crate) fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_vocabulary() {
        assert_eq!(exit_codes::TIMEOUT, 124);
        assert_eq!(exit_codes::INTERNAL_ERROR, 125);
        assert_eq!(exit_codes::CANNOT_INVOKE, 126);
        assert_eq!(exit_codes::NOT_FOUND, 127);
    }

    #[test]
    fn test_for_signal() {
        assert_eq!(exit_codes::for_signal(libc::SIGTERM), 143);
        assert_eq!(exit_codes::for_signal(libc::SIGKILL), 137);
        assert_eq!(exit_codes::for_signal(libc::SIGHUP), 129);
    }

    #[test]
    fn test_supervisor_errors_are_internal() {
        assert_eq!(
            TimeoutError::MissingCommand.exit_code(),
            exit_codes::INTERNAL_ERROR
        );
        assert_eq!(
            TimeoutError::SpawnError(libc::EAGAIN).exit_code(),
            exit_codes::INTERNAL_ERROR
        );
        assert_eq!(
            TimeoutError::WaitError(libc::ECHILD).exit_code(),
            exit_codes::INTERNAL_ERROR
        );
    }

    #[test]
    fn test_usage_errors() {
        assert!(TimeoutError::InvalidSignal("FOO".to_string()).is_usage());
        assert!(TimeoutError::NegativeDuration.is_usage());
        assert!(!TimeoutError::SpawnError(1).is_usage());
        assert!(!TimeoutError::WaitError(10).is_usage());
    }

    #[test]
    fn test_display() {
        let msg = TimeoutError::InvalidSignal("unknown signal: FOO".to_string()).to_string();
        assert_eq!(msg, "invalid signal: unknown signal: FOO");
        let msg = TimeoutError::WaitError(10).to_string();
        assert!(msg.contains("errno 10"));
    }
}
