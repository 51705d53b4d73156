/*
 * status.rs
 *
 * RunResult -> exit code (plus maybe one line for stderr). Order matters:
 *
 *   timed out          124, whatever the child did after
 *   exited normally    its code
 *   killed by signal   128+N, and say so
 *   anything else      125
 *
 * Pure function, main.rs does the printing.
 */

use crate::error::exit_codes;
use crate::runner::RunResult;
use crate::signal::{Signal, signal_description};

/// Final answer for the shell: exit code and an optional diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub code: u8,
    pub diagnostic: Option<String>,
}

impl Verdict {
    const fn silent(code: u8) -> Self {
        Self {
            code,
            diagnostic: None,
        }
    }
}

/// Translate a finished run. `cmdline` is the command as the user typed
/// it, used only in the signal diagnostic.
#[must_use]
pub fn translate(result: &RunResult, cmdline: &str) -> Verdict {
    match *result {
        RunResult::InterruptedBeforeLaunch { signal } => {
            Verdict::silent(exit_codes::for_signal(signal.as_raw()))
        }
        RunResult::Finished {
            timed_out: true, ..
        } => Verdict::silent(exit_codes::TIMEOUT),
        RunResult::Finished { pid, status, .. } => {
            if let Some(code) = status.code() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                return Verdict::silent((code & 0xFF) as u8);
            }
            if let Some(signum) = status.signal() {
                let description =
                    Signal::try_from_raw(signum).map_or("Unknown signal", signal_description);
                return Verdict {
                    code: exit_codes::for_signal(signum),
                    diagnostic: Some(format!(
                        "timeout: process {pid} ({cmdline}) terminated by signal {signum} ({description})"
                    )),
                };
            }
            Verdict {
                code: exit_codes::INTERNAL_ERROR,
                diagnostic: Some(format!(
                    "timeout: unrecognized wait status {:#x} for process {pid}",
                    status.into_raw()
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExitStatus;

    fn finished(raw: i32, timed_out: bool) -> RunResult {
        RunResult::Finished {
            pid: 4242,
            status: ExitStatus::from_raw(raw),
            timed_out,
        }
    }

    #[test]
    fn test_normal_exit_passthrough() {
        assert_eq!(translate(&finished(0, false), "true"), Verdict::silent(0));
        assert_eq!(translate(&finished(3 << 8, false), "x"), Verdict::silent(3));
        assert_eq!(translate(&finished(127 << 8, false), "x").code, 127);
    }

    #[test]
    fn test_timed_out_overrides_everything() {
        /* exited 0 after TERM, still a timeout */
        assert_eq!(translate(&finished(0, true), "x"), Verdict::silent(124));
        /* killed by KILL, still a timeout */
        assert_eq!(
            translate(&finished(libc::SIGKILL, true), "x"),
            Verdict::silent(124)
        );
    }

    #[test]
    fn test_signaled_child_reports() {
        let v = translate(&finished(libc::SIGTERM, false), "sleep 10");
        assert_eq!(v.code, 128 + 15);
        assert_eq!(
            v.diagnostic.as_deref(),
            Some("timeout: process 4242 (sleep 10) terminated by signal 15 (Terminated)")
        );

        let v = translate(&finished(libc::SIGKILL, false), "yes");
        assert_eq!(v.code, 137);
        assert!(v.diagnostic.unwrap().ends_with("(Killed)"));
    }

    #[test]
    fn test_interrupted_before_launch() {
        let r = RunResult::InterruptedBeforeLaunch {
            signal: Signal::SIGINT,
        };
        assert_eq!(translate(&r, "x"), Verdict::silent(130));
    }

    #[test]
    fn test_unrecognized_status_is_internal_error() {
        /* 0x7f in the low byte is a stop report, never a termination */
        let v = translate(&finished(0x137f, false), "x");
        assert_eq!(v.code, 125);
        assert!(v.diagnostic.is_some());
    }
}
