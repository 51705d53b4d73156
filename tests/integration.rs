/*
 * Integration tests for the timeout CLI.
 *
 * Exit codes and timing are what scripts depend on, so most tests assert
 * both. Timing bounds are loose: CI machines are slow, but a 1s deadline
 * must never take 5s.
 */

use assert_cmd::Command;
use predicates::prelude::*;
use std::time::{Duration, Instant};

#[allow(deprecated)]
fn timeout_cmd() -> Command {
    let mut cmd = Command::cargo_bin("timeout").unwrap();
    /* keep the environment from changing defaults under us */
    cmd.env_remove("TIMEOUT_SIGNAL")
        .env_remove("TIMEOUT_KILL_AFTER")
        .env_remove("TIMEOUT_INTERVAL")
        .env_remove("TIMEOUT_LOG");
    cmd
}

/* =========================================================================
 * BASIC FUNCTIONALITY
 * ========================================================================= */

#[test]
fn test_command_completes_before_timeout() {
    let start = Instant::now();

    timeout_cmd()
        .args(["5s", "echo", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));

    assert!(start.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_command_exit_code_passthrough() {
    timeout_cmd()
        .args(["5", "sh", "-c", "exit 42"])
        .assert()
        .code(42)
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_timeout_triggers_exit_124() {
    let start = Instant::now();

    timeout_cmd().args(["1", "sleep", "10"]).assert().code(124);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "timed out too early");
    assert!(elapsed < Duration::from_secs(4), "took too long to time out");
}

#[test]
fn test_zero_duration_disables_timeout() {
    timeout_cmd()
        .args(["0", "sh", "-c", "sleep 1; echo done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));
}

#[test]
fn test_duration_suffixes_accepted() {
    for dur in ["5s", "1m", "1h", "1d", "5S", "1M"] {
        timeout_cmd().args([dur, "true"]).assert().success();
    }
}

#[test]
fn test_child_exit_124_without_timeout_is_passed_through() {
    /* 124 from the command itself is not our timeout, but looks the same */
    timeout_cmd()
        .args(["5", "sh", "-c", "exit 124"])
        .assert()
        .code(124);
}

/* =========================================================================
 * ESCALATION
 * ========================================================================= */

#[test]
fn test_timeout_exit_124_even_if_child_exits_cleanly_on_term() {
    /* child traps TERM and exits 0; still a timeout */
    timeout_cmd()
        .args(["1", "sh", "-c", "trap 'exit 0' TERM; sleep 10 & wait"])
        .assert()
        .code(124);
}

#[test]
fn test_kill_after_when_term_ignored() {
    let start = Instant::now();

    timeout_cmd()
        .args(["-k", "1", "1", "sh", "-c", "trap '' TERM; sleep 10"])
        .assert()
        .code(124);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1900), "KILL came too early");
    assert!(elapsed < Duration::from_secs(6));
}

#[test]
fn test_signal_list_with_interval() {
    /* INT ignored, TERM 2s later ends it */
    let start = Instant::now();

    timeout_cmd()
        .args([
            "-v",
            "-s",
            "INT,TERM",
            "-i",
            "2",
            "1",
            "sh",
            "-c",
            "trap '' INT; sleep 10",
        ])
        .assert()
        .code(124)
        .stderr(
            predicate::str::contains("sending signal SIGINT to command 'sh'")
                .and(predicate::str::contains("sending signal SIGTERM to command 'sh'")),
        );

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(2900), "TERM came too early");
    assert!(elapsed < Duration::from_secs(7));
}

#[test]
fn test_signal_list_ending_in_kill() {
    timeout_cmd()
        .args([
            "-s",
            "TERM,KILL",
            "-i",
            "1",
            "1",
            "sh",
            "-c",
            "trap '' TERM; sleep 10",
        ])
        .assert()
        .code(124);
}

#[test]
fn test_numeric_signal() {
    timeout_cmd()
        .args(["-v", "-s", "9", "1", "sleep", "10"])
        .assert()
        .code(124)
        .stderr(predicate::str::contains("sending signal SIGKILL"));
}

#[test]
fn test_verbose_single_signal() {
    timeout_cmd()
        .args(["-v", "1", "sleep", "10"])
        .assert()
        .code(124)
        .stderr(predicate::str::contains(
            "timeout: sending signal SIGTERM to command 'sleep'",
        ));
}

#[test]
fn test_not_verbose_is_quiet() {
    timeout_cmd()
        .args(["1", "sleep", "10"])
        .assert()
        .code(124)
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_signal_env_fallback() {
    timeout_cmd()
        .env("TIMEOUT_SIGNAL", "KILL")
        .args(["-v", "1", "sleep", "10"])
        .assert()
        .code(124)
        .stderr(predicate::str::contains("SIGKILL"));
}

/* =========================================================================
 * PROCESS GROUP
 * ========================================================================= */

#[test]
fn test_signal_reaches_grandchildren() {
    /*
     * The shell starts a background sleep that would hold stdout open.
     * If only the shell were signalled the pipe would stay open and
     * assert_cmd would block until the grandchild finished.
     */
    let start = Instant::now();

    timeout_cmd()
        .args(["1", "sh", "-c", "sleep 30 & sleep 30; wait"])
        .assert()
        .code(124);

    assert!(start.elapsed() < Duration::from_secs(10));
}

/* =========================================================================
 * SIGNALED CHILD
 * ========================================================================= */

#[test]
fn test_child_killed_by_signal_reports() {
    timeout_cmd()
        .args(["5", "sh", "-c", "kill -TERM $$"])
        .assert()
        .code(128 + 15)
        .stderr(
            predicate::str::contains("terminated by signal 15")
                .and(predicate::str::contains("(Terminated)"))
                .and(predicate::str::contains("sh -c kill -TERM $$")),
        );
}

#[test]
fn test_manual_term_is_forwarded() {
    /*
     * Send TERM to the supervisor while the command runs. The command's
     * group gets TERM and the run counts as timed out.
     */
    use std::process::{Command as StdCommand, Stdio};

    let start = Instant::now();
    let mut sup = StdCommand::new(env!("CARGO_BIN_EXE_timeout"))
        .args(["30", "sleep", "30"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(500));
    let pid = i32::try_from(sup.id()).unwrap();
    // SAFETY: pid is our own child process.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }

    let status = sup.wait().unwrap();
    assert_eq!(status.code(), Some(124));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_manual_term_reaches_grandchild() {
    /*
     * The shell backgrounds a second shell that traps TERM and leaves a
     * marker. Only a group-wide delivery reaches it; the outer shell dies
     * on TERM without passing anything on.
     */
    use std::path::Path;
    use std::process::{Command as StdCommand, Stdio};

    fn wait_for(path: &Path) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if path.exists() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }

    let base = std::env::temp_dir().join(format!("esc_timeout_gc_{}", std::process::id()));
    let ready = base.with_extension("ready");
    let got_term = base.with_extension("term");
    let _ = std::fs::remove_file(&ready);
    let _ = std::fs::remove_file(&got_term);

    /* $0 is the marker base inside the grandchild */
    let grandchild = r#"trap ': > "$0.term"; exit 0' TERM; : > "$0.ready"; sleep 30 & wait"#;
    let outer = r#"sh -c "$1" "$0" & wait"#;

    let mut sup = StdCommand::new(env!("CARGO_BIN_EXE_timeout"))
        .args(["30", "sh", "-c", outer, base.to_str().unwrap(), grandchild])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    assert!(wait_for(&ready), "grandchild never installed its trap");
    let pid = i32::try_from(sup.id()).unwrap();
    // SAFETY: pid is our own child process.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }

    let status = sup.wait().unwrap();
    assert_eq!(status.code(), Some(124));
    assert!(wait_for(&got_term), "grandchild never saw TERM");

    let _ = std::fs::remove_file(&ready);
    let _ = std::fs::remove_file(&got_term);
}

/* =========================================================================
 * ERRORS AND EXIT CODES
 * ========================================================================= */

#[test]
fn test_command_not_found_127() {
    timeout_cmd()
        .args(["5", "nonexistent_command_xyz_12345"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains(
            "failed to run command 'nonexistent_command_xyz_12345'",
        ));
}

#[test]
fn test_command_not_executable_126() {
    let path = std::env::temp_dir().join(format!("esc_timeout_it_{}", std::process::id()));
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

    timeout_cmd()
        .args(["5", path.to_str().unwrap()])
        .assert()
        .code(126);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_invalid_duration_125() {
    for bad in ["abc", "1.5", "5x", "-1", ""] {
        timeout_cmd()
            .args(["--", bad, "true"])
            .assert()
            .code(125)
            .stderr(predicate::str::contains("timeout:"));
    }
}

#[test]
fn test_invalid_signal_125() {
    timeout_cmd()
        .args(["-s", "NOTASIGNAL", "5", "true"])
        .assert()
        .code(125)
        .stderr(
            predicate::str::contains("invalid signal")
                .and(predicate::str::contains("--help")),
        );

    timeout_cmd()
        .args(["-s", "TERM,,KILL", "5", "true"])
        .assert()
        .code(125);
}

#[test]
fn test_missing_command_125() {
    timeout_cmd().args(["5"]).assert().code(125);
    timeout_cmd().assert().code(125);
}

#[test]
fn test_unknown_option_125() {
    timeout_cmd()
        .args(["--no-such-flag", "5", "true"])
        .assert()
        .code(125);
}

#[test]
fn test_help_and_version() {
    timeout_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--kill-after").and(predicate::str::contains("124")));

    timeout_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_debug_log_goes_to_stderr() {
    timeout_cmd()
        .env("TIMEOUT_LOG", "debug")
        .args(["5", "true"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("spawned"));
}
