/*
 * process.rs
 *
 * fork + setpgid + execvp. Replaces std::process::Command because we need
 * three things Command won't give us together: the child in a fresh
 * process group, the supervisor's signal dispositions reset before exec,
 * and exec failures turned into 126/127 by the child itself.
 *
 * Everything the child touches after fork is prepared before fork: the
 * argv pointer array and the diagnostic prefix. The child then only makes
 * async-signal-safe calls (setpgid, sigaction, sigprocmask, execvp, write,
 * _exit).
 *
 * Blocking: intercepted signals are blocked across fork so neither side
 * runs a supervisor handler in the gap before the child resets them.
 */

use std::ffi::CString;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;

use crate::error::{Result, TimeoutError, errno, exit_codes};
use crate::io::{errno_text, write_stderr};
use crate::signal::Signal;

/// What the escalation code needs from a running child.
///
/// Process groups are the POSIX model. A platform without them would put
/// its nearest equivalent (job object, process tree) behind this trait.
pub trait ProcessGroup {
    /// Deliver `signal` to every process in the child's group.
    fn signal_group(&self, signal: Signal) -> Result<()>;
    /// Reap the child if it has terminated, without blocking.
    fn try_reap(&mut self) -> Result<Option<ExitStatus>>;
}

/// Raw child process handle. `pid` doubles as the process group id.
#[derive(Debug)]
pub struct Child {
    pid: libc::pid_t,
    reaped: bool,
}

/// Exit status from waitpid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    status: i32,
}

impl ExitStatus {
    /// Wrap a raw waitpid status word.
    #[must_use]
    pub const fn from_raw(status: i32) -> Self {
        Self { status }
    }

    /// Returns the exit code if the process exited normally
    #[inline]
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        if libc::WIFEXITED(self.status) {
            Some(libc::WEXITSTATUS(self.status))
        } else {
            None
        }
    }

    /// Returns the signal number if the process was killed by a signal
    #[inline]
    #[must_use]
    pub fn signal(&self) -> Option<i32> {
        if libc::WIFSIGNALED(self.status) {
            Some(libc::WTERMSIG(self.status))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn into_raw(self) -> i32 {
        self.status
    }
}

/// Error from process launch
#[derive(Debug, PartialEq, Eq)]
pub enum SpawnError {
    /// argv was empty
    EmptyCommand,
    /// Invalid argument (NUL byte in string)
    InvalidArg(String),
    /// fork() failed with errno
    Fork(i32),
    /// signal mask manipulation failed with errno
    Mask(i32),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "empty command"),
            Self::InvalidArg(s) => write!(f, "argument contains NUL byte: {s:?}"),
            Self::Fork(e) => write!(f, "fork error: errno {e}"),
            Self::Mask(e) => write!(f, "sigprocmask error: errno {e}"),
        }
    }
}

impl From<SpawnError> for TimeoutError {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::EmptyCommand => Self::MissingCommand,
            SpawnError::InvalidArg(_) => Self::Internal(e.to_string()),
            SpawnError::Fork(errno) => Self::SpawnError(errno),
            SpawnError::Mask(_) => Self::SetupError(e.to_string()),
        }
    }
}

impl Child {
    /// Get the process ID (also the process group ID)
    #[inline]
    #[must_use]
    pub const fn id(&self) -> libc::pid_t {
        self.pid
    }

    /// Wait for the process to exit, blocking. Retries on EINTR.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        loop {
            match self.waitpid(0)? {
                Some(status) => return Ok(status),
                None => continue,
            }
        }
    }

    /* one waitpid call; None = still running (WNOHANG) */
    fn waitpid(&mut self, flags: i32) -> Result<Option<ExitStatus>> {
        if self.reaped {
            return Err(TimeoutError::WaitError(libc::ECHILD));
        }

        let mut status: i32 = 0;
        loop {
            // SAFETY: pid came from fork and hasn't been reaped (checked above),
            // status is a valid pointer to a local i32.
            let ret = unsafe { libc::waitpid(self.pid, &raw mut status, flags) };

            if ret < 0 {
                let e = errno();
                if e == libc::EINTR {
                    continue;
                }
                return Err(TimeoutError::WaitError(e));
            }

            if ret == 0 {
                /* still running */
                return Ok(None);
            }

            /* stop/continue reports can't happen without WUNTRACED/WCONTINUED */
            self.reaped = true;
            return Ok(Some(ExitStatus { status }));
        }
    }
}

impl ProcessGroup for Child {
    /*
     * killpg() signals the whole group, catches shell scripts with children.
     * killpg can fail with ESRCH if setpgid lost a race with exec, so we fall
     * back to the leader itself. ESRCH there means it's already dead.
     */
    fn signal_group(&self, signal: Signal) -> Result<()> {
        if self.reaped {
            return Ok(());
        }
        let sig = signal.as_raw();

        // SAFETY: killpg() is safe with any pgrp/signal combo, returns -1 on error
        let ret = unsafe { libc::killpg(self.pid, sig) };
        if ret == 0 {
            return Ok(());
        }

        let err = errno();
        if err != libc::ESRCH {
            return Err(TimeoutError::SignalError(err));
        }

        // SAFETY: kill() is safe with any pid/signal combo, returns -1 on error
        let ret = unsafe { libc::kill(self.pid, sig) };
        if ret == 0 {
            return Ok(());
        }
        let err = errno();
        if err == libc::ESRCH {
            return Ok(()); // already dead
        }
        Err(TimeoutError::SignalError(err))
    }

    fn try_reap(&mut self) -> Result<Option<ExitStatus>> {
        if self.reaped {
            return Ok(None);
        }
        self.waitpid(libc::WNOHANG)
    }
}

/* everything the child needs, built before fork */
struct ExecPlan {
    argv: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    diag_prefix: Vec<u8>,
}

impl ExecPlan {
    fn new(argv: &[String]) -> core::result::Result<Self, SpawnError> {
        let Some(program) = argv.first() else {
            return Err(SpawnError::EmptyCommand);
        };

        let argv = argv
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| SpawnError::InvalidArg(a.clone())))
            .collect::<core::result::Result<Vec<_>, _>>()?;

        /* build pointer array, NULL terminated */
        let mut argv_ptrs: Vec<*const libc::c_char> = Vec::with_capacity(argv.len() + 1);
        argv_ptrs.extend(argv.iter().map(|c| c.as_ptr()));
        argv_ptrs.push(ptr::null());

        let diag_prefix = format!("timeout: failed to run command '{program}': ").into_bytes();

        Ok(Self {
            argv,
            argv_ptrs,
            diag_prefix,
        })
    }
}

/* sigset containing every signal in the slice */
pub(crate) fn sigset_of(signals: &[Signal]) -> libc::sigset_t {
    let mut set = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: sigemptyset fully initializes the set it is given.
    unsafe {
        libc::sigemptyset(set.as_mut_ptr());
    }
    // SAFETY: initialized by sigemptyset above.
    let mut set = unsafe { set.assume_init() };
    for sig in signals.iter().filter(|s| s.is_catchable()) {
        // SAFETY: set is initialized, sig is a valid signal number.
        unsafe {
            libc::sigaddset(&raw mut set, sig.as_raw());
        }
    }
    set
}

/// Fork `argv[0]` into a fresh process group and exec it.
///
/// `reset` lists the signals the supervisor intercepts; the child puts each
/// back to `SIG_DFL` before exec. They are blocked across the fork.
///
/// Exec failure is reported by the child itself: a diagnostic on stderr and
/// exit 127 (not found) or 126 (anything else). Only failures on our side
/// of the fork come back as `Err`.
pub fn spawn_in_group(
    argv: &[String],
    reset: &[Signal],
) -> core::result::Result<Child, SpawnError> {
    let plan = ExecPlan::new(argv)?;

    let block = sigset_of(reset);
    let mut old_mask = MaybeUninit::<libc::sigset_t>::uninit();
    // SAFETY: block is an initialized sigset, old_mask is writable storage
    // that pthread_sigmask fills on success.
    let ret = unsafe {
        libc::pthread_sigmask(libc::SIG_BLOCK, &raw const block, old_mask.as_mut_ptr())
    };
    if ret != 0 {
        return Err(SpawnError::Mask(ret));
    }
    // SAFETY: pthread_sigmask succeeded, so old_mask was written.
    let old_mask = unsafe { old_mask.assume_init() };

    // SAFETY: fork has no preconditions. The child branch below only makes
    // async-signal-safe calls on memory prepared before this point.
    let pid = unsafe { libc::fork() };

    if pid == 0 {
        exec_child(&plan, reset, &old_mask);
    }

    let fork_errno = errno();

    if pid > 0 {
        /* same call as the child makes; whichever runs first wins, the other
         * gets EACCES (already exec'd) or succeeds as a no-op */
        // SAFETY: pid is our child, setpgid has no memory preconditions.
        unsafe {
            libc::setpgid(pid, pid);
        }
    }

    // SAFETY: old_mask is the mask saved above.
    unsafe {
        libc::pthread_sigmask(libc::SIG_SETMASK, &raw const old_mask, ptr::null_mut());
    }

    if pid < 0 {
        return Err(SpawnError::Fork(fork_errno));
    }

    Ok(Child { pid, reaped: false })
}

/* child side of fork. never returns. */
fn exec_child(plan: &ExecPlan, reset: &[Signal], old_mask: &libc::sigset_t) -> ! {
    // SAFETY: setpgid(0, 0) makes us leader of a new group; no memory involved.
    unsafe {
        libc::setpgid(0, 0);
    }

    for sig in reset.iter().filter(|s| s.is_catchable()) {
        // SAFETY: SIG_DFL is always a valid disposition for a catchable signal.
        unsafe {
            libc::signal(sig.as_raw(), libc::SIG_DFL);
        }
    }

    // SAFETY: old_mask is a valid sigset copied from the parent before fork.
    unsafe {
        libc::pthread_sigmask(libc::SIG_SETMASK, old_mask, ptr::null_mut());
    }

    // SAFETY: argv_ptrs is a NULL-terminated array of pointers into plan.argv,
    // which outlives this call. execvp only returns on failure.
    unsafe {
        libc::execvp(plan.argv[0].as_ptr(), plan.argv_ptrs.as_ptr());
    }

    let e = errno();
    write_stderr(&plan.diag_prefix);
    write_stderr(errno_text(e).as_bytes());
    write_stderr(b"\n");

    let code = if e == libc::ENOENT {
        exit_codes::NOT_FOUND
    } else {
        exit_codes::CANNOT_INVOKE
    };
    // SAFETY: _exit skips atexit handlers and stdio flushing, which belong
    // to the parent's copy of this address space.
    unsafe { libc::_exit(i32::from(code)) }
}

/*
 * These tests fork real processes. Skipped under Miri: fork and waitpid are
 * unsupported foreign functions there.
 */
