/*
 * events.rs
 *
 * Self-pipe event source. Every wakeup the supervisor cares about arrives
 * as a signal: SIGCHLD (child changed state), SIGALRM (deadline), and the
 * termination signals someone sends to us. The handler writes the signal
 * number as one byte into a non-blocking pipe; the main loop poll()s the
 * read end and handles one byte at a time, outside signal context.
 *
 * Handlers run with every intercepted signal masked, so they never nest.
 * They touch nothing but the atomic fd and write(2).
 *
 * One source per process: the handler needs a global write fd. install()
 * claims it with a CAS and fails if it is already taken. Drop puts the
 * previous dispositions back before closing the pipe so a late signal
 * never writes to a recycled fd.
 */

use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::error::{Result, TimeoutError, errno};
use crate::process::sigset_of;
use crate::signal::Signal;

type RawFd = i32;

/* Write end of the pipe, -1 when no source is installed. */
static WRITE_FD: AtomicI32 = AtomicI32::new(-1);

/* always intercepted, whatever the signal list says */
const BASE: [Signal; 6] = [
    Signal::SIGALRM,
    Signal::SIGCHLD,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGHUP,
    Signal::SIGTERM,
];

/* install() is process-wide; unit tests in any module that install take this */
#[cfg(test)]
pub(crate) static INSTALL_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/* background-tty signals; ignored so a backgrounded supervisor can't be stopped */
const IGNORED: [Signal; 2] = [Signal::SIGTTIN, Signal::SIGTTOU];

/// Something the supervisor loop has to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// SIGCHLD: reap with WNOHANG and check.
    ChildExited,
    /// SIGALRM: the armed deadline fired.
    DeadlineExpired,
    /// A termination signal was sent to the supervisor.
    Interrupted(Signal),
}

impl Event {
    fn from_signal(sig: Signal) -> Self {
        match sig {
            Signal::SIGCHLD => Self::ChildExited,
            Signal::SIGALRM => Self::DeadlineExpired,
            other => Self::Interrupted(other),
        }
    }
}

/// Signals the supervisor installs handlers for: the fixed set plus every
/// catchable signal in `list`. No duplicates, fixed set first.
///
/// Fault signals (SEGV, BUS, FPE, ILL, TRAP) keep their default action in
/// the supervisor; a listed one still reaches the child through killpg.
#[must_use]
pub fn intercepted_signals(list: &[Signal]) -> Vec<Signal> {
    let mut out = BASE.to_vec();
    for &sig in list {
        if sig.is_catchable() && !sig.is_fault() && !out.contains(&sig) {
            out.push(sig);
        }
    }
    out
}

/// Every signal whose disposition `install(intercepted)` changes. The
/// child resets all of them: an ignored signal stays ignored across exec.
#[must_use]
pub fn changed_dispositions(intercepted: &[Signal]) -> Vec<Signal> {
    let mut out = intercepted.to_vec();
    out.extend(IGNORED.iter().filter(|s| !intercepted.contains(s)));
    out
}

/// Installed handlers plus the read end of the pipe.
pub struct EventSource {
    read_fd: RawFd,
    /* (signal, disposition before install), restored on drop */
    saved: Vec<(Signal, libc::sigaction)>,
}

impl EventSource {
    /// Create the pipe and install handlers for `intercepted`. Call before
    /// the child is forked so no SIGCHLD can be missed.
    pub fn install(intercepted: &[Signal]) -> Result<Self> {
        let (read_fd, write_fd) = open_pipe()?;

        if WRITE_FD
            .compare_exchange(-1, write_fd, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            close_fd(read_fd);
            close_fd(write_fd);
            return Err(TimeoutError::SetupError(
                "signal handlers already installed".to_string(),
            ));
        }

        /* from here on Drop cleans up whatever got installed */
        let mut source = Self {
            read_fd,
            saved: Vec::with_capacity(intercepted.len() + IGNORED.len()),
        };

        let mask = sigset_of(intercepted);
        for &sig in intercepted.iter().filter(|s| s.is_catchable()) {
            // SAFETY: an all-zero sigaction is a valid value for the C struct;
            // every field we rely on is set below.
            let mut sa: libc::sigaction = unsafe { mem::zeroed() };
            sa.sa_sigaction = on_signal as extern "C" fn(i32) as libc::sighandler_t;
            sa.sa_mask = mask;
            sa.sa_flags = libc::SA_RESTART;
            source.replace(sig, &sa)?;
        }

        for &sig in IGNORED.iter().filter(|s| !intercepted.contains(s)) {
            // SAFETY: as above.
            let mut sa: libc::sigaction = unsafe { mem::zeroed() };
            sa.sa_sigaction = libc::SIG_IGN;
            source.replace(sig, &sa)?;
        }

        tracing::debug!(signals = source.saved.len(), "signal handlers installed");
        Ok(source)
    }

    fn replace(&mut self, sig: Signal, sa: &libc::sigaction) -> Result<()> {
        // SAFETY: an all-zero sigaction is valid storage for the old action.
        let mut old: libc::sigaction = unsafe { mem::zeroed() };
        // SAFETY: sa points to an initialized sigaction, old to writable
        // storage; sig is a catchable signal number.
        let ret = unsafe { libc::sigaction(sig.as_raw(), sa, &raw mut old) };
        if ret != 0 {
            return Err(TimeoutError::SetupError(format!(
                "sigaction({}) failed: errno {}",
                sig.as_raw(),
                errno()
            )));
        }
        self.saved.push((sig, old));
        Ok(())
    }

    /// Block until the next event.
    pub fn wait(&self) -> Result<Event> {
        loop {
            if let Some(event) = self.try_next()? {
                return Ok(event);
            }
            self.poll_readable()?;
        }
    }

    /// Next queued event, if any, without blocking.
    pub fn try_next(&self) -> Result<Option<Event>> {
        loop {
            let mut byte = 0u8;
            // SAFETY: byte is a valid 1-byte buffer; read_fd is our pipe's
            // non-blocking read end.
            let n = unsafe { libc::read(self.read_fd, (&raw mut byte).cast(), 1) };
            if n == 1 {
                match Signal::try_from_raw(i32::from(byte)) {
                    Some(sig) => return Ok(Some(Event::from_signal(sig))),
                    /* only our handler writes here; skip anything else */
                    None => continue,
                }
            }
            if n == 0 {
                return Err(TimeoutError::Internal("signal pipe closed".to_string()));
            }
            match errno() {
                libc::EINTR => continue,
                libc::EAGAIN => return Ok(None),
                e => return Err(TimeoutError::Internal(format!("read signal pipe: errno {e}"))),
            }
        }
    }

    /* poll with no timeout; all timing comes from SIGALRM */
    fn poll_readable(&self) -> Result<()> {
        let mut pfd = libc::pollfd {
            fd: self.read_fd,
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            // SAFETY: pfd is a single valid pollfd, nfds matches.
            let ret = unsafe { libc::poll(&raw mut pfd, 1, -1) };
            if ret >= 0 {
                return Ok(());
            }
            let e = errno();
            if e != libc::EINTR {
                return Err(TimeoutError::Internal(format!("poll: errno {e}")));
            }
        }
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        /* dispositions first, so no handler runs once the fds are gone */
        for (sig, old) in self.saved.drain(..).rev() {
            // SAFETY: old was filled in by sigaction() for this signal.
            unsafe {
                libc::sigaction(sig.as_raw(), &raw const old, ptr::null_mut());
            }
        }

        let write_fd = WRITE_FD.swap(-1, Ordering::SeqCst);
        if write_fd >= 0 {
            close_fd(write_fd);
        }
        close_fd(self.read_fd);
    }
}

/* handler: one byte per signal, errors dropped (full pipe means a wakeup is already queued) */
extern "C" fn on_signal(sig: i32) {
    let saved_errno = errno();
    let fd = WRITE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let byte = sig as u8;
        // SAFETY: fd is the non-blocking write end of our pipe; write(2) is
        // async-signal-safe and byte lives for the call.
        unsafe {
            libc::write(fd, (&raw const byte).cast(), 1);
        }
    }
    set_errno(saved_errno);
}

#[cfg(target_os = "linux")]
fn set_errno(e: i32) {
    // SAFETY: __errno_location returns this thread's errno slot.
    unsafe {
        *libc::__errno_location() = e;
    }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn set_errno(e: i32) {
    // SAFETY: __error returns this thread's errno slot.
    unsafe {
        *libc::__error() = e;
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
fn set_errno(_e: i32) {}

/* non-blocking, close-on-exec pipe: (read, write) */
fn open_pipe() -> Result<(RawFd, RawFd)> {
    let mut fds = [0i32; 2];
    // SAFETY: fds is a valid 2-element array, pipe() writes exactly 2 fds.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(TimeoutError::SetupError(format!("pipe: errno {}", errno())));
    }

    for fd in fds {
        if let Err(e) = set_flags(fd) {
            close_fd(fds[0]);
            close_fd(fds[1]);
            return Err(e);
        }
    }
    Ok((fds[0], fds[1]))
}

fn set_flags(fd: RawFd) -> Result<()> {
    /* the handler must never block on a full pipe, and the child must not inherit it */
    // SAFETY: fd is a valid fd from pipe(); F_GETFL/F_SETFL/F_SETFD have no
    // memory preconditions. The calls share that one invariant.
    #[allow(clippy::multiple_unsafe_ops_per_block)]
    let ok = unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        flags >= 0
            && libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) >= 0
            && libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) >= 0
    };
    if ok {
        Ok(())
    } else {
        Err(TimeoutError::SetupError(format!("fcntl: errno {}", errno())))
    }
}

fn close_fd(fd: RawFd) {
    // SAFETY: fd is owned by this module and closed exactly once.
    unsafe {
        libc::close(fd);
    }
}

/*
 * These install process-wide handlers, so they are serialized, and raise
 * only USR1/USR2. Never SIGALRM: another test thread could be holding the
 * timer. Other tests fork children concurrently, so ChildExited events may
 * show up at any point and are skipped.
 */
