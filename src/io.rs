/*
 * io.rs
 *
 * Async-signal-safe output. Between fork and exec the child may only call
 * async-signal-safe functions, so no eprintln!, no allocation, no locks.
 * Just write(2) on fd 2 with buffers built before the fork.
 *
 * The parent uses normal eprintln!; this is only for the forked child.
 */

const STDERR: i32 = 2;

/// Write bytes to stderr with a single write(2), retrying on EINTR and
/// short writes. Errors are dropped: there is nobody left to report them to.
#[inline]
pub fn write_stderr(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: bytes is a valid initialized slice for its whole length;
        // STDERR is a plain fd number, write() tolerates it being closed.
        let n = unsafe { libc::write(STDERR, bytes.as_ptr().cast(), bytes.len()) };
        if n > 0 {
            #[allow(clippy::cast_sign_loss)]
            let written = n as usize;
            bytes = &bytes[written.min(bytes.len())..];
        } else if n < 0 && crate::error::errno() == libc::EINTR {
            continue;
        } else {
            return;
        }
    }
}

/// Short description of an exec errno without touching strerror(3),
/// which is not async-signal-safe.
#[must_use]
pub const fn errno_text(errno: i32) -> &'static str {
    match errno {
        libc::ENOENT => "No such file or directory",
        libc::EACCES => "Permission denied",
        libc::EPERM => "Operation not permitted",
        libc::ENOEXEC => "Exec format error",
        libc::ENOTDIR => "Not a directory",
        libc::ELOOP => "Too many levels of symbolic links",
        libc::ENAMETOOLONG => "File name too long",
        libc::E2BIG => "Argument list too long",
        libc::ENOMEM => "Cannot allocate memory",
        libc::ETXTBSY => "Text file busy",
        libc::EISDIR => "Is a directory",
        _ => "exec failed",
    }
}
