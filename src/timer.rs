/*
 * timer.rs
 *
 * One-shot deadline on alarm(2). Expiry raises SIGALRM, which the event
 * source turns into a DeadlineExpired event like any other wakeup.
 *
 * Whole seconds only. alarm() takes an unsigned int; anything larger is
 * clamped, which is still ~136 years.
 */

/// Arm the deadline `secs` seconds from now, replacing any pending one.
/// `secs == 0` is not "fire now": callers handle an immediate step
/// themselves, since alarm(0) cancels.
pub fn arm(secs: u64) {
    let secs = u32::try_from(secs).unwrap_or(u32::MAX);
    // SAFETY: alarm has no memory preconditions.
    unsafe {
        libc::alarm(secs);
    }
}

/// Cancel any pending deadline.
pub fn disarm() {
    // SAFETY: alarm(0) cancels the pending alarm; no memory preconditions.
    unsafe {
        libc::alarm(0);
    }
}
