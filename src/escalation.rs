/*
 * escalation.rs
 *
 * Which signal goes next, and when to wake up again. Pure state machine:
 * no syscalls, no clock. The runner owns one Escalation per child, feeds
 * it deadline and interrupt events, and carries out the Step it returns.
 *
 * Cursor i over the signal list (length N):
 *   i <  N  send signals[i]; re-arm `interval` if more remain, else
 *           `kill_after` if set, else nothing
 *   i == N  kill-after has elapsed: KILL, no re-arm
 *   i >  N  shouldn't happen; KILL, no re-arm
 * The cursor moves forward by one per delivery.
 *
 * A manual interrupt (INT/QUIT/HUP/TERM or a signal from the list) replaces
 * the list with just that signal and takes a step from the start, so
 * kill-after still applies to an interrupted run.
 */

use std::slice;

use crate::duration::is_no_timeout;
use crate::signal::Signal;

/// One escalation action: deliver `signal` to the group, then re-arm the
/// deadline timer for `rearm` seconds. `None` leaves the timer alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub signal: Signal,
    pub rearm: Option<u64>,
}

/// Escalation cursor and flags for one supervised child.
#[derive(Debug, Clone)]
pub struct Escalation<'a> {
    signals: &'a [Signal],
    interval: u64,
    kill_after: u64,
    /* set by a manual interrupt; the plan becomes [signal] */
    interrupted: Option<Signal>,
    index: usize,
    timed_out: bool,
}

impl<'a> Escalation<'a> {
    /// `signals` must not be empty; `kill_after == 0` disables the final KILL.
    #[must_use]
    pub fn new(signals: &'a [Signal], interval: u64, kill_after: u64) -> Self {
        debug_assert!(!signals.is_empty(), "escalation needs at least one signal");
        Self {
            signals,
            interval,
            kill_after,
            interrupted: None,
            index: 0,
            timed_out: false,
        }
    }

    /// Initial arming: `None` when the deadline is disabled (0 seconds).
    #[must_use]
    pub const fn start(duration: u64) -> Option<u64> {
        if is_no_timeout(duration) { None } else { Some(duration) }
    }

    /// The armed deadline fired.
    pub fn on_deadline(&mut self) -> Step {
        self.timed_out = true;

        let plan_len = self.plan().len();
        let i = self.index;
        self.index = i.saturating_add(1);

        if i < plan_len {
            let signal = self.plan()[i];
            let remaining = plan_len - i;
            let rearm = if remaining > 1 {
                Some(self.interval)
            } else if self.kill_after > 0 {
                Some(self.kill_after)
            } else {
                None
            };
            return Step { signal, rearm };
        }

        /* i == N: kill-after elapsed. i > N: terminal fallback. */
        Step {
            signal: Signal::SIGKILL,
            rearm: None,
        }
    }

    /// The supervisor itself received `signal` while the child runs.
    pub fn on_interrupt(&mut self, signal: Signal) -> Step {
        self.interrupted = Some(signal);
        self.index = 0;
        self.on_deadline()
    }

    /// Set the first time any deadline or interrupt step is taken.
    #[inline]
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// True once the cursor is past the last configured signal: the next
    /// step, if any, is an unconditional KILL.
    #[inline]
    #[must_use]
    pub fn kill_stage_armed(&self) -> bool {
        self.index >= self.plan().len()
    }

    #[cfg(test)]
    const fn index(&self) -> usize {
        self.index
    }

    fn plan(&self) -> &[Signal] {
        match &self.interrupted {
            Some(sig) => slice::from_ref(sig),
            None => self.signals,
        }
    }
}
