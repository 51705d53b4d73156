/*
 * runner.rs
 *
 * Spawn child, arm deadline, escalate if needed. The loop lives here.
 *
 * Handlers go in before the fork, so a child that exits instantly still
 * leaves its SIGCHLD byte in the pipe. Then we sleep in poll() until a
 * byte shows up and handle exactly one event per wakeup:
 *
 *   ChildExited       waitpid(WNOHANG); done if it's really gone
 *   DeadlineExpired   next escalation step, maybe re-arm alarm()
 *   Interrupted(sig)  someone signalled us: forward sig to the group,
 *                     same machinery as a deadline
 *
 * Process groups: a shell script that spawns children should die with
 * all of them, not just the shell. Every signal goes through killpg.
 *
 * Zero CPU while waiting. No polling loop, no sleep granularity.
 */

use tracing::debug;

use crate::args::Args;
use crate::duration::parse_duration;
use crate::error::{Result, TimeoutError};
use crate::escalation::{Escalation, Step};
use crate::events::{Event, EventSource, changed_dispositions, intercepted_signals};
use crate::process::{ExitStatus, ProcessGroup, spawn_in_group};
use crate::signal::{Signal, parse_signal_list, signal_name};
use crate::timer;

/* runtime config built from CLI args */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub duration: u64,         /* seconds before the first signal, 0 = never */
    pub signals: Vec<Signal>,  /* escalation order, never empty */
    pub interval: u64,         /* seconds between successive signals */
    pub kill_after: u64,       /* seconds after the last signal before KILL, 0 = off */
    pub command: Vec<String>,  /* argv, command first */
    pub verbose: bool,         /* announce every signal on stderr */
}

impl RunConfig {
    /// Build config from CLI args. Fails if any duration or signal is bogus;
    /// nothing has been forked at that point.
    pub fn from_args(args: &Args) -> Result<Self> {
        let duration = parse_duration(&args.duration)?;
        let signals = parse_signal_list(&args.signal)?;
        let interval = parse_duration(&args.interval)?;
        let kill_after = args
            .kill_after
            .as_deref()
            .map(parse_duration)
            .transpose()?
            .unwrap_or(0);

        Ok(Self {
            duration,
            signals,
            interval,
            kill_after,
            command: args.argv(),
            verbose: args.verbose,
        })
    }

    /* command name for diagnostics */
    fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }
}

/* what happened when we ran the command */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// The child was reaped. `timed_out` is set if any escalation step ran.
    Finished {
        pid: i32,
        status: ExitStatus,
        timed_out: bool,
    },
    /// We were signalled before the child existed. Nothing was forked.
    InterruptedBeforeLaunch { signal: Signal },
}

/* supervisor lifecycle, for the debug log */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Launching,
    Running,
    Reaping,
    Done,
}

/// Spawn the command in its own process group and supervise it to the end.
///
/// Errors: empty argv, handler setup, fork, signal delivery, wait. Exec
/// failures are not errors here; the child exits 126/127 and that status
/// comes back in [`RunResult::Finished`].
pub fn run_command(config: &RunConfig) -> Result<RunResult> {
    if config.command.is_empty() {
        return Err(TimeoutError::MissingCommand);
    }
    if config.signals.is_empty() {
        return Err(TimeoutError::InvalidSignal("empty signal list".to_string()));
    }

    debug!(phase = ?Phase::Launching, command = config.program());
    let intercepted = intercepted_signals(&config.signals);
    let events = EventSource::install(&intercepted)?;

    /* anything that hit us before the fork ends the run right here */
    if let Some(signal) = pending_interrupt(&events)? {
        debug!(?signal, "interrupted before launch");
        return Ok(RunResult::InterruptedBeforeLaunch { signal });
    }

    let mut child = spawn_in_group(&config.command, &changed_dispositions(&intercepted))?;
    let pid = child.id();
    debug!(pid, "spawned");

    let outcome = supervise(&mut child, &events, config);
    timer::disarm();

    match outcome {
        Ok((status, timed_out)) => {
            debug!(phase = ?Phase::Done, pid, raw = status.into_raw(), timed_out);
            Ok(RunResult::Finished {
                pid,
                status,
                timed_out,
            })
        }
        Err(e) => {
            /* don't leave the group running behind us */
            let _ = child.signal_group(Signal::SIGKILL);
            let _ = child.wait();
            Err(e)
        }
    }
}

/* first termination signal already queued; CHLD/ALRM bytes are dropped */
fn pending_interrupt(events: &EventSource) -> Result<Option<Signal>> {
    while let Some(event) = events.try_next()? {
        if let Event::Interrupted(signal) = event {
            return Ok(Some(signal));
        }
    }
    Ok(None)
}

/* RUNNING until the child is reaped; returns (status, timed_out) */
fn supervise<G: ProcessGroup>(
    group: &mut G,
    events: &EventSource,
    config: &RunConfig,
) -> Result<(ExitStatus, bool)> {
    let mut esc = Escalation::new(&config.signals, config.interval, config.kill_after);

    let mut armed = false;
    if let Some(secs) = Escalation::start(config.duration) {
        timer::arm(secs);
        armed = true;
        debug!(secs, "deadline armed");
    }
    debug!(phase = ?Phase::Running);

    loop {
        let step = match events.wait()? {
            Event::ChildExited => {
                if let Some(status) = group.try_reap()? {
                    debug!(phase = ?Phase::Reaping);
                    return Ok((status, esc.timed_out()));
                }
                /* SIGCHLD for a stop/continue, or already handled */
                continue;
            }
            Event::DeadlineExpired => {
                if !armed {
                    /* SIGALRM we didn't ask for */
                    debug!("stray SIGALRM ignored");
                    continue;
                }
                armed = false;
                esc.on_deadline()
            }
            Event::Interrupted(signal) => {
                debug!(?signal, "interrupted, forwarding");
                esc.on_interrupt(signal)
            }
        };

        if let Some(secs) = escalate(group, &mut esc, step, config)? {
            timer::arm(secs);
            armed = true;
            debug!(secs, kill_stage = esc.kill_stage_armed(), "deadline re-armed");
        }
    }
}

/*
 * Deliver `first` and keep going while the re-arm is zero (interval 0
 * means "right away"). Returns the first non-zero re-arm, or None when
 * the pending deadline, if any, should be left alone.
 */
fn escalate<G: ProcessGroup>(
    group: &G,
    esc: &mut Escalation<'_>,
    first: Step,
    config: &RunConfig,
) -> Result<Option<u64>> {
    let mut step = first;
    loop {
        send(group, step.signal, config)?;
        match step.rearm {
            Some(0) => step = esc.on_deadline(),
            rearm => return Ok(rearm),
        }
    }
}

fn send<G: ProcessGroup>(group: &G, signal: Signal, config: &RunConfig) -> Result<()> {
    if config.verbose {
        eprintln!(
            "timeout: sending signal {} to command '{}'",
            signal_name(signal),
            config.program()
        );
    }
    debug!(?signal, "signalling group");
    group.signal_group(signal)
}
