/*
 * args.rs
 *
 * Clap derive macros handle parsing. Life's too short to do this by hand.
 *
 * trailing_var_arg grabs everything after COMMAND so `timeout 5s grep -r`
 * doesn't try to parse grep's flags.
 *
 * Everything here stays text. RunConfig::from_args turns it into seconds
 * and signals, so a bad value is reported before anything is forked.
 */

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "timeout",
    version,
    about = "Run a command with a time limit",
    long_about = "Start COMMAND, and signal its whole process group if it is still \
                  running after DURATION.\n\n\
                  DURATION is a non-negative integer with optional suffix:\n\
                  's' for seconds (default), 'm' for minutes, 'h' for hours, 'd' for days.\n\
                  A duration of 0 disables the timeout.\n\n\
                  SIGLIST is a comma-separated list of signal names or numbers. On timeout \
                  the first one is sent, then each following one after \
                  --interval-between-signals seconds. With --kill-after, KILL is sent if \
                  the command outlives the whole list by that much.\n\n\
                  Examples:\n\
                    timeout 30 cmd                    # TERM after 30 seconds\n\
                    timeout -k 5 1m cmd               # TERM after 1 minute, KILL 5s later\n\
                    timeout -s INT,TERM -i 3 10 cmd   # INT at 10s, TERM at 13s",
    after_help = "Exit status:\n\
                  124 if COMMAND times out\n\
                  125 if the timeout command itself fails\n\
                  126 if COMMAND is found but cannot be invoked\n\
                  127 if COMMAND cannot be found\n\
                  128+N if COMMAND (or timeout itself) is ended by signal N\n\
                  the exit status of COMMAND otherwise"
)]
pub struct Args {
    /// Signals to send on timeout, in order.
    ///
    /// Comma-separated names like 'TERM', 'SIGHUP' or numbers like '9'.
    /// Falls back to TIMEOUT_SIGNAL environment variable.
    #[arg(
        short = 's',
        long = "signal",
        default_value = "TERM",
        value_name = "SIGLIST",
        env = "TIMEOUT_SIGNAL"
    )]
    pub signal: String,

    /// Send a KILL signal if COMMAND is still running this long after the
    /// last signal in SIGLIST.
    ///
    /// 0 disables the extra KILL.
    /// Falls back to TIMEOUT_KILL_AFTER environment variable.
    #[arg(
        short = 'k',
        long = "kill-after",
        value_name = "DURATION",
        env = "TIMEOUT_KILL_AFTER"
    )]
    pub kill_after: Option<String>,

    /// Seconds to wait between successive signals in SIGLIST.
    ///
    /// Falls back to TIMEOUT_INTERVAL environment variable.
    #[arg(
        short = 'i',
        long = "interval-between-signals",
        default_value = "1",
        value_name = "SECONDS",
        env = "TIMEOUT_INTERVAL"
    )]
    pub interval: String,

    /// Diagnose to stderr every signal sent to COMMAND.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Duration before sending the first signal.
    #[arg(value_name = "DURATION")]
    pub duration: String,

    /// Command to run.
    #[arg(value_name = "COMMAND", allow_hyphen_values = true)]
    pub command: String,

    /// Arguments for the command.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "ARG"
    )]
    pub args: Vec<String>,
}

impl Args {
    /// argv as handed to exec: COMMAND followed by its arguments
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.command.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}
