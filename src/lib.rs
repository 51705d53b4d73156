/*
 * lib.rs
 *
 * Exists mostly for testing. Integration tests need our types, doc tests
 * need a lib. You can supervise commands from your own program too, one at
 * a time: signal handlers are process-wide.
 */

//! # escalating-timeout
//!
//! Run a command under a deadline. On expiry, walk a list of signals
//! against the command's whole process group, with a gap between each and
//! an optional final KILL. Exit codes follow the coreutils convention.
//!
//! ## Quick Start
//!
//! ```rust
//! use escalating_timeout::{parse_duration, parse_signal_list, signal::Signal};
//!
//! // Parse duration strings into seconds
//! assert_eq!(parse_duration("2m").unwrap(), 120);
//!
//! // Parse escalation lists
//! let sigs = parse_signal_list("INT,TERM,KILL").unwrap();
//! assert_eq!(sigs, vec![Signal::SIGINT, Signal::SIGTERM, Signal::SIGKILL]);
//! ```
//!
//! ## Running a command
//!
//! ```rust,no_run
//! use escalating_timeout::{RunConfig, run_command, signal::Signal, status::translate};
//!
//! let config = RunConfig {
//!     duration: 5,
//!     signals: vec![Signal::SIGTERM],
//!     interval: 1,
//!     kill_after: 2,
//!     command: vec!["sleep".into(), "60".into()],
//!     verbose: false,
//! };
//! let result = run_command(&config).unwrap();
//! assert_eq!(translate(&result, "sleep 60").code, 124);
//! ```

pub mod args;
pub mod duration;
pub mod error;
pub mod escalation;
pub mod events;
pub mod io;
pub mod process;
pub mod runner;
pub mod signal;
pub mod status;
pub mod timer;

pub use args::Args;
pub use duration::{is_no_timeout, parse_duration};
pub use error::{Result, TimeoutError, exit_codes};
pub use escalation::{Escalation, Step};
pub use process::{ExitStatus, ProcessGroup};
pub use runner::{RunConfig, RunResult, run_command};
pub use signal::{parse_signal, parse_signal_list, signal_name, signal_number};
pub use status::{Verdict, translate};
