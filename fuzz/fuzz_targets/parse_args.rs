/*
 * fuzz_targets/parse_args.rs
 *
 * fuzz target for CLI argument parsing. Args::try_parse_from plus
 * RunConfig::from_args must never panic on arbitrary argument vectors;
 * help and version come back as errors from try_parse_from, not exits.
 *
 * edge cases: "-sTERM", "--signal=", "-k" (missing value), "--", "-v5",
 * hyphenated commands, very long args
 */

#![no_main]

use clap::Parser;
use libfuzzer_sys::fuzz_target;

use escalating_timeout::args::Args;
use escalating_timeout::runner::RunConfig;

fuzz_target!(|data: &[u8]| {
    /* split input on null bytes to simulate multiple arguments */
    let args: Vec<String> = core::iter::once("timeout")
        .chain(
            data.split(|&b| b == 0)
                .filter_map(|chunk| core::str::from_utf8(chunk).ok()),
        )
        .map(String::from)
        .collect();

    if let Ok(parsed) = Args::try_parse_from(&args)
        && let Ok(config) = RunConfig::from_args(&parsed)
    {
        assert!(!config.signals.is_empty());
        assert!(!config.command.is_empty());
    }
});
