/*
 * fuzz_targets/parse_signal.rs
 *
 * fuzz target for signal list parsing. Any accepted list is non-empty and
 * has exactly one entry per comma-separated item.
 *
 * edge cases: "SIGFOO", "999", "-1", "TERM,,KILL", ",", "  term , 9 ", ""
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data) {
        let _ = escalating_timeout::signal::parse_signal(s);

        if let Ok(list) = escalating_timeout::signal::parse_signal_list(s) {
            assert!(!list.is_empty());
            assert_eq!(list.len(), s.split(',').count());
        }
    }
});
