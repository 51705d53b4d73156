/*
 * fuzz_targets/parse_duration.rs
 *
 * parse_duration must return Ok or Err on any input, never panic. A
 * successful parse must also survive the alarm clamp in timer::arm.
 *
 * edge cases: "", "18446744073709551615d", "-1", "1.5", "+5", "5ms", unicode
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data)
        && let Ok(secs) = escalating_timeout::duration::parse_duration(s)
    {
        /* digits and at most one suffix char after trimming */
        let t = s.trim();
        assert!(t.bytes().filter(|b| !b.is_ascii_digit()).count() <= 1);
        let _ = u32::try_from(secs).unwrap_or(u32::MAX);
    }
});
