/*
 * duration.rs
 *
 * Parse "30", "30s", "5m", "2h", "1d" into whole seconds. No suffix means
 * seconds. Suffix is case insensitive. The timer has one-second resolution
 * so fractions are rejected rather than silently rounded.
 *
 * Zero means no deadline. Overflowing u64 is an error, not a wrap.
 */

use crate::error::{Result, TimeoutError};

/// Parse "30", "30s", "5m", "2h", "1d" into seconds.
///
/// # Examples
///
/// ```
/// use escalating_timeout::duration::parse_duration;
///
/// assert_eq!(parse_duration("30").unwrap(), 30);
/// assert_eq!(parse_duration("30s").unwrap(), 30);
/// assert_eq!(parse_duration("5m").unwrap(), 300);
/// assert_eq!(parse_duration("2h").unwrap(), 7200);
/// assert_eq!(parse_duration("1d").unwrap(), 86400);
/// assert_eq!(parse_duration("0").unwrap(), 0);
/// ```
pub fn parse_duration(input: &str) -> Result<u64> {
    let input = input.trim();

    if input.is_empty() {
        return Err(TimeoutError::InvalidDuration("empty duration".to_string()));
    }

    if input.starts_with('-') {
        return Err(TimeoutError::NegativeDuration);
    }

    let (num_str, suffix) = split_number_and_suffix(input);

    if num_str.is_empty() {
        return Err(TimeoutError::InvalidDuration(format!(
            "no numeric value in '{input}'"
        )));
    }

    /* u64::from_str accepts a leading '+', we don't */
    if !num_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeoutError::InvalidDuration(format!(
            "invalid number '{num_str}'"
        )));
    }

    let value: u64 = num_str.parse().map_err(|_| TimeoutError::DurationOverflow)?;

    let multiplier = suffix_multiplier(suffix).ok_or_else(|| {
        TimeoutError::InvalidDuration(format!("invalid suffix '{suffix}' in '{input}'"))
    })?;

    value
        .checked_mul(multiplier)
        .ok_or(TimeoutError::DurationOverflow)
}

/* seconds per unit, case insensitive */
fn suffix_multiplier(suffix: &str) -> Option<u64> {
    match suffix {
        "" | "s" | "S" => Some(1),
        "m" | "M" => Some(60),
        "h" | "H" => Some(3600),
        "d" | "D" => Some(86400),
        _ => None,
    }
}

/* find where the digits end and suffix begins */
fn split_number_and_suffix(input: &str) -> (&str, &str) {
    let suffix_start = input
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_digit() || *c == '.')
        .map_or(0, |(i, c)| i + c.len_utf8());

    (&input[..suffix_start], &input[suffix_start..])
}

/* zero duration = no deadline */
#[must_use]
pub const fn is_no_timeout(seconds: u64) -> bool {
    seconds == 0
}
