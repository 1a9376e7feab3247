//! Parameter value conversions
//!
//! Levels travel as two-decimal percentages (`0.00`-`100.00`), durations as
//! `HH:MM:SS`, and "no value" as the `xx` sentinel.

use std::time::Duration;

use crate::constants::NULL_PARAM;
use crate::error::{Error, Result};

/// Format a level in `[0, 1]` as a percentage parameter
///
/// Out-of-range input is clamped, non-finite input is sent as `0.00`.
///
/// # Examples
///
/// ```
/// use nwkrust_core::codec;
///
/// assert_eq!(codec::format_level(0.5), "50.00");
/// assert_eq!(codec::format_level(1.0), "100.00");
/// ```
pub fn format_level(level: f64) -> String {
    let level = if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    };
    format!("{:.2}", level * 100.0)
}

/// Parse a percentage parameter back into `[0, 1]`
pub fn parse_level(value: &str) -> Result<f64> {
    let percent: f64 = value.trim().parse().map_err(|_| Error::InvalidNumber {
        field: "level",
        value: value.to_string(),
    })?;
    Ok(percent / 100.0)
}

/// Format a duration as `HH:MM:SS`
///
/// Sub-second precision is dropped; hours grow past two digits if needed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nwkrust_core::codec;
///
/// assert_eq!(codec::format_duration(Duration::from_secs(3725)), "01:02:05");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

/// Parse a duration parameter
///
/// Fields are read from the right: `SS`, `MM:SS` and `HH:MM:SS` are all
/// accepted, missing leading fields count as zero. Seconds may be fractional.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDuration(value.to_string());

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut fields = trimmed.rsplit(':');

    let seconds: f64 = fields
        .next()
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;
    // Rejects negative, non-finite and out-of-range values
    let seconds = Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?;

    let mut whole = 0u64;
    for multiplier in [60u64, 3600] {
        match fields.next() {
            Some(field) => {
                let n: u64 = field.parse().map_err(|_| invalid())?;
                whole = n
                    .checked_mul(multiplier)
                    .and_then(|v| v.checked_add(whole))
                    .ok_or_else(invalid)?;
            }
            None => break,
        }
    }

    if fields.next().is_some() {
        return Err(invalid());
    }

    Duration::from_secs(whole)
        .checked_add(seconds)
        .ok_or_else(invalid)
}

/// Format an optional integer, `None` becomes `xx`
pub fn format_optional(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NULL_PARAM.to_string(),
    }
}

/// Parse an optional integer, `xx` becomes `None`
pub fn parse_optional(value: &str) -> Result<Option<u32>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case(NULL_PARAM) {
        return Ok(None);
    }
    parse_u32("parameter", value).map(Some)
}

/// Parse an unsigned integer field
pub fn parse_u32(field: &'static str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(0.0), "0.00");
        assert_eq!(format_level(0.123), "12.30");
        assert_eq!(format_level(1.5), "100.00");
        assert_eq!(format_level(-0.2), "0.00");
        assert_eq!(format_level(f64::NAN), "0.00");
    }

    #[test]
    fn test_parse_level() {
        assert!((parse_level("50.00").unwrap() - 0.5).abs() < 1e-9);
        assert!((parse_level("100").unwrap() - 1.0).abs() < 1e-9);
        assert!(parse_level("high").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(90)), "00:01:30");
        assert_eq!(format_duration(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_parse_duration_lenient() {
        assert_eq!(parse_duration("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("1:30").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("01:00:01").unwrap(), Duration::from_secs(3601));
        assert_eq!(parse_duration("00:02.5").unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("a:b").is_err());
        assert!(parse_duration("1:2:3:4").is_err());
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("NaN").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert!(matches!(parse_duration("1e300"), Err(Error::InvalidDuration(_))));
        assert!(matches!(
            parse_duration("5124095576030431:00:1e19"),
            Err(Error::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_optional() {
        assert_eq!(format_optional(None), "xx");
        assert_eq!(format_optional(Some(3)), "3");
        assert_eq!(parse_optional("xx").unwrap(), None);
        assert_eq!(parse_optional("XX").unwrap(), None);
        assert_eq!(parse_optional("12").unwrap(), Some(12));
        assert!(parse_optional("twelve").is_err());
    }

    proptest! {
        #[test]
        fn prop_level_round_trip(level in 0.0f64..=1.0) {
            let parsed = parse_level(&format_level(level)).unwrap();
            prop_assert!((parsed - level).abs() <= 0.01);
        }

        #[test]
        fn prop_duration_round_trip(hours in 0u64..500, minutes in 0u64..60, seconds in 0u64..60) {
            let duration = Duration::from_secs(hours * 3600 + minutes * 60 + seconds);
            prop_assert_eq!(parse_duration(&format_duration(duration)).unwrap(), duration);
        }
    }
}
