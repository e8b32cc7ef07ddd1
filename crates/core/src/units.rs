//! Parsers for the unit-suffixed tokens found in encoder output.
//!
//! Bit rates use decimal coefficients (`k` = 1000) while sizes use binary ones
//! (`k` = 1024), matching how encoders print network rates and file sizes.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;
use thiserror::Error;

static BIT_RATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>\d+\.?\d*)(?P<units>[a-z]+)/s$").unwrap());

static SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>\d+\.?\d*)(?P<units>[a-zA-Z]+)$").unwrap());

static PIPE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-$|^pipe:\d+$").unwrap());

static DECIMAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.?\d*$").unwrap());

/// Parses a plain decimal number, rejecting exponents and `inf`/`NaN`.
fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    if !DECIMAL_REGEX.is_match(text) {
        return None;
    }
    text.parse().ok()
}

/// Errors raised when a unit string does not match any known grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid bit rate: {0}")]
    BitRate(String),

    #[error("Invalid size: {0}")]
    Size(String),

    #[error("Invalid frame rate: {0}")]
    FrameRate(String),

    #[error("Invalid duration: {0}")]
    Duration(String),
}

fn bit_rate_coefficient(unit: char) -> Option<f64> {
    match unit {
        'b' => Some(1.0),
        'k' => Some(1_000.0),
        'm' => Some(1_000_000.0),
        'g' => Some(1_000_000_000.0),
        _ => None,
    }
}

fn size_coefficient(unit: char) -> Option<f64> {
    match unit {
        'b' => Some(1.0),
        'k' => Some(1024.0),
        'm' => Some(1024.0 * 1024.0),
        'g' => Some(1024.0 * 1024.0 * 1024.0),
        _ => None,
    }
}

/// Parses a rate such as `"2111.44kb/s"` into bits per second.
///
/// `"N/A"` is what encoders print before the first frame is out and yields `None`.
pub fn parse_bit_rate(text: &str) -> Result<Option<u64>, ParseError> {
    if text == "N/A" {
        return Ok(None);
    }

    let invalid = || ParseError::BitRate(text.to_string());
    let caps = BIT_RATE_REGEX.captures(text).ok_or_else(invalid)?;
    let value: f64 = caps["value"].parse().map_err(|_| invalid())?;
    let coefficient = caps["units"]
        .chars()
        .next()
        .and_then(bit_rate_coefficient)
        .ok_or_else(invalid)?;

    Ok(Some((value * coefficient) as u64))
}

/// Parses a size such as `"5081kB"` into bytes.
pub fn parse_size(text: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::Size(text.to_string());
    let caps = SIZE_REGEX.captures(text).ok_or_else(invalid)?;
    let value: f64 = caps["value"].parse().map_err(|_| invalid())?;
    let coefficient = caps["units"]
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .and_then(size_coefficient)
        .ok_or_else(invalid)?;

    Ok((value * coefficient) as u64)
}

/// Parses a frame rate given either as a decimal (`"29.97"`) or a ratio (`"30000/1001"`).
///
/// A zero denominator yields `None`.
pub fn parse_frame_rate(text: &str) -> Result<Option<f64>, ParseError> {
    let invalid = || ParseError::FrameRate(text.to_string());

    if let Some((num, denom)) = text.split_once('/') {
        let num = parse_decimal(num).ok_or_else(invalid)?;
        let denom = parse_decimal(denom).ok_or_else(invalid)?;
        if denom == 0.0 {
            return Ok(None);
        }
        return Ok(Some(num / denom));
    }

    parse_decimal(text).map(Some).ok_or_else(invalid)
}

/// Whether the path designates a pipe rather than a file (`-` or `pipe:<fd>`).
pub fn is_pipe_path(text: &str) -> bool {
    PIPE_REGEX.is_match(text)
}

/// Parses a clock duration (`H:MM:SS`, `MM:SS` or `SS`, seconds may be fractional).
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    let invalid = || ParseError::Duration(text.to_string());

    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let (whole, seconds) = parts.split_at(parts.len() - 1);
    let seconds = parse_decimal(seconds[0]).ok_or_else(invalid)?;

    let mut total = 0u64;
    for part in whole {
        let value: u64 = part.parse().map_err(|_| invalid())?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(invalid)?;
    }

    Duration::try_from_secs_f64(total as f64 * 60.0 + seconds).map_err(|_| invalid())
}

/// Formats a duration as `H:MM:SS.mmm`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bit_rate() {
        assert_eq!(parse_bit_rate("128kb/s").unwrap(), Some(128_000));
        assert_eq!(parse_bit_rate("1.5mb/s").unwrap(), Some(1_500_000));
        assert_eq!(parse_bit_rate("2gb/s").unwrap(), Some(2_000_000_000));
        assert_eq!(parse_bit_rate("800b/s").unwrap(), Some(800));
        assert_eq!(parse_bit_rate("2111.44kb/s").unwrap(), Some(2_111_440));
        assert_eq!(parse_bit_rate("4231.5kbits/s").unwrap(), Some(4_231_500));
    }

    #[test]
    fn test_parse_bit_rate_not_available() {
        assert_eq!(parse_bit_rate("N/A").unwrap(), None);
    }

    #[test]
    fn test_parse_bit_rate_invalid() {
        assert!(matches!(
            parse_bit_rate("fast"),
            Err(ParseError::BitRate(_))
        ));
        assert!(parse_bit_rate("128kb").is_err());
        assert!(parse_bit_rate("128KB/s").is_err());
        assert!(parse_bit_rate("12x/s").is_err());
        assert!(parse_bit_rate("").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512b").unwrap(), 512);
        assert_eq!(parse_size("10kB").unwrap(), 10 * 1024);
        assert_eq!(parse_size("1.5M").unwrap(), 1_572_864);
        assert_eq!(parse_size("2GiB").unwrap(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_size_and_bit_rate_scale_differently() {
        let size = parse_size("1k").unwrap();
        let rate = parse_bit_rate("1k/s").unwrap().unwrap();
        assert_eq!(size, 1024);
        assert_eq!(rate, 1000);
    }

    #[test]
    fn test_parse_size_invalid() {
        assert!(matches!(parse_size("N/A"), Err(ParseError::Size(_))));
        assert!(parse_size("12").is_err());
        assert!(parse_size("12t").is_err());
        assert!(parse_size("kB").is_err());
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1").unwrap(), Some(30.0));
        assert_eq!(parse_frame_rate("30/0").unwrap(), None);
        assert_eq!(parse_frame_rate("29.97").unwrap(), Some(29.97));
        let ntsc = parse_frame_rate("30000/1001").unwrap().unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert!(matches!(
            parse_frame_rate("abc"),
            Err(ParseError::FrameRate(_))
        ));
        assert!(parse_frame_rate("30/x").is_err());
    }

    #[test]
    fn test_parse_frame_rate_rejects_non_decimal() {
        assert!(parse_frame_rate("inf").is_err());
        assert!(parse_frame_rate("NaN").is_err());
        assert!(parse_frame_rate("1e3").is_err());
        assert!(parse_frame_rate("30/inf").is_err());
        assert!(parse_frame_rate("-25").is_err());
    }

    #[test]
    fn test_is_pipe_path() {
        assert!(is_pipe_path("-"));
        assert!(is_pipe_path("pipe:1"));
        assert!(is_pipe_path("pipe:42"));
        assert!(!is_pipe_path("pipe:"));
        assert!(!is_pipe_path("--"));
        assert!(!is_pipe_path("/tmp/out.mkv"));
        assert!(!is_pipe_path("pipe:1.mkv"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0:00:02").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1:02:03").unwrap(), Duration::from_secs(3723));
        assert_eq!(parse_duration("00:00:00").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("02:30").unwrap(), Duration::from_secs(150));
        assert_eq!(
            parse_duration("00:00:14.5").unwrap(),
            Duration::from_millis(14_500)
        );
        assert_eq!(parse_duration("42").unwrap(), Duration::from_secs(42));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(matches!(parse_duration(""), Err(ParseError::Duration(_))));
        assert!(parse_duration("::").is_err());
        assert!(parse_duration("1:2:3:4").is_err());
        assert!(parse_duration("a:00:00").is_err());
        assert!(parse_duration("-5").is_err());
        assert!(parse_duration("1e3").is_err());
        assert!(parse_duration("0:00:inf").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(matches!(
            parse_duration("999999999999999999:00:00"),
            Err(ParseError::Duration(_))
        ));
        assert!(parse_duration("18446744073709551615:00").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(3723)), "1:02:03.000");
        assert_eq!(format_duration(Duration::from_millis(1_250)), "0:00:01.250");
    }
}
