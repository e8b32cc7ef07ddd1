//! Recognizes x264 progress lines in raw stderr chunks.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use super::types::MatchResult;
use crate::units::parse_duration;

// [79.5%] 3276/4123 frames, 284.69 fps, 2111.44 kb/s, eta 0:00:02
static PROGRESS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[(?P<percent>\d+\.\d*)%\]\s+(?P<frame>\d+)/(?P<frame_total>\d+)\s+frames,\s+(?P<fps>\d+\.\d*)\s+fps,\s+(?P<bitrate>[^,]+),\s+eta\s+(?P<eta>[\d:]+)",
    )
    .unwrap()
});

/// Extracts the progress record at the start of `chunk`, if any.
///
/// Most chunks hold banners, warnings or blank lines and yield `None`.
pub fn match_progress(chunk: &str) -> Option<MatchResult> {
    let caps = PROGRESS_REGEX.captures(chunk)?;

    let parsed = (|| {
        Some(MatchResult {
            percent: caps["percent"].parse().ok()?,
            frame: caps["frame"].parse().ok()?,
            frame_total: caps["frame_total"].parse().ok()?,
            fps: caps["fps"].parse().ok()?,
            bitrate: caps["bitrate"].trim().to_string(),
            eta: parse_duration(&caps["eta"]).ok()?,
        })
    })();

    if parsed.is_none() {
        debug!("Discarding malformed progress line: {:?}", &caps[0]);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_match_reference_line() {
        let m = match_progress("[79.5%] 3276/4123 frames, 284.69 fps, 2111.44kb/s, eta 0:00:02")
            .unwrap();
        assert_eq!(m.percent, 79.5);
        assert_eq!(m.frame, 3276);
        assert_eq!(m.frame_total, 4123);
        assert_eq!(m.fps, 284.69);
        assert_eq!(m.bitrate, "2111.44kb/s");
        assert_eq!(m.eta, Duration::from_secs(2));
    }

    #[test]
    fn test_match_spaced_bitrate() {
        let m = match_progress("[12.0%] 120/1000 frames, 30.00 fps, 850.12 kb/s, eta 1:02:03  \r")
            .unwrap();
        assert_eq!(m.bitrate, "850.12 kb/s");
        assert_eq!(m.eta, Duration::from_secs(3723));
    }

    #[test]
    fn test_match_takes_first_record() {
        let chunk = "[10.0%] 10/100 frames, 5.00 fps, 100.00 kb/s, eta 0:00:18\r\
                     [20.0%] 20/100 frames, 5.00 fps, 110.00 kb/s, eta 0:00:16\r";
        let m = match_progress(chunk).unwrap();
        assert_eq!(m.frame, 10);
        assert_eq!(m.percent, 10.0);
    }

    #[test]
    fn test_match_is_anchored() {
        let chunk = "x264 [info]: profile High\n[10.0%] 10/100 frames, 5.00 fps, 100.00 kb/s, eta 0:00:18";
        assert!(match_progress(chunk).is_none());
    }

    #[test]
    fn test_no_match_on_noise() {
        assert!(match_progress("").is_none());
        assert!(match_progress("\n").is_none());
        assert!(match_progress("y4m [info]: 1920x1080p 1:1 @ 25/1 fps (cfr)").is_none());
        assert!(match_progress("encoded 4123 frames, 281.20 fps, 2110.35 kb/s").is_none());
    }

    #[test]
    fn test_no_match_on_partial_line() {
        assert!(match_progress("[79.5%] 3276/4123 frames, 284.6").is_none());
        assert!(match_progress("[79.5%] 3276/4123 frames, 284.69 fps, 2111.44kb/s, eta ").is_none());
    }

    #[test]
    fn test_malformed_eta_is_discarded() {
        assert!(match_progress("[1.0%] 1/100 frames, 1.00 fps, 1.00 kb/s, eta 1:2:3:4").is_none());
    }

    #[test]
    fn test_oversized_eta_is_discarded() {
        assert!(match_progress(
            "[1.0%] 1/100 frames, 1.00 fps, 1.00 kb/s, eta 999999999999999999:00:00"
        )
        .is_none());
    }
}
