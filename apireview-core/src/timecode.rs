//! Human-readable encoding for in-video offsets
//!
//! Offsets are written as `hh:mm:ss` (hours are not wrapped at 24). On input,
//! a leading day component (`d.hh:mm:ss`) and fractional seconds are accepted
//! so that indexes written by older tooling still load.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Format an offset as `hh:mm:ss`
pub fn format(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse an offset from `hh:mm:ss`, `d.hh:mm:ss` or `hh:mm:ss.fffffff`
pub fn parse(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (days, clock) = match text.split_once('.') {
        Some((days, rest)) if !days.contains(':') => (days.parse::<u64>().ok()?, rest),
        _ => (0, text),
    };

    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = days
        .checked_mul(24)?
        .checked_add(hours)?
        .checked_mul(3600)?
        .checked_add(minutes * 60)?;
    Duration::from_secs(whole).checked_add(Duration::from_secs_f64(seconds))
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(*duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid timecode: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format(Duration::ZERO), "00:00:00");
        assert_eq!(format(Duration::from_secs(3723)), "01:02:03");
        assert_eq!(format(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_parse_plain() {
        assert_eq!(parse("01:02:03"), Some(Duration::from_secs(3723)));
    }

    #[test]
    fn test_parse_with_days() {
        assert_eq!(parse("1.00:00:10"), Some(Duration::from_secs(86_410)));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        assert_eq!(parse("00:00:01.5"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse("1h2m"), None);
        assert_eq!(parse("00:61:00"), None);
        assert_eq!(parse("00:00:00:00"), None);
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(parse("18446744073709551615:00:00"), None);
        assert_eq!(parse("999999999999999999.00:00:00"), None);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        #[derive(serde::Deserialize)]
        struct Item {
            #[serde(with = "super")]
            #[allow(dead_code)]
            time_code: Duration,
        }
        let result = serde_json::from_str::<Item>(r#"{ "time_code": "99999999999999999:00:00" }"#);
        assert!(result.is_err());
    }
}
