//! Timestamp parsing utilities.
//!
//! Segment proposals from the analysis step may carry times as plain seconds
//! or as clock strings; this module normalizes both to seconds.

use thiserror::Error;

/// Parse a timestamp string to total seconds.
///
/// Supports formats:
/// - `HH:MM:SS` or `HH:MM:SS.mmm`
/// - `MM:SS` or `MM:SS.mmm`
/// - `SS` or `SS.mmm`
///
/// # Examples
/// ```
/// use reelcut_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Fold from the most significant component: h -> m -> s.
    let mut total = 0.0;
    for (idx, part) in parts.iter().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(component_name(parts.len(), idx), part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(component_name(parts.len(), idx), part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

fn component_name(len: usize, idx: usize) -> &'static str {
    match (len, idx) {
        (3, 0) => "hours",
        (3, 1) | (2, 0) => "minutes",
        _ => "seconds",
    }
}

/// Format seconds into HH:MM:SS or HH:MM:SS.mmm string.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or SS")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        assert!((parse_timestamp("00:00:30.500").unwrap() - 30.5).abs() < 0.001);
        assert!((parse_timestamp("1:05").unwrap() - 65.0).abs() < 0.001);
        assert!((parse_timestamp(" 42 ").unwrap() - 42.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert_eq!(parse_timestamp(""), Err(TimestampError::Empty));
        assert_eq!(parse_timestamp("-3"), Err(TimestampError::Negative));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_timestamp("ab:10"),
            Err(TimestampError::InvalidValue("minutes", _))
        ));
        assert!(parse_timestamp("NaN").is_err());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(3725.0), "01:02:05");
        assert_eq!(format_seconds(30.5), "00:00:30.500");
    }
}
