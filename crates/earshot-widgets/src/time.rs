//! Time readout formatting

/// Format seconds as `[HH:]MM:SS`
///
/// Components are truncated, not rounded. The hours segment only appears
/// from one hour upwards. Negative and non-finite input reads as zero.
///
/// ```
/// use earshot_widgets::format_time;
///
/// assert_eq!(format_time(65.0), "01:05");
/// assert_eq!(format_time(3661.0), "01:01:01");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_reference_values() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.0), "01:05");
        assert_eq!(format_time(3661.0), "01:01:01");
    }

    #[test]
    fn test_format_time_truncates() {
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(3599.99), "59:59");
        assert_eq!(format_time(3600.0), "01:00:00");
    }

    #[test]
    fn test_format_time_degenerate_input() {
        assert_eq!(format_time(-3.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(f64::INFINITY), "00:00");
    }

    #[test]
    fn test_format_time_long_durations_keep_counting_hours() {
        assert_eq!(format_time(100.0 * 3600.0 + 5.0), "100:00:05");
    }
}
