use chrono::{DateTime, Utc};

/// RSS date format (RFC 2822). The day of month is not zero-padded.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chopchoprss::util::rfc2822;
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(rfc2822(&at), "Mon, 1 Jan 2024 00:00:00 +0000");
/// ```
pub fn rfc2822(at: &DateTime<Utc>) -> String {
    at.to_rfc2822()
}

/// Formats seconds as `HH:MM:SS` for `<itunes:duration>`.
///
/// Hours are not capped, so a 100-hour recording reads `100:00:00`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_rfc2822() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(rfc2822(&at), "Mon, 1 Jan 2024 00:00:00 +0000");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(3_723), "01:02:03");
        assert_eq!(format_duration(360_000), "100:00:00");
    }

    proptest! {
        #[test]
        fn prop_duration_parts_round_trip(secs in 0u64..1_000_000) {
            let formatted = format_duration(secs);
            let parts: Vec<u64> = formatted.split(':').map(|p| p.parse().unwrap()).collect();
            prop_assert_eq!(parts.len(), 3);
            prop_assert!(parts[1] < 60 && parts[2] < 60);
            prop_assert_eq!(parts[0] * 3600 + parts[1] * 60 + parts[2], secs);
        }
    }
}
