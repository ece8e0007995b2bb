//! Conversions between seconds and the `M:SS` text an operator types and reads.

/// Parses `MM:SS` into total seconds. Never fails: a missing or non-numeric part counts as
/// zero, and anything after a second `:` is ignored.
pub fn parse_time_entry(input: &str) -> u32 {
    let mut parts = input.split(':').map(|part| part.trim().parse::<u32>().unwrap_or(0));
    let minutes = parts.next().unwrap_or(0);
    let seconds = parts.next().unwrap_or(0);
    minutes.saturating_mul(60).saturating_add(seconds)
}

pub fn format_time(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_time_entry() {
        assert_eq!(parse_time_entry("10:00"), 600);
        assert_eq!(parse_time_entry("9:45"), 585);
        assert_eq!(parse_time_entry("0:07"), 7);
        assert_eq!(parse_time_entry(" 2 : 30 "), 150);
        assert_eq!(parse_time_entry("5"), 300);
        assert_eq!(parse_time_entry("5:"), 300);
        assert_eq!(parse_time_entry("5:xx"), 300);
        assert_eq!(parse_time_entry("1:2:3"), 62);
        assert_eq!(parse_time_entry("0:90"), 90);
    }

    #[test]
    fn test_parse_garbage_is_zero() {
        assert_eq!(parse_time_entry(""), 0);
        assert_eq!(parse_time_entry("abc"), 0);
        assert_eq!(parse_time_entry(":"), 0);
        assert_eq!(parse_time_entry("-1:00"), 0);
        assert_eq!(parse_time_entry("1.5:00"), 0);
    }

    #[test]
    fn test_parse_saturates() {
        assert_eq!(parse_time_entry("4294967295:59"), u32::MAX);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(600), "10:00");
        assert_eq!(format_time(585), "9:45");
        assert_eq!(format_time(7), "0:07");
        assert_eq!(format_time(0), "0:00");
    }
}
