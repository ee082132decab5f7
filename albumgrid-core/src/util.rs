/// Formats a duration as `h:mm:ss`, or `m:ss` when under an hour.
pub fn seconds_to_hms_string(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Formats a byte count with a binary unit, e.g. `1.5 MiB`.
pub fn bytes_to_human_string(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_hms_string() {
        // Test with hours
        assert_eq!(seconds_to_hms_string(3661), "1:01:01");
        assert_eq!(seconds_to_hms_string(7323), "2:02:03");
        assert_eq!(seconds_to_hms_string(3600), "1:00:00");

        // Test without hours
        assert_eq!(seconds_to_hms_string(61), "1:01");
        assert_eq!(seconds_to_hms_string(123), "2:03");
        assert_eq!(seconds_to_hms_string(0), "0:00");
    }

    #[test]
    fn test_bytes_to_human_string() {
        assert_eq!(bytes_to_human_string(0), "0 B");
        assert_eq!(bytes_to_human_string(1023), "1023 B");
        assert_eq!(bytes_to_human_string(1024), "1.0 KiB");
        assert_eq!(bytes_to_human_string(1536 * 1024), "1.5 MiB");
        assert_eq!(bytes_to_human_string(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }
}
