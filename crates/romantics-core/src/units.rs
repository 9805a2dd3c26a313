const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable size in 1024 steps, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

pub fn format_speed(bytes_per_sec: f64) -> String {
    let mut speed = bytes_per_sec.max(0.0);
    for unit in &SIZE_UNITS[..4] {
        if speed < 1024.0 {
            return format!("{:.1} {}/s", speed, unit);
        }
        speed /= 1024.0;
    }
    format!("{:.1} TB/s", speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(1023), "1023.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_size(1024u64.pow(5) * 3), "3.0 PB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(512.0), "512.0 B/s");
        assert_eq!(format_speed(2.0 * 1024.0 * 1024.0), "2.0 MB/s");
        assert_eq!(format_speed(-1.0), "0.0 B/s");
    }
}
