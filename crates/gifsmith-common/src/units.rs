//! Human-readable byte sizes.

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Format a byte count the way progress messages show it: `512B`, `1.5KB`, `25.0MB`.
///
/// # Examples
///
/// ```
/// use gifsmith_common::units::format_bytes;
///
/// assert_eq!(format_bytes(512), "512B");
/// assert_eq!(format_bytes(1536), "1.5KB");
/// assert_eq!(format_bytes(25 * 1024 * 1024), "25.0MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes < KIB {
        format!("{bytes}B")
    } else if bytes < MIB {
        format!("{:.1}KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1}MB", bytes as f64 / MIB as f64)
    }
}

/// Integer percentage of `done` over `total`, clamped to `0..=100`.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_boundaries() {
        assert_eq!(format_bytes(0), "0B");
        assert_eq!(format_bytes(1023), "1023B");
        assert_eq!(format_bytes(1024), "1.0KB");
        assert_eq!(format_bytes(MIB - 1), "1024.0KB");
        assert_eq!(format_bytes(MIB), "1.0MB");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 100), 0);
        assert_eq!(percent(50, 100), 50);
        assert_eq!(percent(150, 100), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(10, 0), 0);
    }
}
