const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Renders a byte count for the file lists, e.g. `812 B` or `1.50 KB`.
/// Sizes past a gigabyte stay in GB.
pub fn format_size(bytes: u64) -> String {
    let (scale, suffix) = match bytes {
        b if b < KIB => return format!("{} B", b),
        b if b < MIB => (KIB, "KB"),
        b if b < GIB => (MIB, "MB"),
        _ => (GIB, "GB"),
    };
    format!("{:.2} {}", bytes as f64 / scale as f64, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_printed_whole() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn larger_sizes_use_two_decimals() {
        assert_eq!(format_size(KIB), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * MIB), "5.00 MB");
        assert_eq!(format_size(3 * GIB), "3.00 GB");
    }

    #[test]
    fn nothing_beyond_gigabytes() {
        assert_eq!(format_size(2048 * GIB), "2048.00 GB");
    }
}
