// src/app/utils.rs
// Contains formatting helpers for LlamaNest: byte sizes, model card statistics and the version string.

use crate::app::config::{BUILD_NUMBER, SCRIPT_VERSION};

// --- Utility Functions ---
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    const TIB: u64 = GIB * 1024;

    if bytes >= TIB {
        format!("{:.2} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Model card statistics line. Sizes are decimal gigabytes, parameters billions.
pub fn format_model_stats(size: u64, params: u64) -> String {
    let size_gb = size as f64 / 1e9;
    let params_b = params as f64 / 1e9;
    format!("Size: {:.2} GB  |  Parameters: {:.1}B", size_gb, params_b)
}

/// `Version X (build)`, as shown and copied from the about window.
pub fn version_string() -> String {
    format!("Version {} ({})", SCRIPT_VERSION, BUILD_NUMBER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }

    #[test]
    fn model_stats_use_decimal_units() {
        assert_eq!(
            format_model_stats(1_120_000_000, 1_500_000_000),
            "Size: 1.12 GB  |  Parameters: 1.5B"
        );
        assert_eq!(format_model_stats(0, 0), "Size: 0.00 GB  |  Parameters: 0.0B");
    }

    #[test]
    fn version_string_has_build() {
        let v = version_string();
        assert!(v.starts_with("Version "));
        assert!(v.ends_with(&format!("({})", BUILD_NUMBER)));
    }
}
