//! Utilities module for logging, errors, and formatting helpers

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{Result, UNetError};
pub use logging::init_logging;

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.1}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    }
}

/// Format a number with thousands separator
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format a tensor shape as `[a, b, c, d]`
pub fn format_dims(dims: &[usize]) -> String {
    let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0125), "12.5ms");
        assert_eq!(format_duration(30.5), "30.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(31_030_658), "31,030,658");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(42), "42");
    }

    #[test]
    fn test_format_dims() {
        assert_eq!(format_dims(&[1, 2, 388, 388]), "[1, 2, 388, 388]");
        assert_eq!(format_dims(&[]), "[]");
    }
}
