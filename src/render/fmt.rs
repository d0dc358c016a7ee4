//! Number formatting for content-stream operands.
//!
//! Operands use a fixed `.` decimal point regardless of locale, a bounded
//! number of fractional digits, and no trailing zeros.

/// Fractional digits for coordinates and lengths
pub const COORD_PRECISION: usize = 4;

/// Fractional digits for color components and opacities
pub const COLOR_PRECISION: usize = 3;

/// Format a number with at most `decimals` fractional digits, trailing zeros trimmed.
pub fn fmt_num(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.prec$}", value, prec = decimals);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s.as_str()
    };
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

/// Coordinate operand
pub fn coord(value: f64) -> String {
    fmt_num(value, COORD_PRECISION)
}

/// Color or opacity operand
pub fn color(value: f64) -> String {
    fmt_num(value, COLOR_PRECISION)
}

/// Space-separated coordinate operands
pub fn coords(values: &[f64]) -> String {
    values.iter().map(|v| coord(*v)).collect::<Vec<_>>().join(" ")
}
