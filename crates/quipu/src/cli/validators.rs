//! CLI input validation functions.
//!
//! Used by clap's `value_parser` attribute so bad values are rejected at
//! parse time, with the same limits the script directives enforce.

/// Validate a keystroke speed in seconds.
pub fn validate_speed(s: &str) -> Result<f64, String> {
    let speed = parse_number(s)?;
    if speed < 0.0 {
        return Err(format!("Speed must not be negative, got {speed}"));
    }
    Ok(speed)
}

/// Validate a jitter fraction.
pub fn validate_jitter(s: &str) -> Result<f64, String> {
    let jitter = parse_number(s)?;
    if !(0.0..=1.0).contains(&jitter) {
        return Err(format!("Jitter must be between 0.0 and 1.0, got {jitter}"));
    }
    Ok(jitter)
}

/// Validate a terminal dimension (columns or rows).
pub fn validate_dimension(s: &str) -> Result<u16, String> {
    let value: u16 = s
        .trim()
        .parse()
        .map_err(|_| format!("Expected a whole number between 1 and {}, got '{s}'", u16::MAX))?;
    if value == 0 {
        return Err("Dimension must be greater than zero".to_string());
    }
    Ok(value)
}

fn parse_number(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Expected a number, got '{s}'"))?;
    if !value.is_finite() {
        return Err(format!("Expected a finite number, got '{s}'"));
    }
    Ok(value)
}
