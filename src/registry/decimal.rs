//! Decimal parsing that ignores the host locale.
//!
//! FIAS exports write `56,500`, the geocoder writes `56.500`. Both are
//! accepted, always.

use super::types::RegistryError;

/// Parse a decimal number written with either `,` or `.` as separator.
pub fn parse_decimal(raw: &str) -> Result<f64, RegistryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.matches([',', '.']).count() > 1 {
        return Err(RegistryError::InvalidDecimal(raw.to_string()));
    }

    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| RegistryError::InvalidDecimal(raw.to_string()))?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(RegistryError::InvalidDecimal(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_comma_separator() {
        assert_abs_diff_eq!(parse_decimal("56,500").unwrap(), 56.5, epsilon = 1e-9);
    }

    #[test]
    fn test_period_separator() {
        assert_abs_diff_eq!(parse_decimal("84.973").unwrap(), 84.973, epsilon = 1e-9);
    }

    #[test]
    fn test_integer_and_whitespace() {
        assert_abs_diff_eq!(parse_decimal(" 37 ").unwrap(), 37.0, epsilon = 1e-9);
        assert_abs_diff_eq!(parse_decimal("-12,25").unwrap(), -12.25, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("   ").is_err());
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("1,234.5").is_err());
        assert!(parse_decimal("NaN").is_err());
        assert!(parse_decimal("inf").is_err());
    }
}
