use std::str::FromStr;

use rust_decimal::Decimal;

/// Brings a unit-size string into canonical form so that `"1"`, `"1g"`, `" 1.00 "` and `"1.0"` all name the same
/// size.
///
/// Numeric sizes are written without trailing zeros but with at least one fractional digit, and with a leading zero:
/// `"1"` → `"1.0"`, `".5"` → `"0.5"`, `"2.50"` → `"2.5"`. A trailing unit suffix (`g`, `kg`, `ml`, ...) is dropped.
/// Non-numeric sizes (`"Large"`) are trimmed and lower-cased.
pub fn normalize_size(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let numeric = lowered.trim_end_matches(|c: char| c.is_alphabetic()).trim();
    let numeric = if numeric.starts_with('.') { format!("0{numeric}") } else { numeric.to_string() };
    match Decimal::from_str(&numeric) {
        Ok(value) if !value.is_sign_negative() => {
            let value = value.normalize();
            if value.scale() == 0 {
                format!("{value}.0")
            } else {
                value.to_string()
            }
        },
        _ => lowered,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whole_numbers_get_a_decimal_place() {
        assert_eq!(normalize_size("1"), "1.0");
        assert_eq!(normalize_size("2"), "2.0");
        assert_eq!(normalize_size("10"), "10.0");
    }

    #[test]
    fn fractions_get_a_leading_zero() {
        assert_eq!(normalize_size(".5"), "0.5");
        assert_eq!(normalize_size("0.50"), "0.5");
    }

    #[test]
    fn units_and_whitespace_are_dropped() {
        assert_eq!(normalize_size(" 1G "), "1.0");
        assert_eq!(normalize_size("2.5kg"), "2.5");
        assert_eq!(normalize_size("1.0"), "1.0");
    }

    #[test]
    fn labels_are_lowercased() {
        assert_eq!(normalize_size(" Large "), "large");
        assert_eq!(normalize_size("-1"), "-1");
    }
}
