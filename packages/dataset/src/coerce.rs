//! Cell-level coercion for string tables.
//!
//! Tables are stored as strings so that identifiers keep their leading
//! zeros. Numeric columns are coerced on demand; an empty cell or a
//! well-known null token counts as *missing*, anything else that does not
//! parse counts as *non-numeric*.

/// Tokens that spreadsheet and dataframe exports use for "no value".
const MISSING_TOKENS: &[&str] = &["na", "n/a", "nan", "null", "none", "<na>"];

/// Whether a cell represents a missing value.
#[must_use]
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty()
        || MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Parses a finite number from a cell. Missing or malformed cells yield
/// `None`.
#[must_use]
pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Outcome of coercing a single cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    /// A finite number.
    Number(f64),
    /// Empty or a null token.
    Missing,
    /// Present but not a number.
    Invalid,
}

/// Classifies a cell as a number, missing, or invalid.
#[must_use]
pub fn coerce(cell: &str) -> Coerced {
    if is_missing(cell) {
        return Coerced::Missing;
    }
    parse_number(cell).map_or(Coerced::Invalid, Coerced::Number)
}

/// Formats a float for a CSV cell without trailing noise (`12.0` -> `12`).
#[must_use]
pub fn format_number(value: f64) -> String {
    let rendered = format!("{value}");
    rendered
        .strip_suffix(".0")
        .map_or_else(|| rendered.clone(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_missing_tokens() {
        for cell in ["", "  ", "NA", "nan", "NULL", "None", "<NA>"] {
            assert!(is_missing(cell), "{cell:?}");
            assert_eq!(coerce(cell), Coerced::Missing);
        }
    }

    #[test]
    fn parses_numbers_with_noise() {
        assert_eq!(parse_number(" 42.5 "), Some(42.5));
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("-87.6"), Some(-87.6));
        assert_eq!(coerce("abc"), Coerced::Invalid);
        assert_eq!(coerce("inf"), Coerced::Invalid);
    }

    #[test]
    fn formats_without_trailing_zero() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(8.5), "8.5");
    }
}
