//! Currency codes and input validation

use thiserror::Error;

/// Currencies offered by default. The list can be replaced in the config file.
pub const DEFAULT_CURRENCIES: [&str; 10] = [
    "USD", "EUR", "JPY", "GBP", "AUD", "CAD", "CHF", "CNY", "KRW", "ZAR",
];

/// Rejected user input. Raised before anything is persisted or fetched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported currency code: {0}")]
    UnsupportedCurrency(String),

    #[error("Base and target currency must differ (got {0} for both)")]
    SamePair(String),

    #[error("Invalid threshold '{0}': expected a positive number")]
    InvalidThreshold(String),

    #[error("Invalid amount '{0}': expected a positive number")]
    InvalidAmount(String),

    #[error("Invalid time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
}

/// Normalises a currency code and checks it against the allow-list.
pub fn parse_code(code: &str, allowed: &[String]) -> Result<String, ValidationError> {
    let code = code.trim().to_uppercase();
    let well_formed = code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase());
    if !well_formed || !allowed.iter().any(|c| *c == code) {
        return Err(ValidationError::UnsupportedCurrency(code));
    }
    Ok(code)
}

/// Validates a (base, target) pair, returning the normalised codes.
pub fn parse_pair(
    base: &str,
    target: &str,
    allowed: &[String],
) -> Result<(String, String), ValidationError> {
    let base = parse_code(base, allowed)?;
    let target = parse_code(target, allowed)?;
    if base == target {
        return Err(ValidationError::SamePair(base));
    }
    Ok((base, target))
}

/// Parses a strictly positive, finite decimal as typed by a user.
pub fn parse_positive(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

pub fn default_currencies() -> Vec<String> {
    DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect()
}
