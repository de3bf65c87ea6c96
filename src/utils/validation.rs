use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"));

static ORDER_NUMBER_REGEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$"));

/// Validates an email address
pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_REGEX.as_ref().is_ok_and(|re| re.is_match(email)) {
        return Err(AppError::ValidationError(
            "Invalid email address".to_string(),
        ));
    }
    Ok(())
}

/// Client order numbers become the gateway `orderNumber`, so keep them to a
/// conservative alphabet.
pub fn validate_order_number(order_number: &str) -> AppResult<()> {
    if !ORDER_NUMBER_REGEX
        .as_ref()
        .is_ok_and(|re| re.is_match(order_number))
    {
        return Err(AppError::ValidationError(
            "Order number must be 1-64 letters, digits, '-' or '_'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana.petrova+conf@example.co").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana example@example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_order_number() {
        assert!(validate_order_number("0b8f3c1e-8d1a-4c59-9a55-6f3f2f0e9b1a").is_ok());
        assert!(validate_order_number("ORD_42").is_ok());
        assert!(validate_order_number("").is_err());
        assert!(validate_order_number("order 1").is_err());
        assert!(validate_order_number(&"x".repeat(65)).is_err());
    }
}
