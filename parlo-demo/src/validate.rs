//! Request field validation
//!
//! Hand-rolled checks producing field-level messages for 422 responses.

use crate::error::{ApiError, ApiResult};

/// Maximum accepted email length
const MAX_EMAIL_CHARS: usize = 255;

/// Validate an email address, returning the trimmed, lowercased form
///
/// Intentionally permissive: one `@`, a non-empty local part, and a domain
/// with at least one interior dot. Deliverability is not our problem here.
pub fn validate_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_lowercase();

    if email.is_empty() {
        return Err(ApiError::invalid_field("email", "The email field is required"));
    }
    if email.len() > MAX_EMAIL_CHARS {
        return Err(ApiError::invalid_field("email", "The email is too long"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid_email());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid_email());
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid_email());
    }
    // Domain needs an interior dot: "b.com" yes, ".com" / "com." no
    let has_interior_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i < domain.len() - 1);
    if !has_interior_dot {
        return Err(invalid_email());
    }

    Ok(email)
}

fn invalid_email() -> ApiError {
    ApiError::invalid_field("email", "The email must be a valid email address")
}

/// Reject requests whose honeypot field was filled in
///
/// The form renders a hidden `website` input; humans never see it, naive
/// bots fill it.
pub fn check_honeypot(honeypot: Option<&str>) -> ApiResult<()> {
    match honeypot {
        Some(value) if !value.trim().is_empty() => Err(ApiError::BotDetected),
        _ => Ok(()),
    }
}

/// Validate the practice phrase, returning the trimmed form
pub fn validate_phrase(raw: &str, max_chars: usize) -> ApiResult<String> {
    let phrase = raw.trim().to_string();

    if phrase.is_empty() {
        return Err(ApiError::invalid_field("phrase", "The phrase field is required"));
    }
    if phrase.chars().count() > max_chars {
        return Err(ApiError::invalid_field(
            "phrase",
            "The phrase exceeds the maximum length",
        ));
    }

    Ok(phrase)
}
