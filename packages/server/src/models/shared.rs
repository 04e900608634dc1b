use crate::error::AppError;

/// Validate a trimmed display name (1-256 Unicode characters).
pub fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 256 {
        return Err(AppError::Validation("Name must be 1-256 characters".into()));
    }
    Ok(())
}

/// Validate an opaque identifier used in URLs and storage keys.
///
/// Identifiers become path segments of artifact keys and workflow URLs, so
/// the charset is restricted to alphanumerics, `-` and `_`.
pub fn validate_identifier(id: &str, what: &str) -> Result<(), AppError> {
    if id.is_empty() || id.len() > 64 {
        return Err(AppError::Validation(format!(
            "{what} must be 1-64 characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!(
            "{what} may only contain alphanumerics, '-' and '_'"
        )));
    }
    Ok(())
}

/// Validate an email address (presence check only; addresses are trusted
/// input from the design UI, not authentication material).
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() || email.len() > 320 || !email.contains('@') {
        return Err(AppError::Validation(format!(
            "Invalid email address: '{email}'"
        )));
    }
    Ok(())
}
