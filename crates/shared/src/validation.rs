//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a content identifier (before the field suffix).
pub const MAX_CONTENT_ID_LENGTH: usize = 100;

/// Maximum length of a single source text accepted for translation.
pub const MAX_SOURCE_TEXT_LENGTH: usize = 50_000;

/// Validates a two-letter lowercase language code (`en`, `de`, `cs`, `sk`).
pub fn validate_language_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("language_code");
        err.message = Some("Language code must be two lowercase letters".into());
        Err(err)
    }
}

/// Validates that a content identifier is non-blank, bounded, and free of the
/// `:` separator used to append field names.
pub fn validate_content_id(content_id: &str) -> Result<(), ValidationError> {
    let trimmed = content_id.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("content_id_blank");
        err.message = Some("Content id cannot be blank".into());
        return Err(err);
    }
    if trimmed.len() > MAX_CONTENT_ID_LENGTH {
        let mut err = ValidationError::new("content_id_length");
        err.message = Some("Content id must be at most 100 characters".into());
        return Err(err);
    }
    if trimmed.contains(':') {
        let mut err = ValidationError::new("content_id_separator");
        err.message = Some("Content id cannot contain ':'".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a field name: ASCII letters, digits and underscores only.
pub fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("field_name");
        err.message = Some("Field name must be 1-64 letters, digits or underscores".into());
        Err(err)
    }
}

/// Returns true if the text contains something other than whitespace.
pub fn is_translatable(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Counts characters the way the translation API bills them (Unicode scalars).
pub fn billable_characters(text: &str) -> i64 {
    text.chars().count() as i64
}
