use super::error::ApiError;

pub const MAX_ID_LENGTH: usize = 128;
pub const MAX_NAME_LENGTH: usize = 256;
pub const MAX_SHORT_STRING_LENGTH: usize = 64;
pub const MAX_USER_AGENT_LENGTH: usize = 512;

/// Reject strings longer than `max` with a 400 naming the field.
pub fn validate_string_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.len() > max {
        return Err(ApiError::bad_request(format!(
            "{field} exceeds maximum length of {max} bytes"
        )));
    }
    Ok(())
}

/// Reject empty strings with a 400 naming the field.
pub fn validate_required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}
