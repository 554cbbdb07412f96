use crate::{CoreError, CoreResult};

pub const PHONE_LENGTH: usize = 9;
pub const DNI_LENGTH: usize = 8;
pub const MAX_OPERATION_CODE_LENGTH: usize = 20;

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Mobile numbers: exactly nine digits, starting with `prefix`.
pub fn validate_phone(phone: &str, prefix: char) -> CoreResult<()> {
    if phone.len() != PHONE_LENGTH || !all_digits(phone) {
        return Err(CoreError::ValidationError(format!(
            "phone must have exactly {} digits",
            PHONE_LENGTH
        )));
    }
    if !phone.starts_with(prefix) {
        return Err(CoreError::ValidationError(format!(
            "phone must start with {}",
            prefix
        )));
    }
    Ok(())
}

pub fn validate_dni(dni: &str) -> CoreResult<()> {
    if dni.len() != DNI_LENGTH || !all_digits(dni) {
        return Err(CoreError::ValidationError(format!(
            "DNI must have exactly {} digits",
            DNI_LENGTH
        )));
    }
    Ok(())
}

/// Trims the value and rejects it when nothing is left.
pub fn require_field<'a>(field: &str, value: &'a str) -> CoreResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed)
}

pub fn validate_operation_code(code: &str) -> CoreResult<()> {
    let code = code.trim();
    if !all_digits(code) || code.len() > MAX_OPERATION_CODE_LENGTH {
        return Err(CoreError::ValidationError(
            "operation code must be a short numeric reference".to_string(),
        ));
    }
    Ok(())
}
