//! Request body checks run before anything reaches the core.

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_FULL_NAME_LEN: usize = 2;
pub const MIN_STUDENT_ID_LEN: usize = 3;

/// Accepts `local@domain.tld`: exactly one `@`, no whitespace, and a dot
/// inside the domain that is neither its first nor last character.
pub fn email(value: &str) -> Result<(), ApiError> {
  let invalid = || ApiError::BadRequest("email must be a valid email address".into());

  if value.chars().any(char::is_whitespace) {
    return Err(invalid());
  }
  let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
  if local.is_empty() || domain.contains('@') {
    return Err(invalid());
  }
  match domain.find('.') {
    Some(i) if i > 0 && !domain.ends_with('.') => Ok(()),
    _ => Err(invalid()),
  }
}

/// `value` must have at least `min` characters once surrounding whitespace
/// is ignored.
pub fn min_len(field: &str, value: &str, min: usize) -> Result<(), ApiError> {
  if value.trim().chars().count() < min {
    return Err(ApiError::BadRequest(format!(
      "{field} must be at least {min} characters"
    )));
  }
  Ok(())
}

pub fn non_empty(field: &str, value: &str) -> Result<(), ApiError> {
  min_len(field, value, 1)
}
