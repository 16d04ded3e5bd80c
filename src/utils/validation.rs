//! Shared validation utilities.
//!
//! Custom validator functions and helpers used by the request models. All
//! checks are pure; the request structs wire them up through the
//! `validator` derive.

use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

lazy_static! {
    /// Identifier charset for users: letters, digits, `-`, `_`.
    pub static ref USER_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,100}$").unwrap();
}

/// Accepted values for the opaque event `status` field. The engine never
/// interprets these beyond membership.
pub const EVENT_STATUSES: [&str; 5] = ["draft", "published", "cancelled", "completed", "active"];

/// Rejects strings that are empty or all-whitespace after trimming.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Membership check against [`EVENT_STATUSES`].
pub fn valid_event_status(value: &str) -> Result<(), ValidationError> {
    if EVENT_STATUSES.contains(&value) {
        return Ok(());
    }
    let mut err = ValidationError::new("event_status");
    err.message = Some(
        format!(
            "status must be one of: {}",
            EVENT_STATUSES.join(", ")
        )
        .into(),
    );
    Err(err)
}

/// Build a single-field `ValidationErrors` for manual rejections (for
/// example a patch touching an engine-owned field).
#[must_use]
pub fn single_field_error(field: &'static str, message: &str) -> ValidationErrors {
    let mut err = ValidationError::new("forbidden");
    err.message = Some(message.to_string().into());
    let mut errors = ValidationErrors::new();
    errors.add(field, err);
    errors
}

/// Convert a Rust snake_case field name to the camelCase name used on the
/// wire, so validation details reference the field as the client sent it.
#[must_use]
pub fn camelize(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
