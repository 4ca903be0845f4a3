//! Records mirrored from the hosted backend's tables.
//!
//! Read models (`Store`, `Product`, ...) deserialize directly from the
//! backend's JSON rows. Write models (`*Draft`) carry only the columns a
//! seller can edit and validate form input before it is sent. Integrity rules
//! such as uniqueness and foreign keys stay with the backend.

pub mod alert;
pub mod product;
pub mod store;
pub mod template;

pub use alert::SystemAlert;
pub use product::{Product, ProductDraft};
pub use store::{Store, StoreDraft};
pub use template::{RenderContext, Template, TemplateDraft};

use thiserror::Error;

/// Form-level validation failures for drafts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was blank.
    #[error("{0} is required")]
    Required(&'static str),

    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field label.
        field: &'static str,
        /// Maximum allowed characters.
        max: usize,
    },

    /// A numeric field was outside its allowed range.
    #[error("{field} {message}")]
    OutOfRange {
        /// Field label.
        field: &'static str,
        /// What the allowed range is.
        message: &'static str,
    },

    /// A field did not match the expected format.
    #[error("{field} {message}")]
    InvalidFormat {
        /// Field label.
        field: &'static str,
        /// What the expected format is.
        message: &'static str,
    },
}

/// Require a non-blank value no longer than `max` characters.
pub(crate) fn require_text(
    value: &str,
    field: &'static str,
    max: usize,
) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Case-insensitive substring test; `needle` must already be lowercase.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Trim a string, mapping blank input to `None`.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
