//! Field-level redaction of PII for display.

use std::sync::Arc;

use crate::fields::{normalize_field_key, FieldCache};

/// Rendered in place of absent or unresolved values.
pub const PLACEHOLDER: &str = "-";

const VISIBLE_SUFFIX: usize = 4;

/// Decides per field whether a value is shown or redacted.
///
/// Sensitivity comes only from the field cache, so nothing is masked until the
/// cache has loaded.
pub struct MaskingPolicy<S> {
    fields: Arc<FieldCache<S>>,
}

impl<S> Clone for MaskingPolicy<S> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
        }
    }
}

impl<S> MaskingPolicy<S> {
    pub fn new(fields: Arc<FieldCache<S>>) -> Self {
        Self { fields }
    }

    pub fn should_mask(&self, field_name: &str) -> bool {
        self.fields.is_field_sensitive(field_name)
    }

    /// Display form of `value`: masked when the field is sensitive.
    pub fn display(&self, field_name: &str, value: Option<&str>) -> String {
        if self.should_mask(field_name) {
            return mask(field_name, value);
        }
        match value {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => PLACEHOLDER.to_string(),
        }
    }
}

/// Redact `value`, keeping only its last four alphanumerics.
///
/// Aadhaar numbers render as `XXXX-XXXX-1234`. Everything else keeps its length
/// and separators, with earlier alphanumerics replaced by `*`.
pub fn mask(field_name: &str, value: Option<&str>) -> String {
    let value = match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => return PLACEHOLDER.to_string(),
    };

    if is_aadhaar_field(field_name) {
        let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
        if digits.len() >= VISIBLE_SUFFIX {
            let last_four: String = digits[digits.len() - VISIBLE_SUFFIX..].iter().collect();
            return format!("XXXX-XXXX-{last_four}");
        }
    }

    let mut kept = 0;
    let mut masked: Vec<char> = value
        .chars()
        .rev()
        .map(|c| {
            if !c.is_alphanumeric() {
                c
            } else if kept < VISIBLE_SUFFIX {
                kept += 1;
                c
            } else {
                '*'
            }
        })
        .collect();
    masked.reverse();
    masked.into_iter().collect()
}

fn is_aadhaar_field(field_name: &str) -> bool {
    matches!(normalize_field_key(field_name).as_str(), "aadhaar" | "aadhar")
}
