//! Presence, verification and expiry of a user's uploaded credentials.
//!
//! Lookups match `doc_subtype` exactly and the earliest entry in list order
//! wins; later uploads of the same subtype are shadowed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::catalog::{parse_credential, IngestError, UserDocument};

/// Earliest upload of `subtype`, if any.
pub fn find_document<'a>(
    documents: &'a [UserDocument],
    subtype: &str,
) -> Option<&'a UserDocument> {
    documents
        .iter()
        .find(|document| document.doc_subtype == subtype)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMatch {
    pub match_found: bool,
    pub verified: bool,
    pub doc_id: Option<String>,
    pub data: Option<String>,
    pub name: Option<String>,
}

pub fn find_status(documents: &[UserDocument], subtype: &str) -> DocumentMatch {
    match find_document(documents, subtype) {
        Some(document) => DocumentMatch {
            match_found: true,
            verified: document.doc_verified,
            doc_id: Some(document.doc_id.clone()),
            data: Some(document.doc_data.clone()),
            name: Some(document.doc_name.clone()),
        },
        None => DocumentMatch::default(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentExpiry {
    pub valid_until: DateTime<Utc>,
    /// `DD/MM/YYYY` taken from the UTC calendar date.
    pub expiry_date_display: String,
    pub is_expired: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExpiryError {
    #[error("no uploaded document of subtype {0}")]
    NotUploaded(String),
    #[error(transparent)]
    MalformedPayload(#[from] IngestError),
    #[error("credential carries no validUntil")]
    MissingValidUntil,
    #[error("validUntil {0:?} is not a recognised timestamp")]
    InvalidValidUntil(String),
}

/// Read `validUntil` from the matching credential and compare it to `now`.
pub fn resolve_expiry(
    documents: &[UserDocument],
    subtype: &str,
    now: DateTime<Utc>,
) -> Result<DocumentExpiry, ExpiryError> {
    let document = find_document(documents, subtype)
        .ok_or_else(|| ExpiryError::NotUploaded(subtype.to_string()))?;
    let payload = parse_credential(&document.doc_data)?;

    let raw = match payload.get("validUntil") {
        Some(Value::String(raw)) if !raw.trim().is_empty() => raw,
        _ => return Err(ExpiryError::MissingValidUntil),
    };
    let valid_until =
        parse_timestamp(raw).ok_or_else(|| ExpiryError::InvalidValidUntil(raw.clone()))?;

    Ok(DocumentExpiry {
        valid_until,
        expiry_date_display: valid_until.format("%d/%m/%Y").to_string(),
        is_expired: valid_until < now,
    })
}

/// Accepts RFC 3339, zone-less date-times (read as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Three-state status shown next to each required document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAvailability {
    Available,
    Expired,
    Incomplete,
}

impl DocumentAvailability {
    pub fn from_parts(match_found: bool, is_expired: bool) -> Self {
        match (match_found, is_expired) {
            (true, false) => DocumentAvailability::Available,
            (true, true) => DocumentAvailability::Expired,
            (false, _) => DocumentAvailability::Incomplete,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentAvailability::Available => "available",
            DocumentAvailability::Expired => "expired",
            DocumentAvailability::Incomplete => "incomplete",
        }
    }
}

/// Combined presence and expiry view for one subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStatusView {
    pub subtype: String,
    pub label: String,
    pub availability: DocumentAvailability,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_name: Option<String>,
    /// Absent whenever expiry could not be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date_display: Option<String>,
}

pub fn document_status(
    documents: &[UserDocument],
    subtype: &str,
    label: &str,
    now: DateTime<Utc>,
) -> DocumentStatusView {
    let found = find_status(documents, subtype);
    let expiry = if found.match_found {
        match resolve_expiry(documents, subtype, now) {
            Ok(expiry) => Some(expiry),
            Err(error) => {
                debug!(subtype, %error, "expiry not available");
                None
            }
        }
    } else {
        None
    };
    let is_expired = expiry.as_ref().map(|e| e.is_expired).unwrap_or(false);

    DocumentStatusView {
        subtype: subtype.to_string(),
        label: label.to_string(),
        availability: DocumentAvailability::from_parts(found.match_found, is_expired),
        verified: found.verified,
        doc_id: found.doc_id,
        doc_name: found.name,
        expiry_date_display: expiry.map(|e| e.expiry_date_display),
    }
}
