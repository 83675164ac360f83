//! Resolves profile fields from the user's uploaded credentials.
//!
//! A [`FieldMapping`] lists candidate `(document subtype, field key)` sources.
//! Sources are tried in declared order and only the first subtype the user has
//! uploaded is consulted; values are never merged across documents. Anything
//! that prevents a value from being produced surfaces as
//! [`Resolution::Unresolved`] so callers can render a placeholder instead of a
//! misleading empty value.

mod extract;

pub(crate) use extract::scalar_to_string;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{parse_credential, DocumentDefinition, FieldMapping, UserDocument};
use crate::documents::find_document;
use crate::fields::normalize_field_key;

/// Why a field could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoMapping,
    DocumentNotUploaded,
    MalformedDocument,
    FieldMissing,
    MalformedNormalization,
}

/// Outcome of resolving one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(String),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn value(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Resolve one mapping against the user's uploads.
pub fn resolve_field(mapping: &FieldMapping, documents: &[UserDocument]) -> Resolution {
    if mapping.document_mappings.is_empty() {
        return Resolution::Unresolved(UnresolvedReason::NoMapping);
    }

    let Some((source, document)) = mapping.document_mappings.iter().find_map(|source| {
        find_document(documents, &source.document).map(|document| (source, document))
    }) else {
        return Resolution::Unresolved(UnresolvedReason::DocumentNotUploaded);
    };

    let payload = match parse_credential(&document.doc_data) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(
                field = %mapping.field_name,
                doc_id = %document.doc_id,
                %error,
                "credential payload could not be parsed"
            );
            return Resolution::Unresolved(UnresolvedReason::MalformedDocument);
        }
    };

    let Some(raw) = extract::lookup(&payload, &source.document_field).and_then(scalar_to_string)
    else {
        debug!(
            field = %mapping.field_name,
            document = %source.document,
            key = %source.document_field,
            "mapped key absent from credential"
        );
        return Resolution::Unresolved(UnresolvedReason::FieldMissing);
    };

    match mapping.normalization.apply(raw) {
        Some(value) => Resolution::Resolved(value),
        None => Resolution::Unresolved(UnresolvedReason::MalformedNormalization),
    }
}

/// A field name paired with its resolution, in mapping declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub field_name: String,
    pub resolution: Resolution,
}

/// Loaded profile-to-document mappings, addressable by normalized field name.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: Vec<FieldMapping>,
    by_key: HashMap<String, usize>,
}

impl MappingRegistry {
    /// Build the registry. When two mappings share a normalized name the
    /// first declared one wins.
    pub fn new(mappings: Vec<FieldMapping>) -> Self {
        let mut by_key = HashMap::with_capacity(mappings.len());
        for (position, mapping) in mappings.iter().enumerate() {
            by_key
                .entry(normalize_field_key(&mapping.field_name))
                .or_insert(position);
        }

        Self { mappings, by_key }
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldMapping> {
        self.by_key
            .get(&normalize_field_key(field_name))
            .map(|position| &self.mappings[*position])
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn resolve(&self, field_name: &str, documents: &[UserDocument]) -> Resolution {
        match self.get(field_name) {
            Some(mapping) => resolve_field(mapping, documents),
            None => Resolution::Unresolved(UnresolvedReason::NoMapping),
        }
    }

    /// Resolve every configured field, e.g. to prefill a profile form.
    pub fn resolve_profile(&self, documents: &[UserDocument]) -> Vec<ResolvedField> {
        self.mappings
            .iter()
            .map(|mapping| ResolvedField {
                field_name: mapping.field_name.clone(),
                resolution: resolve_field(mapping, documents),
            })
            .collect()
    }

    /// `(field name, subtype)` pairs whose subtype no loaded definition declares.
    pub fn dangling_references(
        &self,
        definitions: &[DocumentDefinition],
    ) -> Vec<(String, String)> {
        let known: HashSet<&str> = definitions
            .iter()
            .map(|definition| definition.document_sub_type.as_str())
            .collect();

        self.mappings
            .iter()
            .flat_map(|mapping| {
                mapping
                    .document_mappings
                    .iter()
                    .filter(|source| !known.contains(source.document.as_str()))
                    .map(|source| (mapping.field_name.clone(), source.document.clone()))
            })
            .collect()
    }
}
