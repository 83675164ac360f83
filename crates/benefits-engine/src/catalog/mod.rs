//! Typed ingestion of the configuration and catalog shapes the engine consumes.
//!
//! Upstream services embed JSON inside JSON in several places (`vcFields`,
//! normalization tables, catalog tag values, credential payloads). Every one of
//! those decode steps returns an explicit [`IngestError`] so a single bad entry
//! only degrades the field it belongs to.

pub mod domain;
pub mod parser;

pub use domain::{
    CatalogItem, ConditionValues, CriterionRule, Descriptor, DocumentDefinition, DocumentMapping,
    EligibilityCriterion, FieldDefinition, FieldMapping, FieldOption, FieldType, Normalization,
    NormalizationRule, RequiredDocument, Tag, TagEntry, UserDocument, UserRecord, VcFieldSpec,
};
pub use parser::{
    parse_credential, parse_document_definitions, parse_field_definitions, parse_field_mappings,
    ELIGIBILITY_TAG, REQUIRED_DOCS_TAG,
};

/// Failure to decode an externally supplied JSON value.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed {context} JSON: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected {context} shape: {detail}")]
    Shape {
        context: &'static str,
        detail: String,
    },
}
