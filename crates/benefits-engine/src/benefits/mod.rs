//! Per-benefit composition of field resolution, eligibility, document status
//! and masking.

mod router;

pub use router::{benefit_router, resolve_now, EvaluateRequest, UserRequest};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{
    CatalogItem, DocumentDefinition, FieldType, RequiredDocument, UserDocument, UserRecord,
};
use crate::documents::{document_status, find_document, DocumentAvailability, DocumentStatusView};
use crate::eligibility::{evaluate_criterion, CriterionOutcome};
use crate::fields::{normalize_field_key, FieldCache};
use crate::mapping::{scalar_to_string, MappingRegistry, Resolution, ResolvedField};
use crate::masking::MaskingPolicy;

/// Where a displayed or evaluated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Document,
    Profile,
    Missing,
}

/// One profile row as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub value: String,
    pub masked: bool,
    pub source: ValueSource,
}

/// Status of one document a benefit asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredDocumentOutcome {
    pub document_type: String,
    pub is_required: bool,
    pub allowed_proofs: Vec<String>,
    pub status: DocumentStatusView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenefitReport {
    pub benefit_id: String,
    pub benefit_name: String,
    /// Every criterion passed. A benefit without criteria is open to all.
    pub eligible: bool,
    /// Every required document is present and unexpired.
    pub documents_complete: bool,
    pub criteria: Vec<CriterionOutcome>,
    pub documents: Vec<RequiredDocumentOutcome>,
    /// `required-docs` entries that could not be decoded.
    pub skipped_documents: usize,
}

/// Composes the engine components for one session's configuration.
pub struct BenefitEngine<S> {
    fields: Arc<FieldCache<S>>,
    masking: MaskingPolicy<S>,
    mappings: MappingRegistry,
    documents: Vec<DocumentDefinition>,
}

impl<S> BenefitEngine<S> {
    pub fn new(
        fields: Arc<FieldCache<S>>,
        mappings: MappingRegistry,
        documents: Vec<DocumentDefinition>,
    ) -> Self {
        for (field, subtype) in mappings.dangling_references(&documents) {
            warn!(%field, %subtype, "mapping references an unknown document subtype");
        }

        Self {
            masking: MaskingPolicy::new(fields.clone()),
            fields,
            mappings,
            documents,
        }
    }

    pub fn fields(&self) -> &Arc<FieldCache<S>> {
        &self.fields
    }

    pub fn masking(&self) -> &MaskingPolicy<S> {
        &self.masking
    }

    pub fn mappings(&self) -> &MappingRegistry {
        &self.mappings
    }

    pub fn document_definitions(&self) -> &[DocumentDefinition] {
        &self.documents
    }

    /// Value used as a criterion operand: mapped document value first, then the
    /// user's stored profile value.
    pub fn resolve_operand(&self, field_name: &str, user: &UserRecord) -> Resolution {
        let mapped = self.mappings.resolve(field_name, &user.documents);
        if mapped.is_resolved() {
            return mapped;
        }

        match profile_value(user, field_name) {
            Some(value) => Resolution::Resolved(value),
            None => mapped,
        }
    }

    /// Resolve every mapped field for profile prefill.
    pub fn prefill(&self, user: &UserRecord) -> Vec<ResolvedField> {
        self.mappings.resolve_profile(&user.documents)
    }

    pub fn evaluate_benefit(
        &self,
        item: &CatalogItem,
        user: &UserRecord,
        now: DateTime<Utc>,
    ) -> BenefitReport {
        let criteria: Vec<CriterionOutcome> = item
            .eligibility_criteria()
            .into_iter()
            .map(|parsed| match parsed {
                Ok(criterion) => {
                    let operand = self.resolve_operand(&criterion.evidence_field_name, user);
                    evaluate_criterion(&criterion, operand)
                }
                Err(error) => {
                    warn!(benefit = %item.id, %error, "eligibility criterion is malformed");
                    CriterionOutcome::malformed(&error)
                }
            })
            .collect();

        let mut skipped_documents = 0;
        let documents: Vec<RequiredDocumentOutcome> = item
            .required_documents()
            .into_iter()
            .filter_map(|parsed| match parsed {
                Ok(required) => Some(self.required_document_outcome(required, user, now)),
                Err(error) => {
                    warn!(benefit = %item.id, %error, "required document entry is malformed");
                    skipped_documents += 1;
                    None
                }
            })
            .collect();

        let eligible = criteria.iter().all(|outcome| outcome.passed);
        let documents_complete = documents
            .iter()
            .filter(|outcome| outcome.is_required)
            .all(|outcome| outcome.status.availability == DocumentAvailability::Available);

        debug!(
            benefit = %item.id,
            eligible,
            documents_complete,
            criteria = criteria.len(),
            "benefit evaluated"
        );

        BenefitReport {
            benefit_id: item.id.clone(),
            benefit_name: item.descriptor.name.clone(),
            eligible,
            documents_complete,
            criteria,
            documents,
            skipped_documents,
        }
    }

    fn required_document_outcome(
        &self,
        required: RequiredDocument,
        user: &UserRecord,
        now: DateTime<Utc>,
    ) -> RequiredDocumentOutcome {
        let subtype = first_uploaded_proof(&required.allowed_proofs, &user.documents)
            .or_else(|| required.allowed_proofs.first().map(String::as_str))
            .unwrap_or(required.document_type.as_str())
            .to_string();
        let label = self.document_label(&subtype);
        let status = document_status(&user.documents, &subtype, &label, now);

        RequiredDocumentOutcome {
            document_type: required.document_type,
            is_required: required.is_required,
            allowed_proofs: required.allowed_proofs,
            status,
        }
    }

    fn document_label(&self, subtype: &str) -> String {
        self.documents
            .iter()
            .find(|definition| definition.document_sub_type == subtype)
            .map(|definition| definition.label.clone())
            .unwrap_or_else(|| subtype.to_string())
    }

    /// Status of every configured document type for this user.
    pub fn document_view(&self, user: &UserRecord, now: DateTime<Utc>) -> Vec<DocumentStatusView> {
        self.documents
            .iter()
            .map(|definition| {
                document_status(
                    &user.documents,
                    &definition.document_sub_type,
                    &definition.label,
                    now,
                )
            })
            .collect()
    }

    /// Every loaded field in display order, masked per policy. Empty while the
    /// field cache has not loaded.
    pub fn profile_view(&self, user: &UserRecord) -> Vec<DisplayField> {
        let index = self.fields.snapshot();

        index
            .fields()
            .iter()
            .map(|field| {
                let (value, source) = match profile_value(user, &field.name) {
                    Some(value) => (Some(value), ValueSource::Profile),
                    None => match self.mappings.resolve(&field.name, &user.documents) {
                        Resolution::Resolved(value) => (Some(value), ValueSource::Document),
                        Resolution::Unresolved(_) => (None, ValueSource::Missing),
                    },
                };
                let masked = self.masking.should_mask(&field.name);

                DisplayField {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    field_type: field.field_type,
                    value: self.masking.display(&field.name, value.as_deref()),
                    masked,
                    source,
                }
            })
            .collect()
    }
}

fn first_uploaded_proof<'a>(proofs: &'a [String], documents: &[UserDocument]) -> Option<&'a str> {
    proofs
        .iter()
        .find(|proof| find_document(documents, proof).is_some())
        .map(String::as_str)
}

/// Stored profile value under `field_name`, matched exactly or by normalized key.
fn profile_value(user: &UserRecord, field_name: &str) -> Option<String> {
    let value = user.profile.get(field_name).or_else(|| {
        let wanted = normalize_field_key(field_name);
        user.profile
            .iter()
            .find(|(name, _)| normalize_field_key(name) == wanted)
            .map(|(_, value)| value)
    })?;

    scalar_to_string(value).filter(|text| !text.is_empty())
}
