use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input control a profile field is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Numeric,
    Date,
    Boolean,
    DropDown,
}

/// Selectable value for `drop_down` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// Admin-configured profile field, annotated with its PII flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub field_id: String,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub is_required: bool,
    pub is_editable: bool,
    pub is_encrypted: bool,
    pub ordering: i32,
    pub options: Vec<FieldOption>,
}

/// Declared type of one credential field in a document schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcFieldSpec {
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// Schema of one credential document type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDefinition {
    pub name: String,
    pub label: String,
    pub document_sub_type: String,
    pub doc_type: String,
    pub vc_fields: BTreeMap<String, VcFieldSpec>,
}

/// One candidate source for a profile field: a key inside a document subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMapping {
    pub document: String,
    pub document_field: String,
}

/// Raw spellings that collapse onto one canonical display value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationRule {
    pub raw_values: Vec<String>,
    pub transformed_value: String,
}

impl NormalizationRule {
    pub(crate) fn matches(&self, raw: &str) -> bool {
        let raw = raw.trim();
        self.raw_values
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(raw))
    }
}

/// Value normalization configured on a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Normalization {
    None,
    Table(Vec<NormalizationRule>),
    /// The configured table could not be parsed; carries the parse error.
    Malformed(String),
}

impl Normalization {
    /// Substitute `raw` through the table. Unmatched values pass through.
    pub fn apply(&self, raw: String) -> Option<String> {
        match self {
            Normalization::None => Some(raw),
            Normalization::Table(rules) => Some(
                rules
                    .iter()
                    .find(|rule| rule.matches(&raw))
                    .map(|rule| rule.transformed_value.clone())
                    .unwrap_or(raw),
            ),
            Normalization::Malformed(_) => None,
        }
    }
}

/// Binds one profile field to ordered document-field sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub field_id: String,
    pub field_name: String,
    pub field_type: Option<FieldType>,
    pub document_mappings: Vec<DocumentMapping>,
    pub normalization: Normalization,
}

/// Comparison operands, always held lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct ConditionValues(Vec<String>);

impl ConditionValues {
    pub fn new<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self(
            values
                .into_iter()
                .map(|value| value.as_ref().to_lowercase())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for ConditionValues {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::Array(items) => Self(items.iter().filter_map(scalar_text).collect()),
            other => Self(scalar_text(&other).into_iter().collect()),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.to_lowercase()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// The comparison half of a criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub condition_values: ConditionValues,
}

/// Benefit-specific rule evaluated against a resolved profile value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityCriterion {
    pub evidence_field_name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allowed_proofs: Vec<String>,
    pub criteria: CriterionRule,
}

/// Document a benefit asks for, satisfied by any allowed proof subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDocument {
    #[serde(default)]
    pub document_type: String,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub allowed_proofs: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Credential record uploaded by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(deserialize_with = "super::parser::deserialize_id")]
    pub doc_id: String,
    pub doc_subtype: String,
    #[serde(default)]
    pub doc_type: String,
    #[serde(default)]
    pub doc_name: String,
    /// Credential payload as JSON text.
    #[serde(default, deserialize_with = "super::parser::deserialize_json_text")]
    pub doc_data: String,
    #[serde(default)]
    pub doc_verified: bool,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// Stored profile plus uploads for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub profile: BTreeMap<String, Value>,
    #[serde(default)]
    pub documents: Vec<UserDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    #[serde(default)]
    pub descriptor: Option<Descriptor>,
    /// JSON text; parsed on demand.
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub descriptor: Descriptor,
    #[serde(default)]
    pub list: Vec<TagEntry>,
}

/// Benefit as published by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(deserialize_with = "super::parser::deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub descriptor: Descriptor,
    #[serde(default)]
    pub tags: Vec<Tag>,
}
