use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use super::domain::{
    CatalogItem, DocumentDefinition, DocumentMapping, EligibilityCriterion, FieldDefinition,
    FieldMapping, FieldOption, FieldType, Normalization, NormalizationRule, RequiredDocument,
    VcFieldSpec,
};
use super::IngestError;

pub const ELIGIBILITY_TAG: &str = "eligibility";
pub const REQUIRED_DOCS_TAG: &str = "required-docs";

/// Parse the field-definition list. Entries that fail to decode are skipped.
pub fn parse_field_definitions(raw: &str) -> Result<Vec<FieldDefinition>, IngestError> {
    let rows: Vec<WireFieldDefinition> = parse_entries(raw, "field definitions")?;
    Ok(rows.into_iter().map(FieldDefinition::from).collect())
}

/// Parse the `vcConfiguration` document list.
pub fn parse_document_definitions(raw: &str) -> Result<Vec<DocumentDefinition>, IngestError> {
    let rows: Vec<WireDocumentDefinition> = parse_entries(raw, "document definitions")?;
    Ok(rows.into_iter().map(DocumentDefinition::from).collect())
}

/// Parse the profile-to-document mapping list.
pub fn parse_field_mappings(raw: &str) -> Result<Vec<FieldMapping>, IngestError> {
    let rows: Vec<WireFieldMapping> = parse_entries(raw, "field mappings")?;
    Ok(rows.into_iter().map(FieldMapping::from).collect())
}

/// Parse a credential payload carried in `doc_data`.
pub fn parse_credential(raw: &str) -> Result<Value, IngestError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(IngestError::Shape {
            context: "credential payload",
            detail: "expected a JSON object".to_string(),
        }),
        Err(source) => Err(IngestError::Json {
            context: "credential payload",
            source,
        }),
    }
}

fn parse_json_text<T: DeserializeOwned>(
    raw: &str,
    context: &'static str,
) -> Result<T, IngestError> {
    serde_json::from_str(raw).map_err(|source| IngestError::Json { context, source })
}

fn parse_entries<T: DeserializeOwned>(
    raw: &str,
    context: &'static str,
) -> Result<Vec<T>, IngestError> {
    let values: Vec<Value> = parse_json_text(raw, context)?;
    let mut entries = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => entries.push(entry),
            Err(error) => warn!(context, index, %error, "skipping malformed configuration entry"),
        }
    }

    Ok(entries)
}

impl CatalogItem {
    /// Criteria from every `eligibility` tag, in declared order.
    pub fn eligibility_criteria(&self) -> Vec<Result<EligibilityCriterion, IngestError>> {
        self.tag_values(ELIGIBILITY_TAG)
            .map(|value| parse_json_text(value, "eligibility criterion"))
            .collect()
    }

    /// Documents from every `required-docs` tag, in declared order.
    pub fn required_documents(&self) -> Vec<Result<RequiredDocument, IngestError>> {
        self.tag_values(REQUIRED_DOCS_TAG)
            .map(|value| parse_json_text(value, "required document"))
            .collect()
    }

    fn tag_values<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |tag| tag.descriptor.code == code)
            .flat_map(|tag| tag.list.iter())
            .map(|entry| entry.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFieldDefinition {
    #[serde(deserialize_with = "deserialize_id")]
    field_id: String,
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    is_editable: bool,
    #[serde(default)]
    is_encrypted: bool,
    #[serde(default)]
    ordering: i32,
    #[serde(default)]
    field_params: Option<WireFieldParams>,
}

#[derive(Debug, Deserialize)]
struct WireFieldParams {
    #[serde(default)]
    options: Vec<WireFieldOption>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireFieldOption {
    Plain(String),
    Labeled {
        value: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl From<WireFieldOption> for FieldOption {
    fn from(option: WireFieldOption) -> Self {
        match option {
            WireFieldOption::Plain(value) => FieldOption {
                label: value.clone(),
                value,
            },
            WireFieldOption::Labeled { value, label } => FieldOption {
                label: label.unwrap_or_else(|| value.clone()),
                value,
            },
        }
    }
}

impl From<WireFieldDefinition> for FieldDefinition {
    fn from(row: WireFieldDefinition) -> Self {
        let options = row
            .field_params
            .map(|params| params.options.into_iter().map(FieldOption::from).collect())
            .unwrap_or_default();

        FieldDefinition {
            field_id: row.field_id,
            label: row.label.unwrap_or_else(|| row.name.clone()),
            name: row.name,
            field_type: row.field_type,
            is_required: row.is_required,
            is_editable: row.is_editable,
            is_encrypted: row.is_encrypted,
            ordering: row.ordering,
            options,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDocumentDefinition {
    name: String,
    #[serde(default)]
    label: Option<String>,
    document_sub_type: String,
    #[serde(default)]
    doc_type: String,
    #[serde(default)]
    vc_fields: Value,
}

impl From<WireDocumentDefinition> for DocumentDefinition {
    fn from(row: WireDocumentDefinition) -> Self {
        let vc_fields = match decode_embedded::<BTreeMap<String, VcFieldSpec>>(
            row.vc_fields,
            "vcFields",
        ) {
            Ok(fields) => fields.unwrap_or_default(),
            Err(error) => {
                warn!(document = %row.document_sub_type, %error, "ignoring malformed vcFields");
                BTreeMap::new()
            }
        };

        DocumentDefinition {
            label: row.label.unwrap_or_else(|| row.name.clone()),
            name: row.name,
            document_sub_type: row.document_sub_type,
            doc_type: row.doc_type,
            vc_fields,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFieldMapping {
    #[serde(default, deserialize_with = "deserialize_id")]
    field_id: String,
    field_name: String,
    #[serde(default)]
    field_type: Option<FieldType>,
    #[serde(default)]
    document_mappings: Vec<DocumentMapping>,
    #[serde(default)]
    field_value_normalization_mapping: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNormalizationRule {
    #[serde(default)]
    raw_value: Option<OneOrMany>,
    transformed_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(single) => vec![single],
            OneOrMany::Many(many) => many,
        }
    }
}

impl From<WireFieldMapping> for FieldMapping {
    fn from(row: WireFieldMapping) -> Self {
        let normalization = match decode_embedded::<Vec<WireNormalizationRule>>(
            row.field_value_normalization_mapping,
            "fieldValueNormalizationMapping",
        ) {
            Ok(Some(rules)) if !rules.is_empty() => Normalization::Table(
                rules
                    .into_iter()
                    .map(|rule| NormalizationRule {
                        raw_values: rule.raw_value.map(Vec::from).unwrap_or_default(),
                        transformed_value: rule.transformed_value,
                    })
                    .collect(),
            ),
            Ok(_) => Normalization::None,
            Err(error) => {
                warn!(field = %row.field_name, %error, "normalization table is malformed");
                Normalization::Malformed(error.to_string())
            }
        };

        FieldMapping {
            field_id: row.field_id,
            field_name: row.field_name,
            field_type: row.field_type,
            document_mappings: row.document_mappings,
            normalization,
        }
    }
}

/// Decode a value that upstream may send either inline or as JSON text.
fn decode_embedded<T: DeserializeOwned>(
    value: Value,
    context: &'static str,
) -> Result<Option<T>, IngestError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => parse_json_text(&text, context).map(Some),
        inline => serde_json::from_value(inline)
            .map(Some)
            .map_err(|source| IngestError::Json { context, source }),
    }
}

/// Accept identifiers sent as either strings or numbers.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

/// Keep credential payloads as JSON text whether they arrive encoded or inline.
pub(crate) fn deserialize_json_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        inline => Ok(inline.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{Descriptor, Tag, TagEntry};

    #[test]
    fn field_definitions_read_options_from_field_params() {
        let raw = r#"[
            {"fieldId": 7, "name": "gender", "label": "Gender", "type": "drop_down",
             "isRequired": true, "isEditable": true, "isEncrypted": false, "ordering": 2,
             "fieldParams": {"options": ["Male", {"value": "female", "label": "Female"}]}}
        ]"#;

        let fields = parse_field_definitions(raw).expect("definitions parse");

        assert_eq!(fields.len(), 1);
        let gender = &fields[0];
        assert_eq!(gender.field_id, "7");
        assert_eq!(gender.field_type, FieldType::DropDown);
        assert_eq!(gender.options.len(), 2);
        assert_eq!(gender.options[1].label, "Female");
    }

    #[test]
    fn malformed_entries_are_skipped_without_failing_siblings() {
        let raw = r#"[
            {"fieldId": "1", "name": "aadhaar", "type": "text", "isEncrypted": true},
            {"fieldId": "2", "name": "mystery", "type": "hologram"}
        ]"#;

        let fields = parse_field_definitions(raw).expect("list parses");

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "aadhaar");
        assert_eq!(fields[0].label, "aadhaar");
    }

    #[test]
    fn top_level_garbage_is_an_ingest_error() {
        let error = parse_field_definitions("{not json").expect_err("must fail");
        assert!(matches!(error, IngestError::Json { .. }));
    }

    #[test]
    fn vc_fields_string_is_decoded_and_bad_strings_degrade_to_empty() {
        let raw = r#"[
            {"name": "Income", "documentSubType": "incomeCertificate", "docType": "incomeProof",
             "vcFields": "{\"annualIncome\": {\"type\": \"number\"}}"},
            {"name": "Caste", "documentSubType": "casteCertificate", "docType": "socialProof",
             "vcFields": "{broken"}
        ]"#;

        let documents = parse_document_definitions(raw).expect("definitions parse");

        assert_eq!(documents.len(), 2);
        assert_eq!(
            documents[0].vc_fields["annualIncome"].field_type,
            "number".to_string()
        );
        assert!(documents[1].vc_fields.is_empty());
    }

    #[test]
    fn normalization_accepts_inline_string_and_malformed_forms() {
        let raw = r#"[
            {"fieldId": 1, "fieldName": "gender",
             "documentMappings": [{"document": "aadhaar", "documentField": "gender"}],
             "fieldValueNormalizationMapping": [{"rawValue": ["m", "male"], "transformedValue": "Male"}]},
            {"fieldId": 2, "fieldName": "caste",
             "documentMappings": [{"document": "casteCertificate", "documentField": "caste"}],
             "fieldValueNormalizationMapping": "[{\"rawValue\": \"sc\", \"transformedValue\": \"SC\"}]"},
            {"fieldId": 3, "fieldName": "religion",
             "documentMappings": [],
             "fieldValueNormalizationMapping": "[{oops"},
            {"fieldId": 4, "fieldName": "annualIncome",
             "documentMappings": [{"document": "incomeCertificate", "documentField": "annualIncome"}]}
        ]"#;

        let mappings = parse_field_mappings(raw).expect("mappings parse");

        match &mappings[0].normalization {
            Normalization::Table(rules) => assert_eq!(rules[0].raw_values, vec!["m", "male"]),
            other => panic!("expected table, got {other:?}"),
        }
        match &mappings[1].normalization {
            Normalization::Table(rules) => assert_eq!(rules[0].raw_values, vec!["sc"]),
            other => panic!("expected table, got {other:?}"),
        }
        assert!(matches!(mappings[2].normalization, Normalization::Malformed(_)));
        assert_eq!(mappings[3].normalization, Normalization::None);
    }

    #[test]
    fn catalog_tags_are_selected_by_code_and_parsed_per_entry() {
        let item = CatalogItem {
            id: "scholarship-1".to_string(),
            descriptor: Descriptor::default(),
            tags: vec![
                Tag {
                    descriptor: Descriptor {
                        code: ELIGIBILITY_TAG.to_string(),
                        name: String::new(),
                    },
                    list: vec![
                        TagEntry {
                            descriptor: None,
                            value: r#"{"evidenceFieldName": "age", "criteria": {"condition": "greater than equals", "conditionValues": 18}}"#.to_string(),
                        },
                        TagEntry {
                            descriptor: None,
                            value: "{nope".to_string(),
                        },
                    ],
                },
                Tag {
                    descriptor: Descriptor {
                        code: REQUIRED_DOCS_TAG.to_string(),
                        name: String::new(),
                    },
                    list: vec![TagEntry {
                        descriptor: None,
                        value: r#"{"documentType": "incomeProof", "allowedProofs": ["incomeCertificate"]}"#.to_string(),
                    }],
                },
                Tag {
                    descriptor: Descriptor {
                        code: "benefits".to_string(),
                        name: String::new(),
                    },
                    list: vec![TagEntry {
                        descriptor: None,
                        value: "ignored".to_string(),
                    }],
                },
            ],
        };

        let criteria = item.eligibility_criteria();
        assert_eq!(criteria.len(), 2);
        let age = criteria[0].as_ref().expect("first criterion parses");
        assert_eq!(age.criteria.condition_values.as_slice(), ["18".to_string()]);
        assert!(criteria[1].is_err());

        let documents = item.required_documents();
        assert_eq!(documents.len(), 1);
        let income = documents[0].as_ref().expect("document parses");
        assert!(income.is_required);
        assert_eq!(income.allowed_proofs, vec!["incomeCertificate"]);
    }

    #[test]
    fn credential_payload_must_be_an_object() {
        assert!(parse_credential(r#"{"validUntil": "2030-01-01"}"#).is_ok());
        assert!(matches!(
            parse_credential("[1, 2]"),
            Err(IngestError::Shape { .. })
        ));
        assert!(matches!(
            parse_credential("not json"),
            Err(IngestError::Json { .. })
        ));
    }
}
