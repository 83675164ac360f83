mod condition;
mod rules;

pub use condition::Condition;
pub use rules::{evaluate, evaluate_condition};

use serde::Serialize;

use crate::catalog::{EligibilityCriterion, IngestError};
use crate::mapping::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    /// The operand could not be resolved from profile or documents.
    Unresolved,
    UnrecognizedCondition,
    /// The criterion itself could not be decoded.
    Malformed,
}

/// Audit record for one evaluated criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionOutcome {
    pub field: String,
    pub description: String,
    pub condition: String,
    pub condition_values: Vec<String>,
    pub allowed_proofs: Vec<String>,
    pub operand: Option<Resolution>,
    pub passed: bool,
    pub verdict: Verdict,
}

impl CriterionOutcome {
    /// Outcome for a catalog entry that failed to decode.
    pub fn malformed(error: &IngestError) -> Self {
        Self {
            field: String::new(),
            description: error.to_string(),
            condition: String::new(),
            condition_values: Vec::new(),
            allowed_proofs: Vec::new(),
            operand: None,
            passed: false,
            verdict: Verdict::Malformed,
        }
    }
}

/// Evaluate `criterion` against an already-resolved operand.
pub fn evaluate_criterion(
    criterion: &EligibilityCriterion,
    operand: Resolution,
) -> CriterionOutcome {
    let rule = &criterion.criteria;
    let condition = Condition::parse(&rule.condition);

    let (passed, verdict) = match (condition, operand.value()) {
        (None, _) => (false, Verdict::UnrecognizedCondition),
        (Some(_), None) => (false, Verdict::Unresolved),
        (Some(condition), Some(value)) => {
            if evaluate_condition(Some(value), condition, rule.condition_values.as_slice()) {
                (true, Verdict::Passed)
            } else {
                (false, Verdict::Failed)
            }
        }
    };

    CriterionOutcome {
        field: criterion.evidence_field_name.clone(),
        description: criterion.description.clone(),
        condition: condition
            .map(|condition| condition.label().to_string())
            .unwrap_or_else(|| rule.condition.clone()),
        condition_values: rule.condition_values.as_slice().to_vec(),
        allowed_proofs: criterion.allowed_proofs.clone(),
        operand: Some(operand),
        passed,
        verdict,
    }
}
