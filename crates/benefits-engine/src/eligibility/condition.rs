use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Comparison a criterion applies between a resolved value and its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equals,
    In,
    NotIn,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
}

static CONDITION_SPELLINGS: OnceLock<HashMap<String, Condition>> = OnceLock::new();

impl Condition {
    /// Resolve any accepted spelling. Unknown spellings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        spelling_table().get(&canonical_spelling(raw)).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::In => "in",
            Condition::NotIn => "notIn",
            Condition::LessThan => "lessThan",
            Condition::LessThanOrEquals => "lessThanOrEquals",
            Condition::GreaterThan => "greaterThan",
            Condition::GreaterThanOrEquals => "greaterThanOrEquals",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Condition::LessThan
                | Condition::LessThanOrEquals
                | Condition::GreaterThan
                | Condition::GreaterThanOrEquals
        )
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn canonical_spelling(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn spelling_table() -> &'static HashMap<String, Condition> {
    CONDITION_SPELLINGS.get_or_init(|| {
        // Catalog data is authored by hand, so several spellings circulate.
        const SPELLINGS: &[(&str, Condition)] = &[
            ("equals", Condition::Equals),
            ("in", Condition::In),
            ("notIn", Condition::NotIn),
            ("not in", Condition::NotIn),
            ("lessThan", Condition::LessThan),
            ("less than", Condition::LessThan),
            ("lessThanOrEquals", Condition::LessThanOrEquals),
            ("less than equals", Condition::LessThanOrEquals),
            ("less than or equals", Condition::LessThanOrEquals),
            ("greaterThan", Condition::GreaterThan),
            ("greater than", Condition::GreaterThan),
            ("greaterThanOrEquals", Condition::GreaterThanOrEquals),
            ("greater than equals", Condition::GreaterThanOrEquals),
            ("greater than or equals", Condition::GreaterThanOrEquals),
        ];

        let mut table = HashMap::with_capacity(SPELLINGS.len());
        for (spelling, condition) in SPELLINGS {
            table.insert(canonical_spelling(spelling), *condition);
        }
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_documented_spelling_resolves() {
        let cases = [
            ("equals", Condition::Equals),
            ("in", Condition::In),
            ("notIn", Condition::NotIn),
            ("not in", Condition::NotIn),
            ("lessThan", Condition::LessThan),
            ("less than", Condition::LessThan),
            ("lessThanOrEquals", Condition::LessThanOrEquals),
            ("less than equals", Condition::LessThanOrEquals),
            ("less than or equals", Condition::LessThanOrEquals),
            ("greaterThan", Condition::GreaterThan),
            ("greater than", Condition::GreaterThan),
            ("greaterThanOrEquals", Condition::GreaterThanOrEquals),
            ("greater than equals", Condition::GreaterThanOrEquals),
            ("greater than or equals", Condition::GreaterThanOrEquals),
        ];

        for (spelling, expected) in cases {
            assert_eq!(Condition::parse(spelling), Some(expected), "{spelling}");
        }
    }

    #[test]
    fn spelling_ignores_case_and_spacing() {
        assert_eq!(
            Condition::parse("  Greater   Than  Equals "),
            Some(Condition::GreaterThanOrEquals)
        );
        assert_eq!(Condition::parse("LESSTHAN"), Some(Condition::LessThan));
    }

    #[test]
    fn unknown_spellings_are_rejected() {
        assert_eq!(Condition::parse("between"), None);
        assert_eq!(Condition::parse(""), None);
        assert_eq!(Condition::parse("greater_than"), None);
    }
}
