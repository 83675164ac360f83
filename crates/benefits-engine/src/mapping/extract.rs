use serde_json::Value;

/// Find `key` inside a credential payload.
///
/// `credentialSubject` is searched before the payload root. A key that does not
/// exist verbatim is retried as a dotted path through nested objects.
pub(crate) fn lookup<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    let subject_hit = match payload.get("credentialSubject") {
        Some(Value::Array(subjects)) => subjects
            .iter()
            .find_map(|subject| lookup_in(subject, key)),
        Some(subject) => lookup_in(subject, key),
        None => None,
    };

    subject_hit.or_else(|| lookup_in(payload, key))
}

fn lookup_in<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(found) = node.get(key) {
        return Some(found);
    }
    if !key.contains('.') {
        return None;
    }

    key.split('.')
        .try_fold(node, |current, segment| current.get(segment))
}

/// Render a JSON scalar the way it is displayed. Containers and null yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_fields_shadow_root_fields() {
        let payload = json!({
            "name": "Income Certificate",
            "credentialSubject": {"name": "Asha", "annualIncome": 120000}
        });

        assert_eq!(lookup(&payload, "name"), Some(&json!("Asha")));
        assert_eq!(lookup(&payload, "annualIncome"), Some(&json!(120000)));
    }

    #[test]
    fn falls_back_to_root_and_walks_dotted_paths() {
        let payload = json!({
            "issuer": "did:web:issuer",
            "credentialSubject": [{"address": {"district": "Pune"}}]
        });

        assert_eq!(lookup(&payload, "issuer"), Some(&json!("did:web:issuer")));
        assert_eq!(lookup(&payload, "address.district"), Some(&json!("Pune")));
        assert_eq!(lookup(&payload, "address.state"), None);
    }

    #[test]
    fn scalars_render_and_containers_do_not() {
        assert_eq!(scalar_to_string(&json!(42)), Some("42".to_string()));
        assert_eq!(scalar_to_string(&json!(true)), Some("true".to_string()));
        assert_eq!(scalar_to_string(&json!(null)), None);
        assert_eq!(scalar_to_string(&json!({"a": 1})), None);
    }
}
