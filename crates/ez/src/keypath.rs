//! Dot-path resolution inside decrypted documents

use serde_yaml::Value;

/// Resolve a dot-delimited key path (e.g. `database.password`) by
/// sequential lookup through nested mappings. Returns `None` when any
/// segment is absent or the path descends into a non-mapping.
pub fn resolve<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        if !current.is_mapping() {
            return None;
        }
        current = current.get(segment)?;
    }
    Some(current)
}

/// Render a scalar value the way it would appear in the document:
/// strings raw, numbers and booleans via their YAML form, null empty.
/// `None` for mappings and sequences.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Value {
        serde_yaml::from_str(
            r#"
database:
  password: p1
  port: 5432
  nested:
    deep: value
api_key: top
flag: true
empty: null
hosts:
  - a
  - b
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_top_level() {
        let doc = doc();
        assert_eq!(resolve(&doc, "api_key").unwrap().as_str(), Some("top"));
    }

    #[test]
    fn test_resolve_nested() {
        let doc = doc();
        assert_eq!(
            resolve(&doc, "database.password").unwrap().as_str(),
            Some("p1")
        );
        assert_eq!(
            resolve(&doc, "database.nested.deep").unwrap().as_str(),
            Some("value")
        );
    }

    #[test]
    fn test_resolve_subtree() {
        let doc = doc();
        assert!(resolve(&doc, "database").unwrap().is_mapping());
    }

    #[test]
    fn test_resolve_absent() {
        let doc = doc();
        assert!(resolve(&doc, "missing").is_none());
        assert!(resolve(&doc, "database.missing").is_none());
        assert!(resolve(&doc, "database.password.deeper").is_none());
        assert!(resolve(&doc, "hosts.0").is_none());
    }

    #[test]
    fn test_scalar_to_string() {
        let doc = doc();
        assert_eq!(
            scalar_to_string(resolve(&doc, "database.password").unwrap()),
            Some("p1".to_string())
        );
        assert_eq!(
            scalar_to_string(resolve(&doc, "database.port").unwrap()),
            Some("5432".to_string())
        );
        assert_eq!(
            scalar_to_string(resolve(&doc, "flag").unwrap()),
            Some("true".to_string())
        );
        assert_eq!(
            scalar_to_string(resolve(&doc, "empty").unwrap()),
            Some(String::new())
        );
        assert_eq!(scalar_to_string(resolve(&doc, "database").unwrap()), None);
        assert_eq!(scalar_to_string(resolve(&doc, "hosts").unwrap()), None);
    }
}
