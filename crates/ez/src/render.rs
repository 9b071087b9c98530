//! Output rendering for decrypted documents
//!
//! The document is decrypted once by SOPS; every view (env lines, YAML,
//! JSON, single key) is derived locally from the same plaintext, so the
//! formats always agree with each other.

use std::fmt;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde_yaml::Value;

use crate::keypath;
use crate::secrets::SecretsError;

/// Output format for `secrets decrypt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// KEY=value lines, nested keys joined with `_` and uppercased
    Env,
    /// Decrypted document verbatim
    Yaml,
    /// Document transcoded to pretty JSON
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Env => write!(f, "env"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render the decrypted document for output. A key path, when given, wins
/// over the format: scalars print raw, subtrees as YAML (JSON under
/// `--format json`).
pub fn render(plaintext: &str, format: OutputFormat, key: Option<&str>) -> Result<String> {
    if key.is_none() && format == OutputFormat::Yaml {
        return Ok(plaintext.to_string());
    }

    let doc: Value =
        serde_yaml::from_str(plaintext).context("decrypted document is not valid YAML")?;

    if let Some(path) = key {
        let value = match keypath::resolve(&doc, path) {
            Some(value) => value,
            None => bail!(SecretsError::KeyPathNotFound(path.to_string())),
        };

        return match keypath::scalar_to_string(value) {
            Some(scalar) => Ok(scalar),
            None if format == OutputFormat::Json => {
                Ok(serde_json::to_string_pretty(&yaml_to_json(value))?)
            }
            None => Ok(serde_yaml::to_string(value)?),
        };
    }

    match format {
        OutputFormat::Env => env_lines(&doc),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&yaml_to_json(&doc))?),
        OutputFormat::Yaml => unreachable!("handled above"),
    }
}

/// Flatten the document into KEY=value lines: nested mapping keys are
/// joined with `_` and uppercased, e.g. `database.password` becomes
/// `DATABASE_PASSWORD`.
fn env_lines(doc: &Value) -> Result<String> {
    if !doc.is_mapping() {
        bail!("env format requires a YAML mapping at the top level");
    }

    let mut lines = Vec::new();
    flatten_into(&mut lines, "", doc);
    Ok(lines.join("\n"))
}

fn flatten_into(lines: &mut Vec<String>, prefix: &str, value: &Value) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = key_to_string(key);
                let next = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}_{key}")
                };
                flatten_into(lines, &next, child);
            }
        }
        leaf => {
            lines.push(format!("{}={}", prefix.to_uppercase(), leaf_to_string(leaf)));
        }
    }
}

fn leaf_to_string(value: &Value) -> String {
    match keypath::scalar_to_string(value) {
        Some(scalar) => scalar,
        // Sequences and other non-scalars render as inline JSON
        None => serde_json::to_string(&yaml_to_json(value)).unwrap_or_default(),
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

/// Transcode a YAML value to JSON. Mapping keys are stringified; floats
/// that JSON cannot represent (NaN, infinities) become null.
pub fn yaml_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(seq) => serde_json::Value::Array(seq.iter().map(yaml_to_json).collect()),
        Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (key, child) in map {
                object.insert(key_to_string(key), yaml_to_json(child));
            }
            serde_json::Value::Object(object)
        }
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
database:
  password: p1
  port: 5432
api:
  key: k
  secret: s
flag: true
hosts:
  - a
  - b
"#;

    #[test]
    fn test_env_example() {
        let out = render("database:\n  password: \"p1\"\n", OutputFormat::Env, None).unwrap();
        assert_eq!(out, "DATABASE_PASSWORD=p1");
    }

    #[test]
    fn test_env_flattening() {
        let out = render(DOC, OutputFormat::Env, None).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "DATABASE_PASSWORD=p1",
                "DATABASE_PORT=5432",
                "API_KEY=k",
                "API_SECRET=s",
                "FLAG=true",
                "HOSTS=[\"a\",\"b\"]",
            ]
        );
    }

    #[test]
    fn test_env_requires_mapping() {
        assert!(render("just a string\n", OutputFormat::Env, None).is_err());
    }

    #[test]
    fn test_yaml_passthrough() {
        let out = render(DOC, OutputFormat::Yaml, None).unwrap();
        assert_eq!(out, DOC);
    }

    #[test]
    fn test_json_structurally_equals_yaml() {
        let json_out = render(DOC, OutputFormat::Json, None).unwrap();
        let yaml_out = render(DOC, OutputFormat::Yaml, None).unwrap();

        let from_json: serde_json::Value = serde_json::from_str(&json_out).unwrap();
        let from_yaml: serde_yaml::Value = serde_yaml::from_str(&yaml_out).unwrap();

        assert_eq!(from_json, yaml_to_json(&from_yaml));
    }

    #[test]
    fn test_key_scalar_prints_raw() {
        let out = render(DOC, OutputFormat::Env, Some("database.password")).unwrap();
        assert_eq!(out, "p1");

        // key wins over format
        let out = render(DOC, OutputFormat::Json, Some("database.port")).unwrap();
        assert_eq!(out, "5432");
    }

    #[test]
    fn test_key_subtree_renders_yaml() {
        let out = render(DOC, OutputFormat::Env, Some("database")).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(value.get("password").unwrap().as_str(), Some("p1"));
    }

    #[test]
    fn test_key_subtree_renders_json_when_asked() {
        let out = render(DOC, OutputFormat::Json, Some("api")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["key"], "k");
        assert_eq!(value["secret"], "s");
    }

    #[test]
    fn test_key_not_found() {
        let err = render(DOC, OutputFormat::Env, Some("database.missing")).unwrap_err();
        assert!(err.to_string().contains("database.missing"));
    }

    #[test]
    fn test_yaml_to_json_numbers_and_nulls() {
        let doc: Value = serde_yaml::from_str("a: 1\nb: 1.5\nc: null\nd: -3\n").unwrap();
        let json = yaml_to_json(&doc);
        assert_eq!(json["a"], 1);
        assert_eq!(json["b"], 1.5);
        assert_eq!(json["c"], serde_json::Value::Null);
        assert_eq!(json["d"], -3);
    }

    #[test]
    fn test_yaml_to_json_non_string_keys() {
        let doc: Value = serde_yaml::from_str("1: one\ntrue: yes\n").unwrap();
        let json = yaml_to_json(&doc);
        assert_eq!(json["1"], "one");
        assert_eq!(json["true"], "yes");
    }
}
