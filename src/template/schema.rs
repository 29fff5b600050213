//! Typed field metadata and validation of incoming field values.

use crate::{error::Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Field name to the text substituted for it.
pub type FieldValues = BTreeMap<String, String>;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Date,
    Number,
}

/// Metadata for one placeholder of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: String,
}

impl FieldSpec {
    /// An optional text field labelled with its own name.
    pub fn text(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind: FieldKind::Text,
            required: false,
            default_value: String::new(),
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self.kind {
            FieldKind::Text => true,
            FieldKind::Number => number_pattern().is_match(value),
            FieldKind::Date => DATE_FORMATS
                .iter()
                .any(|format| NaiveDate::parse_from_str(value, format).is_ok()),
        }
    }
}

/// How [`resolve`] treats values that do not fit the schema.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FieldPolicy {
    /// Fill what can be filled and report the rest as warnings.
    #[default]
    Lenient,
    /// Reject unknown keys, blank required fields and kind mismatches.
    Strict,
}

/// Values ready for substitution plus non-fatal findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub values: FieldValues,
    pub warnings: Vec<String>,
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+(?:[.,]\d+)?$").expect("valid number pattern"))
}

/// Converts a JSON object into field values.
///
/// `null` and `false` become empty text, numbers and `true` their textual
/// form. Nested arrays and objects are rejected.
pub fn values_from_json(json: &serde_json::Value) -> Result<FieldValues> {
    let object = json
        .as_object()
        .ok_or_else(|| Error::FieldValidation("field values must be a JSON object".to_string()))?;

    let mut values = FieldValues::new();
    for (name, value) in object {
        let text = match value {
            serde_json::Value::Null | serde_json::Value::Bool(false) => String::new(),
            serde_json::Value::Bool(true) => "true".to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(Error::FieldValidation(format!(
                    "field '{}' must be a string, number, boolean or null",
                    name
                )));
            }
        };
        values.insert(name.clone(), text);
    }
    Ok(values)
}

/// Resolves caller values against the template's fields.
///
/// An absent or empty value falls back to the field's default. Under
/// `Lenient` any other value is kept as given, whitespace included; under
/// `Strict` values are trimmed first, so a blank value counts as empty.
pub fn resolve(specs: &[FieldSpec], values: &FieldValues, policy: FieldPolicy) -> Result<Resolution> {
    let strict = policy == FieldPolicy::Strict;
    let mut problems = Vec::new();
    let mut resolved = FieldValues::new();

    for name in values.keys() {
        if !specs.iter().any(|spec| &spec.name == name) {
            problems.push(format!("unknown field '{}'", name));
        }
    }

    for spec in specs {
        let provided = values.get(&spec.name).map(|v| if strict { v.trim() } else { v.as_str() });
        let value = match provided {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => spec.default_value.clone(),
        };

        if value.trim().is_empty() {
            if spec.required {
                problems.push(format!("required field '{}' is empty", spec.name));
            }
        } else if !spec.accepts(value.trim()) {
            problems.push(format!(
                "field '{}' expects a {} value, got '{}'",
                spec.name,
                kind_name(spec.kind),
                value
            ));
        }

        resolved.insert(spec.name.clone(), value);
    }

    if strict && !problems.is_empty() {
        return Err(Error::FieldValidation(problems.join("; ")));
    }

    for problem in &problems {
        log::warn!("{}", problem);
    }
    Ok(Resolution {
        values: resolved,
        warnings: problems,
    })
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Date => "date",
        FieldKind::Number => "number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn specs() -> Vec<FieldSpec> {
        vec![
            FieldSpec {
                required: true,
                ..FieldSpec::text("student")
            },
            FieldSpec {
                kind: FieldKind::Date,
                ..FieldSpec::text("date")
            },
            FieldSpec {
                kind: FieldKind::Number,
                default_value: "0".to_string(),
                ..FieldSpec::text("grade")
            },
        ]
    }

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_json_scalars_become_text() {
        let parsed = values_from_json(&json!({
            "a": null, "b": false, "c": true, "d": 7.5, "e": "x"
        }))
        .unwrap();
        assert_eq!(
            parsed,
            values(&[("a", ""), ("b", ""), ("c", "true"), ("d", "7.5"), ("e", "x")])
        );
        assert!(values_from_json(&json!({"a": [1]})).is_err());
        assert!(values_from_json(&json!(["a"])).is_err());
    }

    #[test]
    fn test_lenient_fills_defaults_and_warns() {
        let resolution = resolve(
            &specs(),
            &values(&[("date", "31/02/2024"), ("extra", "1")]),
            FieldPolicy::Lenient,
        )
        .unwrap();

        assert_eq!(resolution.values.get("grade").map(String::as_str), Some("0"));
        assert_eq!(resolution.values.get("student").map(String::as_str), Some(""));
        assert!(!resolution.values.contains_key("extra"));
        assert_eq!(resolution.warnings.len(), 3);
    }

    #[test]
    fn test_lenient_keeps_whitespace_values_literal() {
        let resolution = resolve(
            &specs(),
            &values(&[("student", "  "), ("grade", "")]),
            FieldPolicy::Lenient,
        )
        .unwrap();
        assert_eq!(resolution.values.get("student").map(String::as_str), Some("  "));
        assert_eq!(resolution.values.get("grade").map(String::as_str), Some("0"));
        assert!(resolution
            .warnings
            .iter()
            .any(|w| w == "required field 'student' is empty"));
    }

    #[test]
    fn test_strict_lists_every_problem() {
        let err = resolve(
            &specs(),
            &values(&[("student", "  "), ("grade", "ten"), ("nope", "x")]),
            FieldPolicy::Strict,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown field 'nope'"));
        assert!(message.contains("required field 'student' is empty"));
        assert!(message.contains("field 'grade' expects a number value"));
    }

    #[test]
    fn test_strict_trims_and_accepts_valid_values() {
        let resolution = resolve(
            &specs(),
            &values(&[("student", " Ana "), ("date", "2024-03-01"), ("grade", "9,5")]),
            FieldPolicy::Strict,
        )
        .unwrap();
        assert_eq!(resolution.values.get("student").map(String::as_str), Some("Ana"));
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_field_spec_serializes_kind_as_type() {
        let spec: FieldSpec =
            serde_json::from_value(json!({"name": "d", "label": "Data", "type": "date"})).unwrap();
        assert_eq!(spec.kind, FieldKind::Date);
        assert!(!spec.required);
        let back = serde_json::to_value(FieldSpec::text("n")).unwrap();
        assert_eq!(back["type"], "text");
    }
}
