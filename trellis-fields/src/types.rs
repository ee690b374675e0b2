//! Core schema types: field kinds, field values, and field schemas.
//!
//! All types serialize to/from JSON via serde. A `FieldSchema` describes one
//! named, typed, constrained attribute; constraints live on the kind itself
//! so validation has a single home.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FieldsError, Result};

/// The kind of a field — determines what shape a value takes and which
/// constraints apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldKind {
    /// Short single-line text.
    String,
    /// Long free-form text.
    Text,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// One value out of a fixed, ordered option set.
    Enum { allowed: Vec<String> },
    /// Calendar date, ISO `YYYY-MM-DD`.
    Date,
    Url,
    /// Stores a user name pointing at the host's user directory.
    UserReference,
    /// Any subset of a fixed, ordered option set.
    MultiSelect { allowed: Vec<String> },
}

impl FieldKind {
    /// Validate the kind's own constraints, before any value is seen.
    ///
    /// Enum and multi-select kinds must carry a non-empty option set; a
    /// numeric range must satisfy `min <= max`.
    pub fn validate(&self, field: &str) -> Result<()> {
        match self {
            Self::Enum { allowed } | Self::MultiSelect { allowed } => {
                if allowed.is_empty() {
                    return Err(FieldsError::invalid_schema(
                        field,
                        "allowed values must not be empty",
                    ));
                }
                Ok(())
            }
            Self::Number {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(FieldsError::invalid_schema(
                field,
                format!("numeric range is inverted: min {min} > max {max}"),
            )),
            _ => Ok(()),
        }
    }

    /// Validate a single value against this kind.
    pub fn validate_value(&self, field: &str, value: &FieldValue) -> Result<()> {
        match (self, value) {
            (Self::String | Self::Text, FieldValue::Text(_)) => Ok(()),
            (Self::Number { min, max }, FieldValue::Number(n)) => {
                if let Some(min) = min {
                    if n < min {
                        return Err(FieldsError::invalid_value(
                            field,
                            format!("{n} is below the minimum of {min}"),
                        ));
                    }
                }
                if let Some(max) = max {
                    if n > max {
                        return Err(FieldsError::invalid_value(
                            field,
                            format!("{n} is above the maximum of {max}"),
                        ));
                    }
                }
                Ok(())
            }
            (Self::Enum { allowed }, FieldValue::Text(v)) => {
                if allowed.iter().any(|a| a == v) {
                    Ok(())
                } else {
                    Err(FieldsError::invalid_value(
                        field,
                        format!("'{v}' is not one of: {}", allowed.join(", ")),
                    ))
                }
            }
            (Self::Date, FieldValue::Text(v)) => {
                NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| {
                    FieldsError::invalid_value(field, format!("'{v}' is not a YYYY-MM-DD date"))
                })?;
                Ok(())
            }
            (Self::Url, FieldValue::Text(v)) => {
                url::Url::parse(v).map_err(|_| {
                    FieldsError::invalid_value(field, format!("'{v}' is not a valid URL"))
                })?;
                Ok(())
            }
            (Self::UserReference, FieldValue::Text(v)) => {
                if v.trim().is_empty() {
                    Err(FieldsError::invalid_value(field, "user reference is empty"))
                } else {
                    Ok(())
                }
            }
            (Self::MultiSelect { allowed }, FieldValue::List(values)) => {
                for v in values {
                    if !allowed.iter().any(|a| a == v) {
                        return Err(FieldsError::invalid_value(
                            field,
                            format!("'{v}' is not one of: {}", allowed.join(", ")),
                        ));
                    }
                }
                Ok(())
            }
            _ => Err(FieldsError::invalid_value(
                field,
                format!("value shape does not match a {} field", self.label()),
            )),
        }
    }

    /// Human-readable kind label, matching the serialized tag.
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Number { .. } => "number",
            Self::Enum { .. } => "enum",
            Self::Date => "date",
            Self::Url => "url",
            Self::UserReference => "user-reference",
            Self::MultiSelect { .. } => "multi-select",
        }
    }
}

/// A field value as supplied by a work item.
///
/// Dates, URLs, and user references travel as text and are checked against
/// the field's kind; numbers and option subsets keep their natural shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Empty values do not satisfy a required field or a required-field
    /// transition gate.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Text(v) => v.trim().is_empty(),
            Self::List(values) => values.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// A field schema — the complete definition of a single named attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
}

impl FieldSchema {
    /// Create a new optional field with no default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
        }
    }

    /// Mark the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Validate the whole schema: the kind's constraints first, then the
    /// default value against the kind. Runs before the field is admitted to
    /// a registry, so no admitted field is ever observably invalid.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FieldsError::invalid_schema(
                &self.name,
                "field name must not be empty",
            ));
        }
        self.kind.validate(&self.name)?;
        if let Some(default) = &self.default {
            self.kind.validate_value(&self.name, default)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_kind_requires_allowed_values() {
        let kind = FieldKind::Enum { allowed: vec![] };
        let err = kind.validate("severity").unwrap_err();
        assert!(matches!(err, FieldsError::InvalidSchema { .. }));
        assert!(err.to_string().contains("severity"));
    }

    #[test]
    fn multi_select_kind_requires_allowed_values() {
        let kind = FieldKind::MultiSelect { allowed: vec![] };
        assert!(kind.validate("components").is_err());
    }

    #[test]
    fn inverted_numeric_range_rejected() {
        let kind = FieldKind::Number {
            min: Some(10.0),
            max: Some(1.0),
        };
        let err = kind.validate("points").unwrap_err();
        assert!(err.to_string().contains("min 10 > max 1"));
    }

    #[test]
    fn open_numeric_range_accepted() {
        let kind = FieldKind::Number {
            min: Some(0.0),
            max: None,
        };
        assert!(kind.validate("points").is_ok());
        assert!(kind
            .validate_value("points", &FieldValue::Number(100.0))
            .is_ok());
        assert!(kind
            .validate_value("points", &FieldValue::Number(-1.0))
            .is_err());
    }

    #[test]
    fn enum_value_must_be_in_options() {
        let kind = FieldKind::Enum {
            allowed: vec!["low".into(), "medium".into(), "high".into()],
        };
        assert!(kind.validate_value("severity", &"medium".into()).is_ok());
        let err = kind
            .validate_value("severity", &"blocker".into())
            .unwrap_err();
        assert!(err.to_string().contains("blocker"));
        assert!(err.to_string().contains("low, medium, high"));
    }

    #[test]
    fn multi_select_values_all_checked() {
        let kind = FieldKind::MultiSelect {
            allowed: vec!["api".into(), "ui".into(), "db".into()],
        };
        let ok = FieldValue::List(vec!["api".into(), "db".into()]);
        assert!(kind.validate_value("components", &ok).is_ok());
        let bad = FieldValue::List(vec!["api".into(), "infra".into()]);
        assert!(kind.validate_value("components", &bad).is_err());
    }

    #[test]
    fn date_value_parses_iso() {
        assert!(FieldKind::Date
            .validate_value("due", &"2025-04-01".into())
            .is_ok());
        assert!(FieldKind::Date
            .validate_value("due", &"04/01/2025".into())
            .is_err());
    }

    #[test]
    fn url_value_validated() {
        assert!(FieldKind::Url
            .validate_value("link", &"https://example.com/x".into())
            .is_ok());
        assert!(FieldKind::Url
            .validate_value("link", &"not a url".into())
            .is_err());
    }

    #[test]
    fn value_shape_mismatch_rejected() {
        let err = FieldKind::String
            .validate_value("title", &FieldValue::Number(3.0))
            .unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn schema_default_validated_against_kind() {
        let schema = FieldSchema::new(
            "severity",
            FieldKind::Enum {
                allowed: vec!["low".into(), "high".into()],
            },
        )
        .required()
        .with_default("medium");
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, FieldsError::InvalidValue { .. }));

        let schema = FieldSchema::new(
            "severity",
            FieldKind::Enum {
                allowed: vec!["low".into(), "high".into()],
            },
        )
        .with_default("low");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn empty_values() {
        assert!(FieldValue::Text("  ".into()).is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
        assert!(!FieldValue::Text("x".into()).is_empty());
    }

    #[test]
    fn field_kind_json_round_trip() {
        let kind = FieldKind::Enum {
            allowed: vec!["low".into(), "high".into()],
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"kind\":\"enum\""));
        let parsed: FieldKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, parsed);
    }

    #[test]
    fn field_schema_json_shape() {
        let schema = FieldSchema::new(
            "points",
            FieldKind::Number {
                min: Some(0.0),
                max: Some(100.0),
            },
        );
        let json = serde_json::to_string(&schema).unwrap();
        // No default -> key omitted entirely
        assert!(!json.contains("default"));
        let parsed: FieldSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);
    }
}
