use crate::error::{Issue, SchemaConflict, ValidationError};
use crate::path::FieldPath;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// The shape and validation rules of a structured value.
///
/// Schemas form a tree: objects and records hold nested schemas per key, arrays hold the schema
/// of their items, everything else is terminal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// Accepts any value, unchanged.
    #[default]
    Any,
    Boolean,
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    String {
        /// A regular expression the value must match.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        /// The set of allowed values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        one_of: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
    },
    Array {
        items: Box<Schema>,
    },
    /// A mapping with arbitrary keys and values of a single schema.
    Record {
        values: Box<Schema>,
    },
    Object {
        #[serde(default)]
        fields: IndexMap<String, Field>,
        /// Reject unknown keys instead of stripping them.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        strict: bool,
    },
}

/// A named entry of an object schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(flatten)]
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Used when the field is missing (or `null`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The variant of a schema, without its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    Any,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Record,
    Object,
}

impl Display for SchemaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Any => "any",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Record => "record",
            Self::Object => "object",
        })
    }
}

impl Schema {
    pub fn any() -> Self {
        Self::Any
    }

    pub fn boolean() -> Self {
        Self::Boolean
    }

    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    pub fn string() -> Self {
        Self::String {
            pattern: None,
            one_of: None,
            min_length: None,
        }
    }

    pub fn array(items: Schema) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    pub fn record(values: Schema) -> Self {
        Self::Record {
            values: Box::new(values),
        }
    }

    pub fn object<K, F>(fields: impl IntoIterator<Item = (K, F)>) -> Self
    where
        K: Into<String>,
        F: Into<Field>,
    {
        Self::Object {
            fields: fields
                .into_iter()
                .map(|(name, field)| (name.into(), field.into()))
                .collect(),
            strict: false,
        }
    }

    /// Turn an object schema into a strict one. Other schemas are returned unchanged.
    pub fn strict(mut self) -> Self {
        if let Self::Object { strict, .. } = &mut self {
            *strict = true;
        }
        self
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Self::Any => SchemaKind::Any,
            Self::Boolean => SchemaKind::Boolean,
            Self::Integer { .. } => SchemaKind::Integer,
            Self::Number { .. } => SchemaKind::Number,
            Self::String { .. } => SchemaKind::String,
            Self::Array { .. } => SchemaKind::Array,
            Self::Record { .. } => SchemaKind::Record,
            Self::Object { .. } => SchemaKind::Object,
        }
    }

    /// The deep-partial variant of this schema.
    ///
    /// Every object field becomes optional and loses its default, at any depth.
    pub fn partial(&self) -> Self {
        match self {
            Self::Object { fields, strict } => Self::Object {
                fields: fields
                    .iter()
                    .map(|(name, field)| {
                        let field = Field {
                            schema: field.schema.partial(),
                            optional: true,
                            default: None,
                            description: field.description.clone(),
                        };
                        (name.clone(), field)
                    })
                    .collect(),
                strict: *strict,
            },
            Self::Array { items } => Self::array(items.partial()),
            Self::Record { values } => Self::record(values.partial()),
            terminal => terminal.clone(),
        }
    }

    /// The structural union of two schemas.
    ///
    /// Every field of either side is present in the result. Where both sides describe the same
    /// path, the sub-schemas are united recursively; for terminals `other` wins. Different kinds at
    /// the same path are rejected.
    pub fn union(&self, other: &Schema) -> Result<Schema, SchemaConflict> {
        self.union_at(other, &FieldPath::root())
    }

    fn union_at(&self, other: &Schema, path: &FieldPath) -> Result<Schema, SchemaConflict> {
        match (self, other) {
            (Self::Any, other) => Ok(other.clone()),
            (this, Self::Any) => Ok(this.clone()),
            (
                Self::Object {
                    fields: left,
                    strict: left_strict,
                },
                Self::Object {
                    fields: right,
                    strict: right_strict,
                },
            ) => {
                let mut fields = left.clone();
                for (name, field) in right {
                    let united = match left.get(name) {
                        Some(existing) => existing.union_at(field, &path.key(name))?,
                        None => field.clone(),
                    };
                    fields.insert(name.clone(), united);
                }
                Ok(Self::Object {
                    fields,
                    strict: *left_strict && *right_strict,
                })
            }
            (Self::Array { items: left }, Self::Array { items: right }) => {
                Ok(Self::array(left.union_at(right, path)?))
            }
            (Self::Record { values: left }, Self::Record { values: right }) => {
                Ok(Self::record(left.union_at(right, path)?))
            }
            (this, other) if this.kind() == other.kind() => Ok(other.clone()),
            (this, other) => Err(SchemaConflict {
                path: path.clone(),
                left: this.kind(),
                right: other.kind(),
            }),
        }
    }

    /// Validate and normalize a value.
    ///
    /// Defaults are filled in and unknown object keys are stripped (or rejected for strict
    /// objects). All issues are collected before failing.
    pub fn validate(&self, value: Option<&Value>) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let mut patterns = Patterns::default();
        let result = match value {
            Some(value) => self.check(value, &FieldPath::root(), &mut issues, &mut patterns),
            None if matches!(self, Self::Any) => Some(Value::Null),
            None => {
                issues.push(Issue::new(FieldPath::root(), "value is missing"));
                None
            }
        };

        match result {
            Some(value) if issues.is_empty() => Ok(value),
            _ => Err(ValidationError::new(issues)),
        }
    }

    /// Check a single value, pushing issues. Returns the normalized value if it was accepted.
    fn check(
        &self,
        value: &Value,
        path: &FieldPath,
        issues: &mut Vec<Issue>,
        patterns: &mut Patterns,
    ) -> Option<Value> {
        let mut reject = |message: String| {
            issues.push(Issue::new(path.clone(), message));
            None
        };

        match self {
            Self::Any => Some(value.clone()),
            Self::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                other => reject(expected("boolean", other)),
            },
            Self::Integer { minimum, maximum } => {
                let Some(n) = value.as_i64() else {
                    return match value.is_u64() {
                        true => reject("integer is out of range".into()),
                        false => reject(expected("integer", value)),
                    };
                };
                match (minimum, maximum) {
                    (Some(min), _) if n < *min => reject(format!("must be at least {min}")),
                    (_, Some(max)) if n > *max => reject(format!("must be at most {max}")),
                    _ => Some(value.clone()),
                }
            }
            Self::Number { minimum, maximum } => {
                let Some(n) = value.as_f64() else {
                    return reject(expected("number", value));
                };
                match (minimum, maximum) {
                    (Some(min), _) if n < *min => reject(format!("must be at least {min}")),
                    (_, Some(max)) if n > *max => reject(format!("must be at most {max}")),
                    _ => Some(value.clone()),
                }
            }
            Self::String {
                pattern,
                one_of,
                min_length,
            } => {
                let Some(s) = value.as_str() else {
                    return reject(expected("string", value));
                };
                if let Some(min) = min_length {
                    if s.chars().count() < *min {
                        return reject(format!("must be at least {min} characters long"));
                    }
                }
                if let Some(allowed) = one_of {
                    if !allowed.iter().any(|a| a == s) {
                        return reject(format!("must be one of: {}", allowed.join(", ")));
                    }
                }
                if let Some(pattern) = pattern {
                    match patterns.get(pattern) {
                        Ok(re) if re.is_match(s) => {}
                        Ok(_) => return reject(format!("must match pattern `{pattern}`")),
                        Err(err) => return reject(format!("invalid pattern `{pattern}`: {err}")),
                    }
                }
                Some(value.clone())
            }
            Self::Array { items } => {
                let Some(elements) = value.as_array() else {
                    return reject(expected("array", value));
                };
                let mut out = Vec::with_capacity(elements.len());
                let mut accepted = true;
                for (index, element) in elements.iter().enumerate() {
                    match items.check(element, &path.index(index), issues, patterns) {
                        Some(element) => out.push(element),
                        None => accepted = false,
                    }
                }
                accepted.then_some(Value::Array(out))
            }
            Self::Record { values } => {
                let Some(map) = value.as_object() else {
                    return reject(expected("object", value));
                };
                let mut out = Map::new();
                let mut accepted = true;
                for (key, entry) in map {
                    match values.check(entry, &path.key(key), issues, patterns) {
                        Some(entry) => {
                            out.insert(key.clone(), entry);
                        }
                        None => accepted = false,
                    }
                }
                accepted.then_some(Value::Object(out))
            }
            Self::Object { fields, strict } => {
                let Some(map) = value.as_object() else {
                    return reject(expected("object", value));
                };
                let mut out = Map::new();
                let mut accepted = true;
                for (name, field) in fields {
                    let field_path = path.key(name);
                    let present = map
                        .get(name)
                        .filter(|v| !v.is_null() || matches!(field.schema, Self::Any));
                    let candidate = match (present, &field.default) {
                        (Some(value), _) => value,
                        (None, Some(default)) => default,
                        (None, None) if field.optional => continue,
                        (None, None) => {
                            issues.push(Issue::new(field_path, "required field is missing"));
                            accepted = false;
                            continue;
                        }
                    };
                    match field.schema.check(candidate, &field_path, issues, patterns) {
                        Some(value) => {
                            out.insert(name.clone(), value);
                        }
                        None => accepted = false,
                    }
                }
                if *strict {
                    for key in map.keys().filter(|key| !fields.contains_key(*key)) {
                        issues.push(Issue::new(path.key(key), "unknown field"));
                        accepted = false;
                    }
                }
                accepted.then_some(Value::Object(out))
            }
        }
    }
}

impl Field {
    pub fn required(schema: Schema) -> Self {
        Self {
            schema,
            optional: false,
            default: None,
            description: None,
        }
    }

    pub fn optional(schema: Schema) -> Self {
        Self {
            optional: true,
            ..Self::required(schema)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn union_at(&self, other: &Field, path: &FieldPath) -> Result<Field, SchemaConflict> {
        Ok(Field {
            schema: self.schema.union_at(&other.schema, path)?,
            optional: self.optional && other.optional,
            default: other.default.clone().or_else(|| self.default.clone()),
            description: other
                .description
                .clone()
                .or_else(|| self.description.clone()),
        })
    }
}

impl From<Schema> for Field {
    fn from(schema: Schema) -> Self {
        Self::required(schema)
    }
}

/// The compiled `pattern` constraints of a single validation.
#[derive(Default)]
struct Patterns(HashMap<String, Result<Regex, regex::Error>>);

impl Patterns {
    fn get(&mut self, pattern: &str) -> &Result<Regex, regex::Error> {
        if !self.0.contains_key(pattern) {
            self.0.insert(pattern.to_string(), Regex::new(pattern));
        }
        &self.0[pattern]
    }
}

fn expected(what: &str, found: &Value) -> String {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("expected {what}, found {found}")
}
