use serde_json::{Map, Value};

use crate::error::{ModelError, SchemaViolation};
use crate::field::FieldType;

/// Untrusted model output after schema validation: one suggested
/// field, classified into the most specific shape it satisfies.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestedField {
    Table(SuggestedTable),
    Choice(SuggestedChoice),
    Base(SuggestedBase),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedBase {
    pub title: String,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
    /// Present for Dropdown suggestions, which carry options but are
    /// not part of the stricter Choice shape.
    pub field_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedTable {
    pub title: String,
    pub required: bool,
    pub description: Option<String>,
    pub columns: Vec<String>,
    pub minimum_rows: i64,
    pub maximum_rows: Option<i64>,
    pub add_more_rows: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedChoice {
    pub title: String,
    pub field_type: FieldType,
    pub required: bool,
    pub description: Option<String>,
    pub field_options: Vec<String>,
}

impl SuggestedField {
    pub fn title(&self) -> &str {
        match self {
            SuggestedField::Table(s) => &s.title,
            SuggestedField::Choice(s) => &s.title,
            SuggestedField::Base(s) => &s.title,
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            SuggestedField::Table(_) => FieldType::Table,
            SuggestedField::Choice(s) => s.field_type,
            SuggestedField::Base(s) => s.field_type,
        }
    }
}

/// Strict JSON parse of the raw completion text. Malformed JSON is
/// always fatal; no fence-stripping or other recovery is attempted.
pub fn parse_model_response(text: &str) -> Result<Value, ModelError> {
    Ok(serde_json::from_str(text)?)
}

/// Validate parsed model output against the suggested-field schema.
///
/// The top level must be a non-empty array. Each element is tried
/// against the shape matchers from most to least specific (Table,
/// then Choice, then Base) so that an element satisfying both a
/// strict and the generic shape is classified by the strict one. A
/// single bad element rejects the whole batch; every violation found
/// is reported so the failure can be logged precisely.
pub fn validate_suggestions(value: &Value) -> Result<Vec<SuggestedField>, ModelError> {
    let Some(items) = value.as_array() else {
        return Err(ModelError::InvalidSchemaFormat(vec![
            SchemaViolation::TypeMismatch {
                path: "$".to_string(),
                expected: "array",
                found: value_type_name(value),
            },
        ]));
    };

    if items.is_empty() {
        return Err(ModelError::InvalidSchemaFormat(vec![
            SchemaViolation::NoSuggestions,
        ]));
    }

    let mut fields = Vec::with_capacity(items.len());
    let mut violations = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let path = format!("$[{idx}]");
        match validate_element(item, &path) {
            Ok(field) => fields.push(field),
            Err(mut errs) => violations.append(&mut errs),
        }
    }

    if violations.is_empty() {
        Ok(fields)
    } else {
        Err(ModelError::InvalidSchemaFormat(violations))
    }
}

enum ShapeMatch {
    Matched(SuggestedField),
    NotThisShape,
    Invalid(Vec<SchemaViolation>),
}

fn validate_element(value: &Value, path: &str) -> Result<SuggestedField, Vec<SchemaViolation>> {
    let Some(obj) = value.as_object() else {
        return Err(vec![SchemaViolation::TypeMismatch {
            path: path.to_string(),
            expected: "object",
            found: value_type_name(value),
        }]);
    };

    // Resolve the discriminator before shape matching; an unknown or
    // excluded fieldType can never match any shape.
    let field_type = resolve_field_type(obj, path)?;

    // Ordered from most to least specific.
    let matchers: [fn(&Map<String, Value>, FieldType, &str) -> ShapeMatch; 3] =
        [match_table_shape, match_choice_shape, match_base_shape];

    for matcher in matchers {
        match matcher(obj, field_type, path) {
            ShapeMatch::Matched(field) => return Ok(field),
            ShapeMatch::NotThisShape => continue,
            ShapeMatch::Invalid(errs) => return Err(errs),
        }
    }

    // match_base_shape accepts every non-excluded fieldType.
    unreachable!("base shape matcher matches all remaining field types")
}

fn resolve_field_type(
    obj: &Map<String, Value>,
    path: &str,
) -> Result<FieldType, Vec<SchemaViolation>> {
    let field_path = format!("{path}.fieldType");
    let raw = match obj.get("fieldType") {
        None => {
            return Err(vec![SchemaViolation::MissingField { path: field_path }]);
        }
        Some(v) => match v.as_str() {
            Some(s) => s,
            None => {
                return Err(vec![SchemaViolation::TypeMismatch {
                    path: field_path,
                    expected: "string",
                    found: value_type_name(v),
                }]);
            }
        },
    };

    let Some(field_type) = FieldType::from_name(raw) else {
        return Err(vec![SchemaViolation::UnknownFieldType {
            path: field_path,
            found: raw.to_string(),
        }]);
    };

    if field_type.is_excluded_from_suggestions() {
        return Err(vec![SchemaViolation::ExcludedFieldType {
            path: field_path,
            found: raw.to_string(),
        }]);
    }

    Ok(field_type)
}

fn match_table_shape(obj: &Map<String, Value>, field_type: FieldType, path: &str) -> ShapeMatch {
    if field_type != FieldType::Table {
        return ShapeMatch::NotThisShape;
    }

    let mut errs = Vec::new();
    let title = require_title(obj, path, &mut errs);
    let required = require_bool(obj, "required", path, &mut errs);
    let description = optional_string(obj, "description", path, &mut errs);
    let columns = require_string_array(obj, "columns", path, &mut errs);
    let minimum_rows = require_integer(obj, "minimumRows", path, &mut errs);
    let maximum_rows = optional_integer(obj, "maximumRows", path, &mut errs);
    let add_more_rows = require_bool(obj, "addMoreRows", path, &mut errs);

    match (title, required, columns, minimum_rows, add_more_rows) {
        (Some(title), Some(required), Some(columns), Some(minimum_rows), Some(add_more_rows))
            if errs.is_empty() =>
        {
            ShapeMatch::Matched(SuggestedField::Table(SuggestedTable {
                title,
                required,
                description,
                columns,
                minimum_rows,
                maximum_rows,
                add_more_rows,
            }))
        }
        _ => ShapeMatch::Invalid(errs),
    }
}

fn match_choice_shape(obj: &Map<String, Value>, field_type: FieldType, path: &str) -> ShapeMatch {
    if !matches!(field_type, FieldType::Checkbox | FieldType::Radio) {
        return ShapeMatch::NotThisShape;
    }

    let mut errs = Vec::new();
    let title = require_title(obj, path, &mut errs);
    let required = require_bool(obj, "required", path, &mut errs);
    let description = optional_string(obj, "description", path, &mut errs);
    let field_options = require_string_array(obj, "fieldOptions", path, &mut errs);

    match (title, required, field_options) {
        (Some(title), Some(required), Some(field_options)) if errs.is_empty() => {
            ShapeMatch::Matched(SuggestedField::Choice(SuggestedChoice {
                title,
                field_type,
                required,
                description,
                field_options,
            }))
        }
        _ => ShapeMatch::Invalid(errs),
    }
}

fn match_base_shape(obj: &Map<String, Value>, field_type: FieldType, path: &str) -> ShapeMatch {
    let mut errs = Vec::new();
    let title = require_title(obj, path, &mut errs);
    let required = require_bool(obj, "required", path, &mut errs);
    let description = optional_string(obj, "description", path, &mut errs);

    // Type-specific refinements beyond the base shape.
    let field_options = if field_type.requires_field_options() {
        require_string_array(obj, "fieldOptions", path, &mut errs)
    } else {
        None
    };

    if field_type.requires_description()
        && description.as_deref().map_or(true, |d| d.trim().is_empty())
    {
        errs.push(match obj.get("description") {
            None => SchemaViolation::MissingField {
                path: format!("{path}.description"),
            },
            Some(_) => SchemaViolation::EmptyString {
                path: format!("{path}.description"),
            },
        });
    }

    match (title, required) {
        (Some(title), Some(required)) if errs.is_empty() => {
            ShapeMatch::Matched(SuggestedField::Base(SuggestedBase {
                title,
                field_type,
                required,
                description,
                field_options,
            }))
        }
        _ => ShapeMatch::Invalid(errs),
    }
}

fn require_title(
    obj: &Map<String, Value>,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<String> {
    let title = require_string(obj, "title", path, errs)?;
    if title.trim().is_empty() {
        errs.push(SchemaViolation::EmptyString {
            path: format!("{path}.title"),
        });
        return None;
    }
    Some(title)
}

fn require_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<String> {
    match obj.get(key) {
        None => {
            errs.push(SchemaViolation::MissingField {
                path: format!("{path}.{key}"),
            });
            None
        }
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: format!("{path}.{key}"),
                    expected: "string",
                    found: value_type_name(v),
                });
                None
            }
        },
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: format!("{path}.{key}"),
                    expected: "string",
                    found: value_type_name(v),
                });
                None
            }
        },
    }
}

fn require_bool(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<bool> {
    match obj.get(key) {
        None => {
            errs.push(SchemaViolation::MissingField {
                path: format!("{path}.{key}"),
            });
            None
        }
        Some(v) => match v.as_bool() {
            Some(b) => Some(b),
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: format!("{path}.{key}"),
                    expected: "boolean",
                    found: value_type_name(v),
                });
                None
            }
        },
    }
}

fn require_integer(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<i64> {
    match obj.get(key) {
        None => {
            errs.push(SchemaViolation::MissingField {
                path: format!("{path}.{key}"),
            });
            None
        }
        Some(v) => match v.as_i64() {
            Some(n) => Some(n),
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: format!("{path}.{key}"),
                    expected: "integer",
                    found: value_type_name(v),
                });
                None
            }
        },
    }
}

fn optional_integer(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<i64> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_i64() {
            Some(n) => Some(n),
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: format!("{path}.{key}"),
                    expected: "integer",
                    found: value_type_name(v),
                });
                None
            }
        },
    }
}

fn require_string_array(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errs: &mut Vec<SchemaViolation>,
) -> Option<Vec<String>> {
    let arr_path = format!("{path}.{key}");
    let items = match obj.get(key) {
        None => {
            errs.push(SchemaViolation::MissingField { path: arr_path });
            return None;
        }
        Some(v) => match v.as_array() {
            Some(items) => items,
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: arr_path,
                    expected: "array",
                    found: value_type_name(v),
                });
                return None;
            }
        },
    };

    if items.is_empty() {
        errs.push(SchemaViolation::EmptyArray { path: arr_path });
        return None;
    }

    let mut out = Vec::with_capacity(items.len());
    let mut ok = true;
    for (idx, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(s) => out.push(s.to_string()),
            None => {
                errs.push(SchemaViolation::TypeMismatch {
                    path: format!("{arr_path}[{idx}]"),
                    expected: "string",
                    found: value_type_name(item),
                });
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
