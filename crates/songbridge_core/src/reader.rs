//! Field-by-field payload walker shared by the schema modules.
//!
//! Every accessor records an issue instead of bailing out, so one pass reports
//! everything wrong with a payload. Required accessors hand back a placeholder
//! after recording the issue; [`FieldReader::finish`] discards the record in
//! that case.

use serde_json::{Map, Value};
use url::Url;

use crate::issue::{FieldIssue, IssueCode, PayloadFamily, ValidationError};

pub(crate) const ROOT: &str = "$";

pub(crate) type Object = Map<String, Value>;

pub(crate) fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() || parent == ROOT {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) struct FieldReader {
    family: PayloadFamily,
    issues: Vec<FieldIssue>,
}

impl FieldReader {
    pub(crate) fn new(family: PayloadFamily) -> Self {
        Self {
            family,
            issues: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, code: IssueCode, message: impl Into<String>) {
        self.issues.push(FieldIssue::new(path, code, message));
    }

    pub(crate) fn finish<T>(self, record: T) -> Result<T, ValidationError> {
        if self.issues.is_empty() {
            Ok(record)
        } else {
            Err(ValidationError::new(self.family, self.issues))
        }
    }

    pub(crate) fn root<'v>(&mut self, payload: &'v Value) -> Option<&'v Object> {
        match payload {
            Value::Object(map) => Some(map),
            other => {
                self.push(
                    ROOT,
                    IssueCode::InvalidType,
                    format!("expected object, got {}", type_name(other)),
                );
                None
            }
        }
    }

    /// Looks up `key`, treating `null` as absent. Records `Required` when a
    /// required field is absent.
    fn lookup<'v>(&mut self, obj: &'v Object, parent: &str, key: &str, required: bool) -> Option<&'v Value> {
        match obj.get(key) {
            Some(Value::Null) | None => {
                if required {
                    self.push(field_path(parent, key), IssueCode::Required, "field is required");
                }
                None
            }
            Some(value) => Some(value),
        }
    }

    fn wrong_type(&mut self, parent: &str, key: &str, expected: &str, got: &Value) {
        self.push(
            field_path(parent, key),
            IssueCode::InvalidType,
            format!("expected {expected}, got {}", type_name(got)),
        );
    }

    pub(crate) fn optional_str(&mut self, obj: &Object, parent: &str, key: &str) -> Option<String> {
        self.str_field(obj, parent, key, false)
    }

    pub(crate) fn required_str(&mut self, obj: &Object, parent: &str, key: &str) -> String {
        self.str_field(obj, parent, key, true).unwrap_or_default()
    }

    pub(crate) fn str_field(&mut self, obj: &Object, parent: &str, key: &str, required: bool) -> Option<String> {
        match self.lookup(obj, parent, key, required)? {
            Value::String(text) => Some(text.clone()),
            other => {
                self.wrong_type(parent, key, "string", other);
                None
            }
        }
    }

    /// Required string that must contain something other than whitespace.
    pub(crate) fn required_text(&mut self, obj: &Object, parent: &str, key: &str) -> String {
        let text = self.str_field(obj, parent, key, true);
        if let Some(text) = &text {
            if text.trim().is_empty() {
                self.push(field_path(parent, key), IssueCode::Empty, "must not be blank");
            }
        }
        text.unwrap_or_default()
    }

    /// Optional string where an empty value means absent.
    pub(crate) fn optional_non_empty(&mut self, obj: &Object, parent: &str, key: &str) -> Option<String> {
        self.optional_str(obj, parent, key)
            .filter(|text| !text.trim().is_empty())
    }

    /// Optional string or number, rendered as text.
    pub(crate) fn optional_scalar_text(&mut self, obj: &Object, parent: &str, key: &str) -> Option<String> {
        match self.lookup(obj, parent, key, false)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            other => {
                self.wrong_type(parent, key, "string or number", other);
                None
            }
        }
    }

    pub(crate) fn required_bool(&mut self, obj: &Object, parent: &str, key: &str) -> bool {
        match self.lookup(obj, parent, key, true) {
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                self.wrong_type(parent, key, "boolean", other);
                false
            }
            None => false,
        }
    }

    pub(crate) fn required_i64(&mut self, obj: &Object, parent: &str, key: &str) -> i64 {
        match self.lookup(obj, parent, key, true) {
            Some(Value::Number(number)) => match number.as_i64() {
                Some(value) => value,
                None => {
                    self.push(field_path(parent, key), IssueCode::InvalidType, "expected integer");
                    0
                }
            },
            Some(other) => {
                self.wrong_type(parent, key, "integer", other);
                0
            }
            None => 0,
        }
    }

    pub(crate) fn optional_u64(&mut self, obj: &Object, parent: &str, key: &str) -> Option<u64> {
        match self.lookup(obj, parent, key, false)? {
            Value::Number(number) => {
                let value = number.as_u64();
                if value.is_none() {
                    self.push(
                        field_path(parent, key),
                        IssueCode::InvalidType,
                        "expected non-negative integer",
                    );
                }
                value
            }
            other => {
                self.wrong_type(parent, key, "integer", other);
                None
            }
        }
    }

    pub(crate) fn optional_f64(&mut self, obj: &Object, parent: &str, key: &str) -> Option<f64> {
        match self.lookup(obj, parent, key, false)? {
            Value::Number(number) => number.as_f64(),
            other => {
                self.wrong_type(parent, key, "number", other);
                None
            }
        }
    }

    pub(crate) fn required_object<'v>(&mut self, obj: &'v Object, parent: &str, key: &str) -> Option<&'v Object> {
        match self.lookup(obj, parent, key, true)? {
            Value::Object(map) => Some(map),
            other => {
                self.wrong_type(parent, key, "object", other);
                None
            }
        }
    }

    /// Optional array; absent and `null` both read as empty.
    pub(crate) fn optional_array<'v>(&mut self, obj: &'v Object, parent: &str, key: &str) -> &'v [Value] {
        match self.lookup(obj, parent, key, false) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.wrong_type(parent, key, "array", other);
                &[]
            }
            None => &[],
        }
    }

    /// Element of an array that must be an object.
    pub(crate) fn element<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Object> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.push(
                    path,
                    IssueCode::InvalidType,
                    format!("expected object, got {}", type_name(other)),
                );
                None
            }
        }
    }

    /// Maps a string field onto one of a fixed set of values.
    pub(crate) fn one_of<T>(
        &mut self,
        path: &str,
        raw: Option<String>,
        allowed: &[&str],
        parse: fn(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = raw?;
        let parsed = parse(&raw);
        if parsed.is_none() {
            self.push(
                path,
                IssueCode::InvalidValue,
                format!("expected one of {}, got {raw:?}", allowed.join(", ")),
            );
        }
        parsed
    }

    pub(crate) fn max_chars(&mut self, path: &str, text: Option<&str>, limit: usize) {
        if let Some(text) = text {
            let count = text.chars().count();
            if count > limit {
                self.push(
                    path,
                    IssueCode::TooLong,
                    format!("must be at most {limit} characters, got {count}"),
                );
            }
        }
    }

    pub(crate) fn unit_interval(&mut self, path: &str, value: Option<f64>) {
        if let Some(value) = value {
            if !(0.0..=1.0).contains(&value) {
                self.push(path, IssueCode::OutOfRange, format!("must be within [0, 1], got {value}"));
            }
        }
    }

    pub(crate) fn within(&mut self, path: &str, value: Option<u64>, min: u64, max: u64) {
        if let Some(value) = value {
            if value < min || value > max {
                self.push(
                    path,
                    IssueCode::OutOfRange,
                    format!("must be within [{min}, {max}], got {value}"),
                );
            }
        }
    }

    /// Absolute `http`/`https` URL check.
    pub(crate) fn http_url(&mut self, path: &str, text: Option<&str>) {
        let Some(text) = text else {
            return;
        };
        match Url::parse(text) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            Ok(url) => self.push(
                path,
                IssueCode::InvalidUrl,
                format!("unsupported url scheme {:?}", url.scheme()),
            ),
            Err(err) => self.push(path, IssueCode::InvalidUrl, format!("invalid url: {err}")),
        }
    }
}
