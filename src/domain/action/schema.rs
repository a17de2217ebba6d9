//! Declarative input schemas for actions
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Validation walks the fields
//! in declaration order, coerces each raw value to the declared type, checks
//! its constraints and stops at the first failure. The same schema therefore
//! works for JSON bodies, where values arrive typed, and for query strings or
//! form bodies, where every value is a string.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use super::error::TypedError;

/// Replacement written into logs for fields flagged secret
pub const SECRET_PLACEHOLDER: &str = "[[secret]]";

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl FieldType {
    fn describe(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Object => "an object",
            Self::Array => "an array",
            Self::Any => "a value",
        }
    }
}

/// Constraint checked after coercion
#[derive(Debug, Clone)]
pub enum Constraint {
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Email,
    OneOf(Vec<String>),
    Pattern(Regex),
}

impl Constraint {
    fn check(&self, name: &str, value: &Value) -> Result<(), String> {
        match self {
            Self::MinLength(min) => match length_of(value) {
                Some(len) if len < *min => {
                    Err(format!("{} must be at least {} characters", name, min))
                }
                _ => Ok(()),
            },
            Self::MaxLength(max) => match length_of(value) {
                Some(len) if len > *max => {
                    Err(format!("{} must be at most {} characters", name, max))
                }
                _ => Ok(()),
            },
            Self::Min(min) => match value.as_f64() {
                Some(n) if n < *min => Err(format!("{} must be at least {}", name, min)),
                _ => Ok(()),
            },
            Self::Max(max) => match value.as_f64() {
                Some(n) if n > *max => Err(format!("{} must be at most {}", name, max)),
                _ => Ok(()),
            },
            Self::Email => match value.as_str() {
                Some(s) if EMAIL_REGEX.is_match(s) => Ok(()),
                _ => Err(format!("{} must be a valid email address", name)),
            },
            Self::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => Ok(()),
                _ => Err(format!("{} must be one of: {}", name, allowed.join(", "))),
            },
            Self::Pattern(re) => match value.as_str() {
                Some(s) if re.is_match(s) => Ok(()),
                _ => Err(format!("{} has an invalid format", name)),
            },
        }
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// One input field: type, constraints and the message shown when it fails
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    field_type: FieldType,
    required: bool,
    default: Option<Value>,
    secret: bool,
    message: Option<String>,
    constraints: Vec<Constraint>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default: None,
            secret: false,
            message: None,
            constraints: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Object)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Array)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Any)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used when the field is absent; implies optional
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Never written to logs in clear text
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Human message reported for any failure on this field
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.constraint(Constraint::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.constraint(Constraint::MaxLength(max))
    }

    pub fn min(self, min: f64) -> Self {
        self.constraint(Constraint::Min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.constraint(Constraint::Max(max))
    }

    pub fn email(self) -> Self {
        self.constraint(Constraint::Email)
    }

    pub fn one_of<I, S>(self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint(Constraint::OneOf(
            allowed.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn pattern(self, re: Regex) -> Self {
        self.constraint(Constraint::Pattern(re))
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    fn fail(&self, value: Option<&Value>, fallback: String) -> TypedError {
        let message = self.message.clone().unwrap_or(fallback);
        TypedError::param_validation(&self.name, value.cloned(), message)
    }

    /// Whether the raw value should be treated as not supplied
    fn is_absent(&self, raw: Option<&Value>) -> bool {
        match raw {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) if s.is_empty() => self.field_type != FieldType::String,
            Some(_) => false,
        }
    }

    fn coerce(&self, raw: &Value) -> Option<Value> {
        match self.field_type {
            FieldType::Any => Some(raw.clone()),
            FieldType::String => match raw {
                Value::String(_) => Some(raw.clone()),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            FieldType::Integer => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| {
                        n.as_f64()
                            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                            .map(|f| f as i64)
                    })
                    .map(Value::from),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            },
            FieldType::Number => match raw {
                Value::Number(_) => Some(raw.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number),
                _ => None,
            },
            FieldType::Boolean => match raw {
                Value::Bool(_) => Some(raw.clone()),
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(Value::Bool(true)),
                    Some(0) => Some(Value::Bool(false)),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            FieldType::Object => match raw {
                Value::Object(_) => Some(raw.clone()),
                Value::String(s) => serde_json::from_str::<Value>(s)
                    .ok()
                    .filter(Value::is_object),
                _ => None,
            },
            FieldType::Array => match raw {
                Value::Array(_) => Some(raw.clone()),
                Value::String(s) => serde_json::from_str::<Value>(s)
                    .ok()
                    .filter(Value::is_array),
                _ => None,
            },
        }
    }

    fn validate(&self, raw: Option<&Value>) -> Result<Option<Value>, TypedError> {
        if self.is_absent(raw) {
            if let Some(default) = &self.default {
                return Ok(Some(default.clone()));
            }

            if self.required {
                return Err(self.fail(raw, format!("{} is required", self.name)));
            }

            return Ok(None);
        }

        let Some(raw) = raw else {
            return Ok(None);
        };

        let value = self.coerce(raw).ok_or_else(|| {
            self.fail(
                Some(raw),
                format!("{} must be {}", self.name, self.field_type.describe()),
            )
        })?;

        for constraint in &self.constraints {
            constraint
                .check(&self.name, &value)
                .map_err(|message| self.fail(Some(raw), message))?;
        }

        Ok(Some(value))
    }
}

/// Ordered set of fields accepted by an action
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.secret && f.name == name)
    }

    /// Validate raw input, returning the coerced params or the first failing field.
    ///
    /// Keys not declared in the schema are dropped.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<ValidatedParams, TypedError> {
        let mut params = Map::new();

        for field in &self.fields {
            if let Some(value) = field.validate(raw.get(&field.name))? {
                params.insert(field.name.clone(), value);
            }
        }

        Ok(ValidatedParams(params))
    }

    /// Copy of `params` with every secret field replaced by [`SECRET_PLACEHOLDER`]
    pub fn redact(&self, params: &Map<String, Value>) -> Value {
        let redacted = params
            .iter()
            .map(|(key, value)| {
                if self.is_secret(key) {
                    (key.clone(), Value::String(SECRET_PLACEHOLDER.to_string()))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect();

        Value::Object(redacted)
    }
}

/// Params that passed schema validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParams(Map<String, Value>);

impl ValidatedParams {
    /// Wrap params for actions that declare no schema
    pub fn unchecked(params: Map<String, Value>) -> Self {
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize into an action's concrete params type
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, TypedError> {
        serde_json::from_value(Value::Object(self.0)).map_err(|e| {
            TypedError::precondition(format!("Params do not match the action input: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn user_schema() -> Schema {
        Schema::new()
            .field(Field::string("name").min_length(3).max_length(256))
            .field(Field::string("email").email())
            .field(Field::string("password").min_length(8).secret())
    }

    #[test]
    fn test_first_failure_wins_in_declaration_order() {
        let err = user_schema()
            .validate(&raw(json!({"name": "x", "email": "y", "password": "z"})))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ActionParamValidation);
        assert_eq!(err.key(), Some("name"));
        assert_eq!(err.value(), Some(&json!("x")));
    }

    #[test]
    fn test_missing_required_field_is_reported() {
        let err = user_schema()
            .validate(&raw(json!({"name": "Evan", "password": "password123"})))
            .unwrap_err();

        assert_eq!(err.key(), Some("email"));
        assert_eq!(err.message(), "email is required");
        assert!(err.value().is_none());
    }

    #[test]
    fn test_custom_message_overrides_default() {
        let schema = Schema::new().field(
            Field::string("email")
                .email()
                .message("That is not a valid email address"),
        );

        let err = schema.validate(&raw(json!({"email": "nope"}))).unwrap_err();
        assert_eq!(err.message(), "That is not a valid email address");
    }

    #[test]
    fn test_query_string_coercion() {
        let schema = Schema::new()
            .field(Field::integer("limit"))
            .field(Field::number("temperature"))
            .field(Field::boolean("archived"));

        let params = schema
            .validate(&raw(json!({"limit": "25", "temperature": "0.7", "archived": "yes"})))
            .unwrap();

        assert_eq!(params.get("limit"), Some(&json!(25)));
        assert_eq!(params.get("temperature"), Some(&json!(0.7)));
        assert_eq!(params.get("archived"), Some(&json!(true)));
    }

    #[test]
    fn test_non_numeric_string_rejected_for_integer() {
        let schema = Schema::new().field(Field::integer("limit"));
        let err = schema.validate(&raw(json!({"limit": "ten"}))).unwrap_err();

        assert_eq!(err.key(), Some("limit"));
        assert_eq!(err.message(), "limit must be an integer");
    }

    #[test]
    fn test_defaults_and_optional_fields() {
        let schema = Schema::new()
            .field(Field::string("model").default_value("gpt-4o"))
            .field(Field::string("description").optional())
            .field(Field::integer("page").default_value(1));

        let params = schema.validate(&raw(json!({"page": ""}))).unwrap();

        assert_eq!(params.get_str("model"), Some("gpt-4o"));
        assert!(params.get("description").is_none());
        assert_eq!(params.get("page"), Some(&json!(1)));
    }

    #[test]
    fn test_json_text_coerced_to_object() {
        let schema = Schema::new().field(Field::object("message"));
        let params = schema
            .validate(&raw(json!({"message": "{\"text\":\"hi\"}"})))
            .unwrap();

        assert_eq!(params.get("message"), Some(&json!({"text": "hi"})));
    }

    #[test]
    fn test_one_of_and_range_constraints() {
        let schema = Schema::new()
            .field(Field::string("provider").one_of(["openai", "anthropic"]))
            .field(Field::number("temperature").min(0.0).max(2.0));

        let err = schema
            .validate(&raw(json!({"provider": "openai", "temperature": 3})))
            .unwrap_err();

        assert_eq!(err.key(), Some("temperature"));
        assert_eq!(err.message(), "temperature must be at most 2");
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let schema = Schema::new().field(Field::string("name"));
        let params = schema
            .validate(&raw(json!({"name": "agent", "admin": true})))
            .unwrap();

        assert_eq!(params.as_map().len(), 1);
    }

    #[test]
    fn test_redact_secret_fields() {
        let redacted = user_schema().redact(&raw(json!({
            "name": "Evan",
            "password": "hunter22"
        })));

        assert_eq!(redacted["password"], SECRET_PLACEHOLDER);
        assert_eq!(redacted["name"], "Evan");
        assert!(!redacted.to_string().contains("hunter22"));
    }

    #[test]
    fn test_parse_into_typed_params() {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Input {
            name: String,
            page_size: i64,
        }

        let schema = Schema::new()
            .field(Field::string("name"))
            .field(Field::integer("pageSize"));

        let input: Input = schema
            .validate(&raw(json!({"name": "a", "pageSize": "10"})))
            .unwrap()
            .parse()
            .unwrap();

        assert_eq!(input.name, "a");
        assert_eq!(input.page_size, 10);
    }
}
