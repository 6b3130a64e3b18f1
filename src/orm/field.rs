//! Field descriptors: the declarative half of a record type.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// How a field fills itself in when a record has no value for it.
#[derive(Clone, Default)]
pub enum FieldDefault {
    #[default]
    None,
    /// Copied into the record on first read.
    Value(Value),
    /// Invoked at most once per record; the result is memoised.
    With(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    pub(crate) fn produce(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(v) => Some(v.clone()),
            Self::With(f) => Some(f()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Value(v) => write!(f, "Value({v})"),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// One mapped attribute of a record type.
///
/// Built with one of the typed constructors and refined with the builder
/// methods; immutable once handed to [`Schema::define`](super::Schema::define).
///
/// ```rust
/// use weblog::orm::Field;
///
/// let id = Field::string("id").primary_key().ddl("varchar(50)");
/// let admin = Field::boolean("admin");
/// assert!(id.is_primary_key());
/// assert_eq!(admin.sql_type(), "boolean");
/// ```
#[derive(Clone, Debug)]
pub struct Field {
    key: String,
    name: Option<String>,
    sql_type: String,
    primary_key: bool,
    default: FieldDefault,
}

impl Field {
    fn new(key: &str, sql_type: &str, default: FieldDefault) -> Self {
        Self {
            key: key.to_owned(),
            name: None,
            sql_type: sql_type.to_owned(),
            primary_key: false,
            default,
        }
    }

    /// `varchar(100)`, no default.
    pub fn string(key: &str) -> Self {
        Self::new(key, "varchar(100)", FieldDefault::None)
    }

    /// `boolean`, defaults to `false`.
    pub fn boolean(key: &str) -> Self {
        Self::new(key, "boolean", FieldDefault::Value(Value::Bool(false)))
    }

    /// `bigint`, defaults to `0`.
    pub fn integer(key: &str) -> Self {
        Self::new(key, "bigint", FieldDefault::Value(Value::from(0)))
    }

    /// `real`, defaults to `0.0`.
    pub fn float(key: &str) -> Self {
        Self::new(key, "real", FieldDefault::Value(Value::from(0.0)))
    }

    /// `text`, no default.
    pub fn text(key: &str) -> Self {
        Self::new(key, "text", FieldDefault::None)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn ddl(mut self, sql_type: &str) -> Self {
        self.sql_type = sql_type.to_owned();
        self
    }

    /// Explicit column name, used in the `set` clause of the update template.
    pub fn column(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_with(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = FieldDefault::With(Arc::new(f));
        self
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn sql_type(&self) -> &str { &self.sql_type }
    pub fn is_primary_key(&self) -> bool { self.primary_key }
    pub fn default(&self) -> &FieldDefault { &self.default }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Field, {}:{}>", self.sql_type, self.name.as_deref().unwrap_or(&self.key))
    }
}
