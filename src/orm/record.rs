//! Mapped entity instances.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::db::{Database, Row};
use super::schema::Schema;
use crate::error::OrmError;

/// One row of a mapped table, held as field name → value.
///
/// A `null` value is treated the same as an absent one. Field defaults are
/// only materialised through [`Record::get_or_default`], which writes the
/// produced value back so a function default runs at most once per record.
#[derive(Clone, Debug)]
pub struct Record {
    schema: Arc<Schema>,
    values: Map<String, Value>,
}

impl Record {
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self { schema: Arc::clone(schema), values: Map::new() }
    }

    pub(crate) fn from_row(schema: &Arc<Schema>, row: Row) -> Self {
        Self { schema: Arc::clone(schema), values: row }
    }

    pub fn schema(&self) -> &Arc<Schema> { &self.schema }
    pub fn values(&self) -> &Map<String, Value> { &self.values }
    pub fn into_values(self) -> Map<String, Value> { self.values }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.to_owned(), value.into());
        self
    }

    /// Chaining form of [`set`](Record::set).
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Ad-hoc read: `None` when the field is unset.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Attribute read: an unset field is an error.
    pub fn attr(&self, key: &str) -> Result<&Value, OrmError> {
        self.get(key).ok_or_else(|| OrmError::AttributeMissing {
            table: self.schema.table().to_owned(),
            field: key.to_owned(),
        })
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Reads `key`, filling in and memoising the field's default when unset.
    pub fn get_or_default(&mut self, key: &str) -> Option<Value> {
        if let Some(v) = self.get(key) {
            return Some(v.clone());
        }
        let value = self.schema.field(key)?.default().produce()?;
        debug!(field = key, value = %value, "using default value");
        self.values.insert(key.to_owned(), value.clone());
        Some(value)
    }

    /// Deserialises the values into a typed view.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, OrmError> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    /// Inserts the record, filling defaults for every field (primary key
    /// included) first.
    pub async fn save(&mut self, db: &Database) -> Result<(), OrmError> {
        let schema = Arc::clone(&self.schema);
        let mut args: Vec<Value> = schema.fields().iter()
            .map(|f| self.get_or_default(f).unwrap_or(Value::Null))
            .collect();
        args.push(self.get_or_default(schema.primary_key()).unwrap_or(Value::Null));
        let rows = db.execute(schema.insert_sql(), &args, db.autocommit()).await?;
        if rows != 1 {
            warn!(table = schema.table(), rows, "failed to insert record: affected rows mismatch");
        }
        Ok(())
    }

    /// Writes current values by primary key. Defaults are not applied.
    pub async fn update(&self, db: &Database) -> Result<(), OrmError> {
        let mut args: Vec<Value> = self.schema.fields().iter()
            .map(|f| self.value_or_null(f))
            .collect();
        args.push(self.value_or_null(self.schema.primary_key()));
        let rows = db.execute(self.schema.update_sql(), &args, db.autocommit()).await?;
        if rows != 1 {
            warn!(table = self.schema.table(), rows, "failed to update by primary key: affected rows mismatch");
        }
        Ok(())
    }

    pub async fn remove(&self, db: &Database) -> Result<(), OrmError> {
        let args = [self.value_or_null(self.schema.primary_key())];
        let rows = db.execute(self.schema.delete_sql(), &args, db.autocommit()).await?;
        if rows != 1 {
            warn!(table = self.schema.table(), rows, "failed to remove by primary key: affected rows mismatch");
        }
        Ok(())
    }

    fn value_or_null(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.values)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::orm::Field;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn schema() -> Arc<Schema> {
        Schema::define("users", vec![
            Field::string("id").primary_key().default_with(|| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                json!("generated")
            }),
            Field::string("name"),
            Field::boolean("admin"),
        ])
        .unwrap()
    }

    #[test]
    fn function_default_is_memoised() {
        let mut r = schema().record();
        let before = CALLS.load(Ordering::SeqCst);
        assert_eq!(r.get_or_default("id"), Some(json!("generated")));
        assert_eq!(r.get_or_default("id"), Some(json!("generated")));
        assert_eq!(CALLS.load(Ordering::SeqCst), before + 1);
        assert_eq!(r.get("id"), Some(&json!("generated")));
    }

    #[test]
    fn literal_default_is_copied_in() {
        let mut r = schema().record();
        assert_eq!(r.get("admin"), None);
        assert_eq!(r.get_or_default("admin"), Some(json!(false)));
        assert_eq!(r.values().get("admin"), Some(&json!(false)));
    }

    #[test]
    fn unset_field_without_default() {
        let mut r = schema().record();
        assert_eq!(r.get("name"), None);
        assert_eq!(r.get_or_default("name"), None);
        assert!(matches!(r.attr("name"), Err(OrmError::AttributeMissing { .. })));
        r.set("name", "alice");
        assert_eq!(r.attr("name").unwrap(), &json!("alice"));
    }

    #[test]
    fn explicit_value_wins_over_default() {
        let mut r = schema().record().with("admin", true);
        assert_eq!(r.get_or_default("admin"), Some(json!(true)));
    }

    #[test]
    fn decodes_into_typed_view() {
        #[derive(Deserialize)]
        struct View {
            name: String,
            admin: bool,
        }
        let r = schema().record().with("name", "bob").with("admin", true);
        let v: View = r.decode().unwrap();
        assert_eq!(v.name, "bob");
        assert!(v.admin);
    }

    #[test]
    fn serialises_as_its_values() {
        let r = schema().record().with("id", "1").with("name", "x");
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({"id": "1", "name": "x"}));
    }
}
