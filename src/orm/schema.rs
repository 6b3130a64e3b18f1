//! Record schemas: table, primary key, fields and the generated SQL.
//!
//! A schema is derived once per record type, at startup, by
//! [`Schema::define`]. The four statement templates are fixed strings from
//! then on; per-call queries only append `where`, `order by` and `limit`
//! fragments to the select template.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::db::Database;
use super::field::Field;
use super::record::Record;
use crate::error::{OrmError, SchemaError};

/// Table description and statement templates for one record type.
#[derive(Debug)]
pub struct Schema {
    table: String,
    primary_key: String,
    fields: Vec<String>,
    mappings: HashMap<String, Field>,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

fn quoted(ident: &str) -> String {
    format!("`{ident}`")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl Schema {
    /// Builds the schema for `table` from its field descriptors.
    ///
    /// Exactly one field must be marked primary key.
    ///
    /// ```rust
    /// use weblog::orm::{Field, Schema};
    ///
    /// let schema = Schema::define("users", vec![
    ///     Field::string("id").primary_key(),
    ///     Field::string("email"),
    /// ]).unwrap();
    ///
    /// assert_eq!(schema.select_sql(), "select `id`, `email` from `users`");
    /// assert_eq!(schema.insert_sql(), "insert into `users` (`email`, `id`) values (?, ?)");
    /// ```
    pub fn define(table: &str, fields: Vec<Field>) -> Result<Arc<Self>, SchemaError> {
        info!(table, "found model");
        let mut mappings = HashMap::new();
        let mut settable = Vec::new();
        let mut primary_key: Option<String> = None;

        for field in fields {
            info!("  found mapping: {} ==> {field}", field.key());
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        table: table.to_owned(),
                        field: field.key().to_owned(),
                    });
                }
                primary_key = Some(field.key().to_owned());
            } else {
                settable.push(field.key().to_owned());
            }
            mappings.insert(field.key().to_owned(), field);
        }

        let primary_key = primary_key
            .ok_or_else(|| SchemaError::MissingPrimaryKey { table: table.to_owned() })?;

        let pk = quoted(&primary_key);
        let tbl = quoted(table);
        let escaped: Vec<String> = settable.iter().map(|f| quoted(f)).collect();

        let select_cols = std::iter::once(pk.clone())
            .chain(escaped.iter().cloned())
            .collect::<Vec<_>>()
            .join(", ");
        let insert_cols = escaped.iter()
            .cloned()
            .chain(std::iter::once(pk.clone()))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = if settable.is_empty() {
            format!("{pk}={pk}")
        } else {
            settable.iter()
                .map(|f| {
                    let column = mappings.get(f).and_then(Field::name).unwrap_or(f);
                    format!("{}=?", quoted(column))
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        Ok(Arc::new(Self {
            select: format!("select {select_cols} from {tbl}"),
            insert: format!(
                "insert into {tbl} ({insert_cols}) values ({})",
                placeholders(settable.len() + 1)
            ),
            update: format!("update {tbl} set {assignments} where {pk}=?"),
            delete: format!("delete from {tbl} where {pk}=?"),
            table: table.to_owned(),
            primary_key,
            fields: settable,
            mappings,
        }))
    }

    pub fn table(&self) -> &str { &self.table }
    pub fn primary_key(&self) -> &str { &self.primary_key }
    /// Mapped fields in declaration order, primary key excluded.
    pub fn fields(&self) -> &[String] { &self.fields }
    pub fn field(&self, key: &str) -> Option<&Field> { self.mappings.get(key) }
    pub fn select_sql(&self) -> &str { &self.select }
    pub fn insert_sql(&self) -> &str { &self.insert }
    pub fn update_sql(&self) -> &str { &self.update }
    pub fn delete_sql(&self) -> &str { &self.delete }

    /// A fresh, empty record of this type.
    pub fn record(self: &Arc<Self>) -> Record {
        Record::new(self)
    }

    /// Looks a record up by primary key. `Ok(None)` when no row matches.
    pub async fn find(
        self: &Arc<Self>,
        db: &Database,
        pk: impl Into<Value>,
    ) -> Result<Option<Record>, OrmError> {
        let sql = format!("{} where {}=?", self.select, quoted(&self.primary_key));
        let mut rows = db.select(&sql, &[pk.into()], Some(1)).await?;
        Ok(rows.pop().map(|row| Record::from_row(self, row)))
    }

    pub async fn find_all(
        self: &Arc<Self>,
        db: &Database,
        query: FindAll,
    ) -> Result<Vec<Record>, OrmError> {
        let (sql, args) = query.build(&self.select);
        let rows = db.select(&sql, &args, None).await?;
        Ok(rows.into_iter().map(|row| Record::from_row(self, row)).collect())
    }

    /// Runs `select <expr> _num_ from <table> [where ...]` and returns the
    /// single scalar, or `None` when no row comes back.
    pub async fn find_number(
        &self,
        db: &Database,
        select_expr: &str,
        where_clause: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, OrmError> {
        let sql = self.number_sql(select_expr, where_clause);
        let mut rows = db.select(&sql, args, Some(1)).await?;
        Ok(rows.pop().and_then(|mut row| row.remove("_num_")))
    }

    fn number_sql(&self, select_expr: &str, where_clause: Option<&str>) -> String {
        let mut sql = format!("select {select_expr} _num_ from {}", quoted(&self.table));
        if let Some(w) = where_clause.filter(|w| !w.is_empty()) {
            sql.push_str(" where ");
            sql.push_str(w);
        }
        sql
    }
}

// ── Limit ─────────────────────────────────────────────────────────────────────

/// The `limit` clause of [`FindAll`]: a row count, or an `(offset, count)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Range(u64, u64),
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self { Self::Count(n) }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self { Self::Range(offset, count) }
}

/// Accepts a number or a two-element array of numbers; any other shape is
/// an [`OrmError::InvalidArgument`].
impl TryFrom<&Value> for Limit {
    type Error = OrmError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let invalid = || OrmError::InvalidArgument(format!("Invalid limit value: {value}"));
        match value {
            Value::Number(n) => n.as_u64().map(Limit::Count).ok_or_else(invalid),
            Value::Array(pair) if pair.len() == 2 => match (pair[0].as_u64(), pair[1].as_u64()) {
                (Some(offset), Some(count)) => Ok(Limit::Range(offset, count)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

// ── FindAll ───────────────────────────────────────────────────────────────────

/// Optional clauses for [`Schema::find_all`].
///
/// ```rust
/// use weblog::orm::{FindAll, Limit};
///
/// let query = FindAll::new()
///     .filter("`user_id`=?", ["u1".into()])
///     .order_by("`created_at` desc")
///     .limit(Limit::Range(10, 5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FindAll {
    where_clause: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, clause: &str, args: impl IntoIterator<Item = Value>) -> Self {
        self.where_clause = Some(clause.to_owned());
        self.args = args.into_iter().collect();
        self
    }

    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_by = Some(clause.to_owned());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Appends the clauses to `select`, returning the statement and its
    /// bound arguments in placeholder order.
    pub fn build(self, select: &str) -> (String, Vec<Value>) {
        let mut sql = vec![select.to_owned()];
        let mut args = self.args;
        if let Some(w) = self.where_clause.filter(|w| !w.is_empty()) {
            sql.push("where".to_owned());
            sql.push(w);
        }
        if let Some(o) = self.order_by.filter(|o| !o.is_empty()) {
            sql.push("order by".to_owned());
            sql.push(o);
        }
        match self.limit {
            Some(Limit::Count(n)) => {
                sql.push("limit ?".to_owned());
                args.push(Value::from(n));
            }
            Some(Limit::Range(offset, count)) => {
                sql.push("limit ?, ?".to_owned());
                args.push(Value::from(offset));
                args.push(Value::from(count));
            }
            None => {}
        }
        (sql.join(" "), args)
    }
}
