//! Users, blogs and comments.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::SchemaError;
use crate::orm::{Field, Schema};

/// Time-ordered id: 15-digit millisecond timestamp, uuid4 hex, `000`.
pub fn next_id() -> String {
    format!("{:015}{}000", Utc::now().timestamp_millis(), Uuid::new_v4().simple())
}

/// Current UNIX time in seconds, as stored in `created_at`.
pub fn now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn id_field() -> Field {
    Field::string("id")
        .primary_key()
        .ddl("varchar(50)")
        .default_with(|| Value::from(next_id()))
}

fn created_at() -> Field {
    Field::float("created_at").default_with(|| Value::from(now()))
}

/// Schemas of the three blog tables, defined once at startup.
#[derive(Clone, Debug)]
pub struct Models {
    pub users: Arc<Schema>,
    pub blogs: Arc<Schema>,
    pub comments: Arc<Schema>,
}

impl Models {
    pub fn define() -> Result<Self, SchemaError> {
        Ok(Self {
            users: Schema::define("users", vec![
                id_field(),
                Field::string("email").ddl("varchar(50)"),
                Field::string("passwd").ddl("varchar(64)"),
                Field::boolean("admin"),
                Field::string("name").ddl("varchar(50)"),
                Field::string("image").ddl("varchar(500)"),
                created_at(),
            ])?,
            blogs: Schema::define("blogs", vec![
                id_field(),
                Field::string("user_id").ddl("varchar(50)"),
                Field::string("user_name").ddl("varchar(50)"),
                Field::string("user_image").ddl("varchar(500)"),
                Field::string("name").ddl("varchar(50)"),
                Field::string("summary").ddl("varchar(200)"),
                Field::text("content"),
                created_at(),
            ])?,
            comments: Schema::define("comments", vec![
                id_field(),
                Field::string("blog_id").ddl("varchar(50)"),
                Field::string("user_id").ddl("varchar(50)"),
                Field::string("user_name").ddl("varchar(50)"),
                Field::string("user_image").ddl("varchar(500)"),
                Field::text("content"),
                created_at(),
            ])?,
        })
    }
}

/// MySQL hands booleans back as `0`/`1`.
fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

/// Typed view of a `users` row.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub passwd: String,
    #[serde(deserialize_with = "flag", default)]
    pub admin: bool,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub created_at: f64,
}
