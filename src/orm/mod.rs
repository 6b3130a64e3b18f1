//! Micro-ORM: declarative fields, derived schemas, mapped records and the
//! SQL executor they run through.
//!
//! ```rust,no_run
//! use weblog::orm::{Database, DbConfig, Field, FindAll, Schema};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let users = Schema::define("users", vec![
//!     Field::string("id").primary_key().ddl("varchar(50)"),
//!     Field::string("email").ddl("varchar(50)"),
//!     Field::boolean("admin"),
//! ])?;
//!
//! let db = Database::connect(&DbConfig::default()).await?;
//!
//! let mut alice = users.record().with("id", "1").with("email", "alice@example.com");
//! alice.save(&db).await?;
//!
//! let found = users.find(&db, "1").await?;
//! let admins = users.find_all(&db, FindAll::new().filter("`admin`=?", [true.into()])).await?;
//! # Ok(())
//! # }
//! ```

mod db;
mod field;
mod record;
mod schema;

pub use db::{Database, DbConfig, Row};
pub use field::{Field, FieldDefault};
pub use record::Record;
pub use schema::{FindAll, Limit, Schema};
