use std::io;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use weblog::OrmError;
use weblog::orm::{Database, DbConfig, Field, FindAll, Schema};

// One connection, so every statement sees the same in-memory database.
async fn memory_db(autocommit: bool) -> Database {
    let config = DbConfig {
        url: Some("sqlite::memory:".to_owned()),
        autocommit,
        min_size: 1,
        max_size: 1,
        ..DbConfig::default()
    };
    let db = Database::connect(&config).await.unwrap();
    db.execute(
        "create table `users` (`id` varchar(50) primary key, `name` varchar(50) not null, \
         `email` varchar(50) not null, `admin` bool not null, `score` real not null)",
        &[],
        true,
    )
    .await
    .unwrap();
    db
}

fn users() -> Arc<Schema> {
    Schema::define("users", vec![
        Field::string("id").primary_key().ddl("varchar(50)"),
        Field::string("name"),
        Field::string("email"),
        Field::boolean("admin"),
        Field::float("score"),
    ])
    .unwrap()
}

async fn seed(db: &Database, schema: &Arc<Schema>, id: &str, name: &str) {
    schema
        .record()
        .with("id", id)
        .with("name", name)
        .with("email", format!("{name}@example.com"))
        .save(db)
        .await
        .unwrap();
}

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl Captured {
    fn take(&self) -> String {
        String::from_utf8(std::mem::take(&mut *self.0.lock().unwrap())).unwrap()
    }
}

fn capture_warnings() -> (Captured, tracing::subscriber::DefaultGuard) {
    let logs = Captured::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

async fn count(db: &Database, schema: &Arc<Schema>) -> i64 {
    schema
        .find_number(db, "count(id)", None, &[])
        .await
        .unwrap()
        .and_then(|v| v.as_i64())
        .unwrap()
}

#[tokio::test]
async fn save_then_find() {
    let db = memory_db(true).await;
    let schema = users();
    seed(&db, &schema, "1", "alice").await;

    let found = schema.find(&db, "1").await.unwrap().unwrap();
    assert_eq!(found.str("name"), Some("alice"));
    assert_eq!(found.str("email"), Some("alice@example.com"));
    // defaults were written on insert
    assert!(found.get("admin").is_some());
    assert!(found.get("score").is_some());
}

#[tokio::test]
async fn boolean_columns_read_back() {
    let db = memory_db(true).await;
    let schema = users();
    schema
        .record()
        .with("id", "1")
        .with("name", "root")
        .with("email", "root@example.com")
        .with("admin", true)
        .save(&db)
        .await
        .unwrap();
    seed(&db, &schema, "2", "guest").await;

    let truthy = |v: Option<&Value>| matches!(v, Some(Value::Bool(true))) || v.and_then(Value::as_i64) == Some(1);
    let root = schema.find(&db, "1").await.unwrap().unwrap();
    assert!(truthy(root.get("admin")));
    let guest = schema.find(&db, "2").await.unwrap().unwrap();
    assert!(!truthy(guest.get("admin")));

    let admins = schema
        .find_all(&db, FindAll::new().filter("`admin`=?", [json!(true)]))
        .await
        .unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].str("name"), Some("root"));
}

#[tokio::test]
async fn find_missing_is_none() {
    let db = memory_db(true).await;
    assert!(users().find(&db, "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn find_is_repeatable() {
    let db = memory_db(true).await;
    let schema = users();
    seed(&db, &schema, "1", "alice").await;
    let a = schema.find(&db, "1").await.unwrap().unwrap();
    let b = schema.find(&db, "1").await.unwrap().unwrap();
    assert_eq!(a.values(), b.values());
}

#[tokio::test]
async fn find_all_filters_orders_and_limits() {
    let db = memory_db(true).await;
    let schema = users();
    for (id, name) in [("1", "carol"), ("2", "alice"), ("3", "bob")] {
        seed(&db, &schema, id, name).await;
    }

    let all = schema.find_all(&db, FindAll::new().order_by("name")).await.unwrap();
    let names: Vec<_> = all.iter().filter_map(|r| r.str("name")).collect();
    assert_eq!(names, ["alice", "bob", "carol"]);

    let one = schema
        .find_all(&db, FindAll::new().filter("`name`=?", [json!("bob")]))
        .await
        .unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].str("id"), Some("3"));

    let first = schema.find_all(&db, FindAll::new().order_by("name").limit(1)).await.unwrap();
    assert_eq!(first[0].str("name"), Some("alice"));

    let second = schema
        .find_all(&db, FindAll::new().order_by("name").limit((1, 1)))
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].str("name"), Some("bob"));
}

#[tokio::test]
async fn find_number_counts_with_and_without_filter() {
    let db = memory_db(true).await;
    let schema = users();
    assert_eq!(count(&db, &schema).await, 0);
    seed(&db, &schema, "1", "alice").await;
    seed(&db, &schema, "2", "bob").await;
    assert_eq!(count(&db, &schema).await, 2);

    let n = schema
        .find_number(&db, "count(id)", Some("`name`=?"), &[json!("bob")])
        .await
        .unwrap();
    assert_eq!(n.and_then(|v| v.as_i64()), Some(1));
}

#[tokio::test]
async fn update_and_remove() {
    let db = memory_db(true).await;
    let schema = users();
    seed(&db, &schema, "1", "alice").await;

    let mut r = schema.find(&db, "1").await.unwrap().unwrap();
    r.set("name", "alicia");
    r.update(&db).await.unwrap();
    let again = schema.find(&db, "1").await.unwrap().unwrap();
    assert_eq!(again.str("name"), Some("alicia"));

    again.remove(&db).await.unwrap();
    assert!(schema.find(&db, "1").await.unwrap().is_none());
}

#[tokio::test]
async fn writes_that_touch_no_row_are_not_errors() {
    let db = memory_db(true).await;
    let schema = users();
    let (logs, _guard) = capture_warnings();

    let ghost = schema
        .record()
        .with("id", "ghost")
        .with("name", "x")
        .with("email", "x")
        .with("admin", false)
        .with("score", 0.0);
    ghost.update(&db).await.unwrap();
    let out = logs.take();
    assert!(out.contains("WARN"), "{out}");
    assert!(out.contains("failed to update by primary key: affected rows mismatch"), "{out}");

    ghost.remove(&db).await.unwrap();
    let out = logs.take();
    assert!(out.contains("failed to remove by primary key: affected rows mismatch"), "{out}");
    assert_eq!(count(&db, &schema).await, 0);

    // an insert the database silently drops
    db.execute(
        "create trigger `skip_ghosts` before insert on `users` when new.`name` = 'skip' \
         begin select raise(ignore); end",
        &[],
        true,
    )
    .await
    .unwrap();
    let mut skipped = schema.record().with("id", "s").with("name", "skip").with("email", "s");
    skipped.save(&db).await.unwrap();
    let out = logs.take();
    assert!(out.contains("failed to insert record: affected rows mismatch"), "{out}");
    assert_eq!(count(&db, &schema).await, 0);

    seed(&db, &schema, "1", "alice").await;
    assert!(logs.take().is_empty());
}

#[tokio::test]
async fn failed_write_in_transaction_rolls_back() {
    let db = memory_db(false).await;
    let schema = users();
    seed(&db, &schema, "1", "alice").await;

    let mut dup = schema.record().with("id", "1").with("name", "bob").with("email", "b");
    let err = dup.save(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::Storage(_)));

    assert_eq!(count(&db, &schema).await, 1);
    let kept = schema.find(&db, "1").await.unwrap().unwrap();
    assert_eq!(kept.str("name"), Some("alice"));
}

#[tokio::test]
async fn select_honours_row_limit() {
    let db = memory_db(true).await;
    let schema = users();
    for id in ["1", "2", "3"] {
        seed(&db, &schema, id, "n").await;
    }
    let rows = db.select("select `id` from `users`", &[], Some(2)).await.unwrap();
    assert_eq!(rows.len(), 2);
    let rows = db.select("select `id` from `users`", &[], Some(0)).await.unwrap();
    assert!(rows.is_empty());
    let rows = db.select("select `id` from `users` where `id`=?", &[Value::from("3")], None).await.unwrap();
    assert_eq!(rows[0]["id"], json!("3"));
}
