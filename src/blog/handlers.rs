//! Page and API handlers.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::info;

use super::AppState;
use super::models::User;
use super::page::{PAGE_SIZE, Page};
use super::session::{COOKIE_MAX_AGE, hash_password, user_to_cookie};
use crate::binder::Signature;
use crate::coerce::Reply;
use crate::error::OrmError;
use crate::handler::{ApiError, Args, HandlerResult};
use crate::orm::{FindAll, Record, Schema};
use crate::response::{ContentType, Response};
use crate::router::{Route, get, post};
use crate::status::Status;

/// Every route the blog serves.
pub fn routes() -> Vec<Route<AppState>> {
    let id = || Signature::new().positional("id");
    let editable = || id().request().keyword("name").keyword("summary").keyword("content");
    vec![
        get("/", index),
        get("/signin", signin),
        get("/register", register),
        get("/signout", signout).signature(Signature::new().request()),
        post("/api/authenticate", authenticate)
            .signature(Signature::new().keyword("email").keyword("passwd")),
        get("/api/users", api_get_users).signature(Signature::new().optional("page")),
        post("/api/users", api_register_user)
            .signature(Signature::new().keyword("email").keyword("name").keyword("passwd")),
        get("/api/blogs", api_blogs).signature(Signature::new().optional("page")),
        get("/api/blogs/{id}", api_get_blog).signature(id()),
        post("/api/blogs", api_create_blog).signature(
            Signature::new().request().keyword("name").keyword("summary").keyword("content"),
        ),
        post("/api/blogs/{id}", api_update_blog).signature(editable()),
        post("/api/blogs/{id}/delete", api_delete_blog).signature(id().request()),
        get("/api/blogs/{id}/comments", api_comments).signature(id()),
        post("/api/blogs/{id}/comments", api_create_comment)
            .signature(id().request().keyword("content")),
        get("/blog/{id}", get_blog).signature(id()),
        get("/manage/blogs", manage_blogs).signature(Signature::new().optional("page")),
    ]
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn page_index(args: &Args) -> u64 {
    args.int("page").filter(|&p| p > 0).map_or(1, |p| p as u64)
}

fn check_admin(args: &Args) -> Result<(), ApiError> {
    match args.user() {
        Some(u) if u.admin => Ok(()),
        _ => Err(ApiError::permission("Admin only.")),
    }
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else { return false };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() > 1
        && domain.split('.').all(|p| !p.is_empty())
        && !email.chars().any(char::is_whitespace)
}

/// A user row without its password hash.
fn public_user(record: Record) -> Value {
    let mut values = record.into_values();
    values.insert("passwd".to_owned(), Value::from("******"));
    Value::Object(values)
}

fn template(name: &str, mut values: Map<String, Value>) -> Reply {
    values.insert("__template__".to_owned(), Value::from(name));
    Reply::Value(Value::Object(values))
}

async fn paged(
    state: &AppState,
    schema: &Arc<Schema>,
    index: u64,
) -> Result<(Page, Vec<Record>), OrmError> {
    let count = schema
        .find_number(&state.db, "count(id)", None, &[])
        .await?
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let page = Page::new(count, index, PAGE_SIZE);
    if page.limit == 0 {
        return Ok((page, Vec::new()));
    }
    let rows = schema
        .find_all(&state.db, FindAll::new().order_by("created_at desc").limit((page.offset, page.limit)))
        .await?;
    Ok((page, rows))
}

/// JSON body of `user` with a fresh session cookie attached.
fn signed_in(state: &AppState, user: &User) -> HandlerResult {
    let cookie = user_to_cookie(user, COOKIE_MAX_AGE, &state.secret);
    let mut body = user.clone();
    body.passwd = "******".to_owned();
    let body = serde_json::to_vec(&body).map_err(OrmError::from)?;
    Ok(Response::builder()
        .header(
            "set-cookie",
            &format!("{}={cookie}; Max-Age={COOKIE_MAX_AGE}; Path=/; HttpOnly", state.cookie_name),
        )
        .bytes(ContentType::Json, body)
        .into())
}

// ── Pages ────────────────────────────────────────────────────────────────────

async fn index(state: AppState, _: Args) -> HandlerResult {
    let users = state.models.users.find_all(&state.db, FindAll::new()).await?;
    let mut values = Map::new();
    values.insert("users".to_owned(), users.into_iter().map(public_user).collect());
    Ok(template("test.html", values))
}

async fn signin(_: AppState, _: Args) -> HandlerResult {
    Ok(template("signin.html", Map::new()))
}

async fn register(_: AppState, _: Args) -> HandlerResult {
    Ok(template("register.html", Map::new()))
}

async fn signout(state: AppState, args: Args) -> HandlerResult {
    let referer = args.request().and_then(|r| r.header("referer")).unwrap_or("/");
    info!("user signed out");
    Ok(Response::builder()
        .status(Status::Found)
        .header("location", referer)
        .header("set-cookie", &format!("{}=-deleted-; Max-Age=0; Path=/; HttpOnly", state.cookie_name))
        .no_body()
        .into())
}

async fn get_blog(state: AppState, args: Args) -> HandlerResult {
    let id = args.require("id")?;
    let Some(blog) = state.models.blogs.find(&state.db, id).await? else {
        return Ok(Status::NotFound.into());
    };
    let comments = state.models.comments
        .find_all(&state.db, FindAll::new().filter("`blog_id`=?", [Value::from(id)]).order_by("created_at desc"))
        .await?;
    let mut values = Map::new();
    values.insert("blog".to_owned(), blog.into());
    values.insert("comments".to_owned(), comments.into_iter().map(Value::from).collect());
    Ok(template("blog.html", values))
}

async fn manage_blogs(_: AppState, args: Args) -> HandlerResult {
    let mut values = Map::new();
    values.insert("page_index".to_owned(), page_index(&args).into());
    Ok(template("manage_blogs.html", values))
}

// ── Users ────────────────────────────────────────────────────────────────────

async fn authenticate(state: AppState, args: Args) -> HandlerResult {
    let email = args.require("email")?.to_lowercase();
    let passwd = args.require("passwd")?;
    let found = state.models.users
        .find_all(&state.db, FindAll::new().filter("`email`=?", [Value::from(email.as_str())]))
        .await?;
    let Some(record) = found.into_iter().next() else {
        return Err(ApiError::invalid("email", "Email not exist.").into());
    };
    let user: User = record.decode()?;
    if user.passwd != hash_password(&user.id, passwd) {
        return Err(ApiError::invalid("passwd", "Invalid password.").into());
    }
    info!(email = %user.email, "user signed in");
    signed_in(&state, &user)
}

async fn api_get_users(state: AppState, args: Args) -> HandlerResult {
    let (page, users) = paged(&state, &state.models.users, page_index(&args)).await?;
    let users: Vec<Value> = users.into_iter().map(public_user).collect();
    Ok(json!({ "page": page, "users": users }).into())
}

async fn api_register_user(state: AppState, args: Args) -> HandlerResult {
    let name = args.require("name")?;
    let email = args.require("email")?.to_lowercase();
    let passwd = args.require("passwd")?;
    if !valid_email(&email) {
        return Err(ApiError::invalid("email", "").into());
    }
    let taken = state.models.users
        .find_all(&state.db, FindAll::new().filter("`email`=?", [Value::from(email.as_str())]))
        .await?;
    if !taken.is_empty() {
        return Err(ApiError::new("register:failed", "email", "Email is already in use.").into());
    }

    let mut record = state.models.users.record();
    let uid = record.get_or_default("id").unwrap_or_default();
    let uid = uid.as_str().unwrap_or_default().to_owned();
    record
        .set("name", name)
        .set("email", email.as_str())
        .set("passwd", hash_password(&uid, passwd))
        .set("image", "about:blank");
    record.save(&state.db).await?;
    let user: User = record.decode()?;
    signed_in(&state, &user)
}

// ── Blogs ────────────────────────────────────────────────────────────────────

async fn api_blogs(state: AppState, args: Args) -> HandlerResult {
    let (page, blogs) = paged(&state, &state.models.blogs, page_index(&args)).await?;
    let blogs: Vec<Value> = blogs.into_iter().map(Value::from).collect();
    Ok(json!({ "page": page, "blogs": blogs }).into())
}

async fn api_get_blog(state: AppState, args: Args) -> HandlerResult {
    let id = args.require("id")?;
    Ok(match state.models.blogs.find(&state.db, id).await? {
        Some(blog) => Value::from(blog).into(),
        None => Status::NotFound.into(),
    })
}

async fn api_create_blog(state: AppState, args: Args) -> HandlerResult {
    check_admin(&args)?;
    let name = args.require("name")?;
    let summary = args.require("summary")?;
    let content = args.require("content")?;
    let Some(user) = args.user() else {
        return Err(ApiError::permission("Please signin first.").into());
    };

    let mut blog = state.models.blogs.record()
        .with("user_id", user.id.as_str())
        .with("user_name", user.name.as_str())
        .with("user_image", user.image.as_str())
        .with("name", name)
        .with("summary", summary)
        .with("content", content);
    blog.save(&state.db).await?;
    Ok(Value::from(blog).into())
}

async fn api_update_blog(state: AppState, args: Args) -> HandlerResult {
    check_admin(&args)?;
    let id = args.require("id")?;
    let name = args.require("name")?;
    let summary = args.require("summary")?;
    let content = args.require("content")?;
    let Some(mut blog) = state.models.blogs.find(&state.db, id).await? else {
        return Err(ApiError::not_found("blog", "Blog not found.").into());
    };
    blog.set("name", name).set("summary", summary).set("content", content);
    blog.update(&state.db).await?;
    Ok(Value::from(blog).into())
}

async fn api_delete_blog(state: AppState, args: Args) -> HandlerResult {
    check_admin(&args)?;
    let id = args.require("id")?;
    let Some(blog) = state.models.blogs.find(&state.db, id).await? else {
        return Err(ApiError::not_found("blog", "Blog not found.").into());
    };
    blog.remove(&state.db).await?;
    Ok(json!({ "id": id }).into())
}

// ── Comments ─────────────────────────────────────────────────────────────────

async fn api_comments(state: AppState, args: Args) -> HandlerResult {
    let id = args.require("id")?;
    let comments = state.models.comments
        .find_all(&state.db, FindAll::new().filter("`blog_id`=?", [Value::from(id)]).order_by("created_at desc"))
        .await?;
    let comments: Vec<Value> = comments.into_iter().map(Value::from).collect();
    Ok(json!({ "comments": comments }).into())
}

async fn api_create_comment(state: AppState, args: Args) -> HandlerResult {
    let Some(user) = args.user() else {
        return Err(ApiError::permission("Please signin first.").into());
    };
    let id = args.require("id")?;
    let content = args.require("content")?;
    if state.models.blogs.find(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found("blog", "Blog not found.").into());
    }

    let mut comment = state.models.comments.record()
        .with("blog_id", id)
        .with("user_id", user.id.as_str())
        .with("user_name", user.name.as_str())
        .with("user_image", user.image.as_str())
        .with("content", content);
    comment.save(&state.db).await?;
    Ok(Value::from(comment).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(valid_email("a@b.io"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("@b.io"));
        assert!(!valid_email("a b@c.io"));
        assert!(!valid_email("a@@c.io"));
    }

    #[test]
    fn every_route_has_metadata() {
        for route in routes() {
            let text = format!("{route:?}");
            assert!(text.contains('/'), "{text}");
        }
    }
}
