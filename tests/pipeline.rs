use async_trait::async_trait;
use http::Method as HttpMethod;
use serde_json::{Value, json};
use weblog::middleware::{Middleware, Next};
use weblog::{
    ApiError, App, Args, HandlerResult, Reply, Request, Response, Router, Signature, Status,
    get, post,
};

async fn hello(_: (), args: Args) -> HandlerResult {
    Ok(format!("<h1>hello, {}</h1>", args.str("name").unwrap_or("world")).into())
}

async fn echo(_: (), args: Args) -> HandlerResult {
    Ok(Value::Object(args.values().clone()).into())
}

async fn teapot(_: (), _: Args) -> HandlerResult {
    Ok((418, "short and stout").into())
}

async fn gone(_: (), _: Args) -> HandlerResult {
    Ok(Status::NotFound.into())
}

async fn bounce(_: (), _: Args) -> HandlerResult {
    Ok("redirect:/signin".into())
}

async fn refuse(_: (), _: Args) -> HandlerResult {
    Err(ApiError::permission("Please signin first.").into())
}

async fn whoami(_: (), args: Args) -> HandlerResult {
    let path = args.request().map(|r| r.path().to_owned()).unwrap_or_default();
    Ok(json!({ "path": path, "id": args.get("id") }).into())
}

fn app() -> App<()> {
    let router = Router::new()
        .routes([
            get("/hello/{name}", hello).signature(Signature::new().positional("name")),
            post("/echo", echo).signature(Signature::new().keyword("text")),
            get("/search", echo).signature(Signature::new().optional("q").var_keyword("rest")),
            get("/teapot", teapot),
            get("/gone", gone),
            get("/bounce", bounce),
            post("/refuse", refuse),
            get("/items/{id}", whoami).signature(Signature::new().positional("id").request()),
        ])
        .unwrap();
    App::new(router, ())
}

fn json_body(r: &Response) -> Value {
    serde_json::from_slice(r.body()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request {
    Request::builder(HttpMethod::POST, uri)
        .header("content-type", "application/json")
        .body(body.to_string())
        .build()
}

#[tokio::test]
async fn path_parameter_reaches_handler() {
    let r = app().handle(Request::builder(HttpMethod::GET, "/hello/bob").build()).await;
    assert_eq!(r.status_code(), 200);
    assert_eq!(r.header("content-type"), Some("text/html;charset=utf-8"));
    assert_eq!(r.body(), b"<h1>hello, bob</h1>");
}

#[tokio::test]
async fn path_parameter_is_percent_decoded() {
    let r = app().handle(Request::builder(HttpMethod::GET, "/hello/bob%20smith").build()).await;
    assert_eq!(r.status_code(), 200);
    assert_eq!(r.body(), b"<h1>hello, bob smith</h1>");
}

#[tokio::test]
async fn json_body_is_narrowed_to_declared_keywords() {
    let r = app().handle(post_json("/echo", json!({"text": "hi", "extra": 1}))).await;
    assert_eq!(r.status_code(), 200);
    assert_eq!(r.header("content-type"), Some("application/json;charset=utf-8"));
    assert_eq!(json_body(&r), json!({"text": "hi"}));
}

#[tokio::test]
async fn form_body_binds() {
    let req = Request::builder(HttpMethod::POST, "/echo")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("text=hello+there&text=ignored")
        .build();
    let r = app().handle(req).await;
    assert_eq!(json_body(&r), json!({"text": "hello there"}));
}

#[tokio::test]
async fn body_problems_are_bad_requests() {
    let cases = [
        (Request::builder(HttpMethod::POST, "/echo").body("x").build(), "Missing Content-Type."),
        (
            Request::builder(HttpMethod::POST, "/echo").header("content-type", "text/xml").body("x").build(),
            "Unsupported Content-Type: text/xml",
        ),
        (post_json("/echo", json!([1, 2])), "JSON body must be object."),
        (post_json("/echo", json!({"other": 1})), "Missing argument: text"),
    ];
    let app = app();
    for (req, message) in cases {
        let r = app.handle(req).await;
        assert_eq!(r.status_code(), 400, "{message}");
        assert_eq!(r.body(), message.as_bytes());
    }
}

#[tokio::test]
async fn get_query_with_catch_all() {
    let r = app().handle(Request::builder(HttpMethod::GET, "/search?q=rust&page=2&q=go").build()).await;
    assert_eq!(json_body(&r), json!({"q": "rust", "page": "2"}));
}

#[tokio::test]
async fn request_is_injected_next_to_path_params() {
    let r = app().handle(Request::builder(HttpMethod::GET, "/items/42").build()).await;
    assert_eq!(json_body(&r), json!({"path": "/items/42", "id": "42"}));
}

#[tokio::test]
async fn reply_shapes_are_coerced() {
    let app = app();

    let r = app.handle(Request::builder(HttpMethod::GET, "/teapot").build()).await;
    assert_eq!(r.status_code(), 418);
    assert_eq!(r.body(), b"short and stout");

    let r = app.handle(Request::builder(HttpMethod::GET, "/gone").build()).await;
    assert_eq!(r.status_code(), 404);

    let r = app.handle(Request::builder(HttpMethod::GET, "/bounce").build()).await;
    assert_eq!(r.status_code(), 302);
    assert_eq!(r.header("location"), Some("/signin"));
}

#[tokio::test]
async fn api_errors_become_json_payloads() {
    let r = app().handle(post_json("/refuse", json!({}))).await;
    assert_eq!(r.status_code(), 200);
    assert_eq!(
        json_body(&r),
        json!({"error": "permission:forbidden", "data": "permission", "message": "Please signin first."})
    );
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let app = app();
    let r = app.handle(Request::builder(HttpMethod::GET, "/nowhere").build()).await;
    assert_eq!(r.status_code(), 404);
    let r = app.handle(Request::builder(HttpMethod::POST, "/hello/bob").build()).await;
    assert_eq!(r.status_code(), 404);
    let r = app.handle(Request::builder(HttpMethod::PUT, "/hello/bob").build()).await;
    assert_eq!(r.status_code(), 405);
}

struct Deny;

#[async_trait]
impl Middleware for Deny {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        if req.path().starts_with("/hello/") {
            return Response::status(Status::Forbidden);
        }
        next.run(req).await
    }
}

#[tokio::test]
async fn middleware_can_short_circuit() {
    let app = app().layer(Deny);
    let r = app.handle(Request::builder(HttpMethod::GET, "/hello/bob").build()).await;
    assert_eq!(r.status_code(), 403);
    let r = app.handle(Request::builder(HttpMethod::GET, "/teapot").build()).await;
    assert_eq!(r.status_code(), 418);
}

#[test]
fn unusable_routes_are_rejected_at_registration() {
    let missing = Router::<()>::new().route(weblog::Route::new(hello));
    assert!(matches!(missing, Err(weblog::RouteError::MissingMetadata(_))));

    let bad = Router::<()>::new()
        .route(get("/x", hello).signature(Signature::new().request().positional("id")));
    assert!(matches!(bad, Err(weblog::RouteError::InvalidHandlerSignature(_))));
}

#[test]
fn reply_conversions() {
    assert!(matches!(Reply::from(204i32), Reply::Value(_)));
    assert!(matches!(Reply::from(vec![1u8]), Reply::Bytes(_)));
}
