use weblog::blog::{self, AppState, Models};
use weblog::config::AppConfig;
use weblog::orm::Database;
use weblog::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weblog=info".into()),
        )
        .init();

    let db = Database::connect(&config.db).await?;

    let state = AppState {
        db,
        models: Models::define()?,
        secret: config.session_secret.clone(),
        cookie_name: config.session_cookie.clone(),
    };
    let app = blog::app(state, &config.template_dir, &config.static_dir)?;

    Server::bind(config.addr).serve(app).await?;
    Ok(())
}
