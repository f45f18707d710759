use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use hr_attendance::{
    config::Config, db::init_db, docs::ApiDoc, routes, seed::seed_default_accounts,
    state::AppState,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    let state = AppState::new(pool, config.clone())?;

    seed_default_accounts(&state.credentials, &config)
        .await
        .context("Failed to seed default accounts")?;

    // the filter must hold every existing name before the first registration
    let loaded = state
        .credentials
        .warmup()
        .await
        .context("Failed to warmup username filter")?;
    info!(usernames = loaded, "Username filter ready");

    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, "Listening");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .configure(|cfg| state.register_data(cfg))
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await
    .context("Server error")
}
