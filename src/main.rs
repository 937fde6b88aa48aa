use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod auth;
mod config;
mod docs;
mod model;
mod models;
mod routes;
mod store;
mod utils;

use config::Config;

use crate::api::payroll::FinalizeLock;
use crate::auth::handlers::bootstrap_admin;
use crate::auth::refresh_registry::RefreshRegistry;
use crate::docs::ApiDoc;
use crate::store::{SheetStore, init_store};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR Sheet is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = %config.sheets_backend, "Server starting...");

    let store = init_store(&config).await?;
    bootstrap_admin(store.as_ref(), &config).await?;

    let store: Data<dyn SheetStore> = Data::from(store);
    let registry = Data::new(RefreshRegistry::new(config.refresh_token_ttl));
    let finalize_lock = Data::new(FinalizeLock::default());
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets match
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .app_data(Data::new(config.clone()))
            .app_data(registry.clone())
            .app_data(finalize_lock.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
