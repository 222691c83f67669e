use anyhow::Result;
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use tailor_storefront::{
    app_state::AppState,
    bootstrap::{self, bootstrap},
    config, db, routes, swagger,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let state = AppState::new(config);

    let routes = routes::health::routes_with_openapi()
        .merge(routes::session::routes_with_openapi())
        .merge(routes::products::routes_with_openapi())
        .merge(routes::fabrics::routes_with_openapi())
        .merge(routes::services::routes_with_openapi())
        .merge(routes::customers::profile::routes_with_openapi(state.clone()))
        .merge(routes::customers::orders::routes_with_openapi(state.clone()))
        .merge(routes::admin::routes_with_openapi(state.clone()));

    let (routes, mut openapi) = routes.split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Tailor Storefront API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    let app = Router::new().merge(routes).merge(swagger_ui);

    tracing::info!("Bootstrapping...");
    bootstrap("Storefront", app, state).await?;
    Ok(())
}
