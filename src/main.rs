mod catalog;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use catalog::DemoCatalog;
use config::AppConfig;
use db::Database;
use dotenv::dotenv;
use handlers::AppContext;
use std::io;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use utils::auth::TokenService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::api::health,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::posts::list_posts,
        handlers::posts::get_post,
        handlers::posts::create_post,
        handlers::posts::delete_post,
    ),
    components(
        schemas(
            handlers::api::HealthResponse,
            handlers::api::HealthChecks,
            handlers::auth::SignupRequest,
            handlers::auth::LoginRequest,
            handlers::auth::AuthResponse,
            handlers::posts::CreatePostRequest,
            handlers::posts::PostResponse,
            handlers::posts::AuthorSummary,
            handlers::posts::PostView,
            handlers::posts::MessageResponse,
            handlers::RouteNotFound,
            catalog::DemoPost,
            error::ErrorBody,
            models::user::Claims,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Authentication", description = "Signup and login"),
        (name = "Posts", description = "Blog posts; creating and deleting require a bearer token")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /auth/signup or /auth/login"))
                        .build(),
                ),
            );
        }
    }
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
        ])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing subscriber for structured logging
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json()
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database = Database::new(&config.db_path).map_err(|e| {
        error!(error = %e, db_path = %config.db_path, "Failed to open database");
        io::Error::other(e)
    })?;
    info!(db_path = %config.db_path, "Database initialized");

    let catalog = DemoCatalog::builtin();
    info!(demo_posts = catalog.len(), "Demo catalog loaded");

    let context = AppContext::new(
        database,
        TokenService::new(&config.jwt_secret),
        catalog,
        config.request_timeout,
        config.uses_default_secret(),
    );

    let bind_address = config.bind_address();

    info!(bind_address = %bind_address, "Starting blog API server");
    info!("Available endpoints:");
    info!("   GET    /health        - Health check (public)");
    info!("   POST   /auth/signup   - Register new user (public)");
    info!("   POST   /auth/login    - Login user (public)");
    info!("   GET    /posts         - List posts (public)");
    info!("   GET    /posts/{{id}}    - Get post or demo post (public)");
    info!("   POST   /posts         - Create post (protected)");
    info!("   DELETE /posts/{{id}}    - Delete own post (protected)");
    info!(
        swagger_url = format!("http://{}/swagger-ui/", bind_address),
        "Swagger UI available"
    );

    let cors_origins = config.cors_origins.clone();

    HttpServer::new(move || {
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(Compress::default())
            .wrap(middleware::headers::security_headers())
            .wrap(build_cors(&cors_origins))
            .wrap(TracingLogger::default())
            // Swagger UI
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(context.clone().configure())
            .default_service(web::to(handlers::not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}
