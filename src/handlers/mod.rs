pub mod api;
pub mod auth;
pub mod posts;

use crate::catalog::DemoCatalog;
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthMiddleware;
use crate::utils::auth::TokenService;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Upper bound on the store and hashing work a single request may wait for.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline(pub Duration);

impl RequestDeadline {
    pub async fn run<F, T>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = T>,
    {
        actix_web::rt::time::timeout(self.0, fut).await.map_err(|_| {
            error!(timeout_ms = self.0.as_millis() as u64, "Request deadline exceeded");
            ApiError::internal("request deadline exceeded")
        })
    }
}

/// Rejects `value` when it is empty or whitespace only; passes it through unchanged otherwise.
pub fn require(field: &'static str, value: String) -> ApiResult<String> {
    if value.trim().is_empty() {
        warn!(field, "Rejected request with missing field");
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

#[derive(Serialize, ToSchema)]
pub struct RouteNotFound {
    pub success: bool,
    pub message: String,
    pub path: String,
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    warn!(method = %req.method(), path = %req.path(), "Route not found");
    HttpResponse::NotFound().json(RouteNotFound {
        success: false,
        message: "Route not found".to_string(),
        path: req.path().to_string(),
    })
}

/// Everything the handlers depend on, built once and shared by every worker.
#[derive(Clone)]
pub struct AppContext {
    pub database: Database,
    pub users: UserRepository,
    pub posts: PostRepository,
    pub tokens: Arc<TokenService>,
    pub catalog: Arc<DemoCatalog>,
    pub deadline: RequestDeadline,
    pub uses_default_secret: bool,
}

impl AppContext {
    pub fn new(
        database: Database,
        tokens: TokenService,
        catalog: DemoCatalog,
        request_timeout: Duration,
        uses_default_secret: bool,
    ) -> Self {
        AppContext {
            users: UserRepository::new(database.clone()),
            posts: PostRepository::new(database.clone()),
            database,
            tokens: Arc::new(tokens),
            catalog: Arc::new(catalog),
            deadline: RequestDeadline(request_timeout),
            uses_default_secret,
        }
    }

    /// Registers shared state and every route of the API.
    pub fn configure(self) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            let json_config = web::JsonConfig::default().error_handler(|err, _req| {
                ApiError::Validation(format!("Invalid JSON body: {err}")).into()
            });

            cfg.app_data(json_config)
                .app_data(web::Data::new(self.database))
                .app_data(web::Data::new(self.users))
                .app_data(web::Data::new(self.posts))
                .app_data(web::Data::from(self.tokens.clone()))
                .app_data(web::Data::from(self.catalog))
                .app_data(web::Data::new(self.deadline))
                .app_data(web::Data::new(api::SecretStatus {
                    uses_default: self.uses_default_secret,
                }))
                .route("/health", web::get().to(api::health))
                .service(
                    web::scope("/auth")
                        .route("/signup", web::post().to(auth::signup))
                        .route("/login", web::post().to(auth::login)),
                )
                .service(
                    web::resource("/posts")
                        .route(web::get().to(posts::list_posts))
                        .route(
                            web::post()
                                .to(posts::create_post)
                                .wrap(AuthMiddleware::new(self.tokens.clone())),
                        )
                        .default_service(web::to(not_found)),
                )
                .service(
                    web::resource("/posts/{id}")
                        .route(web::get().to(posts::get_post))
                        .route(
                            web::delete()
                                .to(posts::delete_post)
                                .wrap(AuthMiddleware::new(self.tokens.clone())),
                        )
                        .default_service(web::to(not_found)),
                );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::Value;

    pub struct TestContext {
        pub ctx: AppContext,
        pub tokens: Arc<TokenService>,
        pub users: UserRepository,
        pub posts: PostRepository,
    }

    pub fn test_context() -> TestContext {
        let ctx = AppContext::new(
            Database::in_memory().unwrap(),
            TokenService::new("handler-test-secret"),
            DemoCatalog::builtin(),
            Duration::from_secs(10),
            false,
        );
        TestContext {
            tokens: ctx.tokens.clone(),
            users: ctx.users.clone(),
            posts: ctx.posts.clone(),
            ctx,
        }
    }

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(require("password", " p@ss ".to_string()).unwrap(), " p@ss ");
        assert!(matches!(
            require("title", "   ".to_string()),
            Err(ApiError::Validation(msg)) if msg == "title is required"
        ));
    }

    #[actix_web::test]
    async fn test_deadline_expires() {
        let deadline = RequestDeadline(Duration::from_millis(10));
        let result = deadline
            .run(actix_web::rt::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(matches!(result, Err(ApiError::Internal(_))));

        let ok = RequestDeadline(Duration::from_secs(1)).run(async { 7 }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[actix_web::test]
    async fn test_unmatched_route_is_generic_404() {
        let TestContext { ctx, .. } = test_context();
        let app = actix_test::init_service(
            App::new()
                .configure(ctx.configure())
                .default_service(web::to(not_found)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/nope/here").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route not found");
        assert_eq!(body["path"], "/nope/here");
    }

    #[actix_web::test]
    async fn test_unsupported_method_on_posts_is_generic_404() {
        let TestContext { ctx, .. } = test_context();
        let app = actix_test::init_service(App::new().configure(ctx.configure())).await;

        for req in [
            actix_test::TestRequest::put().uri("/posts"),
            actix_test::TestRequest::patch().uri("/posts/1"),
            actix_test::TestRequest::patch().uri("/posts/0123456789abcdef01234567"),
        ] {
            let res = actix_test::call_service(&app, req.to_request()).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND);

            let body: Value = actix_test::read_body_json(res).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Route not found");
        }
    }

    #[actix_web::test]
    async fn test_malformed_json_is_validation_error() {
        let TestContext { ctx, .. } = test_context();
        let app = actix_test::init_service(App::new().configure(ctx.configure())).await;

        let req = actix_test::TestRequest::post()
            .uri("/auth/login")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["error"], "validation_error");
    }
}
