use crate::db::new_object_id;
use crate::db::user_repository::UserRepository;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{require, RequestDeadline};
use crate::models::user::User;
use crate::utils::auth::{hash_password, verify_password, TokenService, DUMMY_PASSWORD_HASH};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub msg: String,
    pub token: String,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Missing fields or username taken", body = crate::error::ErrorBody)
    ),
    tag = "Authentication"
)]
pub async fn signup(
    user_repo: web::Data<UserRepository>,
    tokens: web::Data<TokenService>,
    deadline: web::Data<RequestDeadline>,
    payload: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let SignupRequest {
        name,
        username,
        password,
    } = payload.into_inner();
    info!(username = %username, "Signup attempt");

    let name = require("name", name)?;
    let username = require("username", username)?;
    let password = require("password", password)?;

    // Fail fast before paying for a hash; the insert below is still the authority.
    if deadline.run(user_repo.get_by_username(&username)).await??.is_some() {
        warn!(username = %username, "Signup failed: username already exists");
        return Err(ApiError::Conflict);
    }

    let password_hash = deadline
        .run(web::block(move || hash_password(&password)))
        .await?
        .map_err(ApiError::internal)?
        .map_err(|e| ApiError::internal(format!("failed to hash password: {e}")))?;

    let user = User {
        id: new_object_id(),
        name,
        username,
        password_hash,
        created_at: chrono::Utc::now(),
    };

    let user = match deadline.run(user_repo.create(user)).await? {
        Ok(user) => user,
        Err(e) => {
            let err = ApiError::from(e);
            if matches!(err, ApiError::Conflict) {
                warn!("Signup failed: username claimed concurrently");
            }
            return Err(err);
        }
    };

    let token = tokens
        .issue(&user.id, chrono::Utc::now())
        .map_err(|e| ApiError::internal(format!("failed to generate token: {e}")))?;

    info!(user_id = %user.id, username = %user.username, "User registered successfully");

    Ok(HttpResponse::Created().json(AuthResponse {
        msg: "User created successfully".to_string(),
        token,
    }))
}

/// Login an existing user
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = crate::error::ErrorBody)
    ),
    tag = "Authentication"
)]
pub async fn login(
    user_repo: web::Data<UserRepository>,
    tokens: web::Data<TokenService>,
    deadline: web::Data<RequestDeadline>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let LoginRequest { username, password } = payload.into_inner();
    info!(username = %username, "Login attempt");

    let user = deadline.run(user_repo.get_by_username(&username)).await??;

    // Unknown usernames still pay for a full hash check.
    let password_hash = user
        .as_ref()
        .map_or_else(|| DUMMY_PASSWORD_HASH.to_string(), |u| u.password_hash.clone());
    let matches = deadline
        .run(web::block(move || verify_password(&password, &password_hash)))
        .await?
        .map_err(ApiError::internal)?;

    let user = match user {
        Some(u) if matches => u,
        Some(_) => {
            warn!(username = %username, "Login failed: invalid credentials");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            warn!(username = %username, "Login failed: user not found");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = tokens
        .issue(&user.id, chrono::Utc::now())
        .map_err(|e| ApiError::internal(format!("failed to generate token: {e}")))?;

    info!(username = %username, user_id = %user.id, "User logged in successfully");

    Ok(HttpResponse::Ok().json(AuthResponse {
        msg: "Login successful".to_string(),
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{test_context, TestContext};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_signup_returns_verifiable_token() {
        let TestContext { ctx, tokens, .. } = test_context();
        let app = test::init_service(App::new().configure(ctx.configure())).await;

        let req = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"name": "Ann", "username": "ann1", "password": "p@ss"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let body: AuthResponse = test::read_body_json(res).await;
        assert_eq!(body.msg, "User created successfully");
        assert!(tokens.verify(&body.token, chrono::Utc::now()).is_ok());
    }

    #[actix_web::test]
    async fn test_duplicate_signup_conflicts_without_new_record() {
        let TestContext { ctx, users, .. } = test_context();
        let app = test::init_service(App::new().configure(ctx.configure())).await;

        let first = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"name": "Ann", "username": "ann1", "password": "p@ss"}))
            .to_request();
        assert_eq!(test::call_service(&app, first).await.status(), StatusCode::CREATED);
        let original = users.get_by_username("ann1").await.unwrap().unwrap();

        let second = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"name": "Impostor", "username": "ann1", "password": "other"}))
            .to_request();
        let res = test::call_service(&app, second).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "conflict");

        let after = users.get_by_username("ann1").await.unwrap().unwrap();
        assert_eq!(after.id, original.id);
        assert_eq!(after.name, "Ann");
    }

    #[actix_web::test]
    async fn test_signup_requires_all_fields() {
        let TestContext { ctx, .. } = test_context();
        let app = test::init_service(App::new().configure(ctx.configure())).await;

        for body in [
            json!({"username": "ann1", "password": "p@ss"}),
            json!({"name": "Ann", "username": "  ", "password": "p@ss"}),
            json!({"name": "Ann", "username": "ann1"}),
        ] {
            let req = test::TestRequest::post()
                .uri("/auth/signup")
                .set_json(body)
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(res).await;
            assert_eq!(body["error"], "validation_error");
        }
    }

    #[actix_web::test]
    async fn test_login_failures_are_indistinguishable() {
        let TestContext { ctx, .. } = test_context();
        let app = test::init_service(App::new().configure(ctx.configure())).await;

        let signup = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"name": "Ann", "username": "ann1", "password": "p@ss"}))
            .to_request();
        test::call_service(&app, signup).await;

        let mut bodies = Vec::new();
        for creds in [
            json!({"username": "ann1", "password": "wrong"}),
            json!({"username": "nobody", "password": "p@ss"}),
        ] {
            let req = test::TestRequest::post()
                .uri("/auth/login")
                .set_json(creds)
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(res).await;
            bodies.push(body);
        }

        assert_eq!(bodies[0], bodies[1]);
        assert_eq!(bodies[0]["error"], "invalid_credentials");
    }

    #[actix_web::test]
    async fn test_unknown_username_still_runs_hash_check() {
        // A deadline far shorter than one Argon2 verification: if the
        // unknown-username branch skipped hashing it would answer 400.
        let ctx = crate::handlers::AppContext::new(
            crate::db::Database::in_memory().unwrap(),
            TokenService::new("handler-test-secret"),
            crate::catalog::DemoCatalog::builtin(),
            std::time::Duration::from_nanos(1),
            false,
        );
        let app = test::init_service(App::new().configure(ctx.configure())).await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": "nobody", "password": "p@ss"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_login_token_identifies_user() {
        let TestContext {
            ctx, tokens, users, ..
        } = test_context();
        let app = test::init_service(App::new().configure(ctx.configure())).await;

        let signup = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"name": "Ann", "username": "ann1", "password": "p@ss"}))
            .to_request();
        test::call_service(&app, signup).await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": "ann1", "password": "p@ss"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: AuthResponse = test::read_body_json(res).await;
        assert_eq!(body.msg, "Login successful");
        let claims = tokens.verify(&body.token, chrono::Utc::now()).unwrap();
        let ann = users.get_by_username("ann1").await.unwrap().unwrap();
        assert_eq!(claims.sub, ann.id);
    }
}
