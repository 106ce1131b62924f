use crate::db::Database;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

/// Whether the token secret fell back to the built-in development value.
#[derive(Debug, Clone, Copy)]
pub struct SecretStatus {
    pub uses_default: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthChecks {
    pub jwt_uses_default: bool,
    pub database: bool,
}

/// Public health check endpoint with dependency checks
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(
    database: web::Data<Database>,
    secret: web::Data<SecretStatus>,
) -> impl Responder {
    let database_ok = match database.ping() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Health check: database unavailable");
            false
        }
    };

    if secret.uses_default {
        warn!("Health check: Using default JWT secret - NOT SECURE FOR PRODUCTION");
    }

    let healthy = database_ok && !secret.uses_default;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            jwt_uses_default: secret.uses_default,
            database: database_ok,
        },
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
