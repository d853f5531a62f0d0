use actix_web::HttpResponse;

/// GET /health_check
///
/// Liveness only; does not touch the credential store or cache.
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check");
    HttpResponse::Ok().finish()
}
