// identity-server/src/api/status.rs
use actix::Addr;
use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::registry::{AccountRegistryActor, GetRegistryMetrics};

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "DecentWork Identity Service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/status")]
pub async fn registry_status(registry: web::Data<Addr<AccountRegistryActor>>) -> impl Responder {
    match registry.send(GetRegistryMetrics).await {
        Ok(metrics) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "metrics": metrics
        })),
        Err(e) => {
            tracing::error!("Error fetching registry metrics: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}
