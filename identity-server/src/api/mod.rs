// identity-server/src/api/mod.rs
pub mod graphql;
pub mod status;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(graphql::graphql).service(
        actix_web::web::scope("/api")
            .service(status::api_index)
            .service(status::registry_status),
    );
}
