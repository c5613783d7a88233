// identity-server/src/lib.rs
pub mod api;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod utils;
pub mod verify;

use actix::Actor;
use actix_web::{dev::Server, web, App, HttpServer};
use common::Config;
use std::net::TcpListener;

use middleware::RateLimiter;
use registry::AccountRegistryActor;

/// Start the service on an already bound listener. Must be called from
/// inside a running actix system.
pub fn run(listener: TcpListener, config: Config) -> std::io::Result<Server> {
    let settings = config.identity_server.clone();

    let registry = AccountRegistryActor::new()
        .with_challenge_ttl(settings.challenge_ttl_seconds)
        .with_cleanup_interval(settings.cleanup_interval_seconds)
        .start();

    let registry_data = web::Data::new(registry);
    let config_data = web::Data::new(config);
    let limiter = RateLimiter::new(vec!["/graphql".to_string()], settings.rate_limit_per_minute);

    tracing::info!("Identity service listening on {}", listener.local_addr()?);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(limiter.clone())
            .app_data(config_data.clone())
            .app_data(registry_data.clone())
            .configure(api::configure)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
