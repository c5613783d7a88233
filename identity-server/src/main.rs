// identity-server/src/main.rs
use common::{setup_tracing, Config};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let (config, load_error) = Config::resolve();
    setup_tracing(&config.log_level);
    if let Some(e) = &load_error {
        Config::report_fallback(e);
    }

    let listener = TcpListener::bind(&config.identity_server.bind_addr)?;
    identity_server::run(listener, config)?.await
}
