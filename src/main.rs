use actix::Actor;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;

use realtime_chess::routes::configure_routes;
use realtime_chess::sweeper::Sweeper;
use realtime_chess::{AppState, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    let state = Arc::new(AppState::new(&config));
    Sweeper::new(
        state.clone(),
        config.sweep_interval,
        config.queue_cleanup_interval,
    )
    .start();

    let app_state = web::Data::from(state);

    info!("Starting realtime chess server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}
