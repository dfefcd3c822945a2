use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use cash_balancer::config::Config;
use cash_balancer::server::{configure, AppState};
use cash_balancer::store::{JsonFileStore, PortfolioStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    log::info!("Portfolio store: {}", config.store_path);

    let store = PortfolioStore::new(Box::new(JsonFileStore::new(&config.store_path)));
    let state = web::Data::new(AppState::new(store, &config));

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(config.listen_addr)?
    .run()
    .await
}
