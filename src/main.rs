#[macro_use]
extern crate diesel;
use std::time::Duration;

use crate::{
    backend::Store,
    configuration::Configuration,
    configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface,
    http::{create_app, AppState},
    local_store::LocalStore,
    reservation_engine::run_reconciliation,
};
use tokio::{net::TcpListener, time::sleep};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod backend;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_store;
mod reservation_engine;
mod schema;
mod slot_registry;
#[cfg(test)]
mod testutils;
mod types;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = TcpListener::bind(&address).await?;
    info!(%address, "Salon booking service listening");

    if let Some(database_url) = configuration.database_url() {
        let store = loop {
            match DatabaseInterface::new(
                &database_url,
                configuration.pool_size(),
                configuration.storage_timeout(),
            ) {
                Ok(store) => {
                    info!("Successfully connected to database");
                    break store;
                }
                Err(err) => {
                    error!(%err, "Failed to establish database connection. Retry in 1 sec");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        serve(listener, store, &configuration).await
    } else {
        warn!("No database configured, bookings are kept in memory only");
        let store = LocalStore::new(configuration.storage_timeout());
        serve(listener, store, &configuration).await
    }
}

async fn serve<S: Store>(
    listener: TcpListener,
    store: S,
    configuration: &impl Configuration,
) -> std::io::Result<()> {
    let state = AppState::new(store);

    match configuration.reconcile_interval() {
        Some(period) => {
            info!(?period, "Starting periodic reconciliation");
            tokio::spawn(run_reconciliation(state.engine.clone(), period));
        }
        None => info!("Periodic reconciliation disabled"),
    }

    axum::serve(listener, create_app(state)).await
}
