use crate::config::AppConfig;
use crate::db::{init_db, Database};
use crate::router::handle;
use astra::Server;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod domain;
mod errors;
mod import;
mod lookup;
mod responses;
mod router;
mod spreadsheets;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env();
    let db = Database::new(&cfg.db_path);

    if let Err(e) = init_db(&db) {
        tracing::error!(error = %e, path = %cfg.db_path.display(), "database initialization failed");
        std::process::exit(1);
    }

    tracing::info!(addr = %cfg.addr, workers = cfg.max_workers, "starting server");

    let server = Server::bind(&cfg.addr).max_workers(cfg.max_workers);

    let result = server.serve(move |req, _info| match handle(req, &db) {
        Ok(resp) => resp,
        Err(err) => templates::html_error_response(err),
    });

    if let Err(e) = result {
        tracing::error!(error = %e, "server ended with error");
    }

    tracing::info!("server shut down");
}
