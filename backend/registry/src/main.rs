//! Carbon Registry entry point.
//!
//! Owns the status workflow of waste batches and plantation projects stored
//! in a shared document tree (SQLite), issues carbon credits through an
//! optional ledger gateway, and exposes everything over an Axum REST API.
//! A background sweeper applies the scheduled transitions.

mod accounts;
mod api;
mod config;
mod credits;
mod db;
mod errors;
mod keys;
mod ledger;
mod marketplace;
mod models;
mod path;
mod payout;
mod queries;
mod status;
mod store;
mod sweeper;
mod workflow;

#[cfg(test)]
mod test_marketplace;
#[cfg(test)]
mod test_waste_flow;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use credits::CategoryFactors;
use ledger::LedgerClient;
use store::Store;
use workflow::Workflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    let store = Store::new(pool);

    let ledger = LedgerClient::from_config(&config)?;
    if ledger.is_none() {
        warn!("LEDGER_RPC_URL not set; chain payouts will be refused");
    }

    let workflow = Arc::new(
        Workflow::new(
            store,
            ledger,
            CategoryFactors::with_default(config.default_category_factor),
        )
        .with_claim_timeout(config.claim_timeout()),
    );

    // ─── Background sweeper ───────────────────────────────
    let shutdown = CancellationToken::new();
    let sweeper_task = tokio::spawn(sweeper::run(
        workflow.clone(),
        Duration::from_secs(config.sweep_interval_secs),
        shutdown.clone(),
    ));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState { workflow });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/sweep", post(api::sweep))
        // Waste
        .route("/waste", post(api::submit_waste).get(api::list_waste))
        .route("/waste/cities", get(api::list_cities))
        .route("/waste/classify", post(api::classify_pending))
        .route("/waste/:owner/:id", get(api::get_waste))
        .route("/waste/:owner/:id/classify", post(api::classify_waste))
        .route("/waste/:owner/:id/approve", post(api::approve_waste))
        .route("/waste/:owner/:id/reject", post(api::reject_waste))
        .route("/waste/:owner/:id/reserve", post(api::reserve_waste))
        .route("/waste/:owner/:id/weight", post(api::verify_weight))
        .route("/waste/:owner/:id/allocate", post(api::allocate_to_pool))
        .route("/waste/:owner/:id/execute", post(api::execute_plantation))
        .route("/pool", get(api::list_pool))
        // Plantation projects
        .route("/projects", post(api::submit_project).get(api::list_projects))
        .route("/projects/promote", post(api::promote_projects))
        .route("/projects/:owner/:id", get(api::get_project))
        .route(
            "/projects/:owner/:id/after-images",
            post(api::upload_after_images),
        )
        .route("/projects/:owner/:id/approve", post(api::approve_project))
        .route("/projects/:owner/:id/reject", post(api::reject_project))
        .route("/projects/:owner/:id/confirm", post(api::confirm_after_images))
        .route("/projects/:owner/:id/verify", post(api::verify_plantation))
        // Transfers and marketplace
        .route("/transfers/:owner", get(api::list_transfers))
        .route("/sellers", get(api::list_sellers))
        .route("/sellers/:user_id", put(api::publish_seller))
        .route(
            "/orders/:seller_id",
            post(api::place_order).get(api::list_orders),
        )
        .route("/marketplace", get(api::list_listings))
        .route("/marketplace/:owner", put(api::publish_listing))
        // Accounts
        .route("/users/register", post(api::register_user))
        .route("/users/login", post(api::login_user))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {e}");
            }
            info!("Shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    sweeper_task.await?;

    Ok(())
}
