//! Backend for an anime-awards fan site: public vote casting, admin-only
//! tallying, and the site settings document the frontend uses to toggle
//! features (awards visibility, voting open/closed).
//!
//! # Infrastructure
//! - Static pages and the ranking UI are served elsewhere; this service
//!   only owns the vote counters, the settings document, and admin auth.
//! - All shared state lives in Redis. Vote counts are atomic `INCR`
//!   counters, so the service itself stays stateless and can restart or
//!   scale without coordination.
//! - Admin auth is a signed bearer token exchanged for the admin password;
//!   no server-side sessions.
//!
//! # Notes
//!
//! ## Why Redis
//! The only write contention in the system is concurrent votes landing on
//! the same nominee. Redis gives atomic increments and O(1) lookups for
//! that without any locking on our side. Tallies are a prefix SCAN plus
//! one MGET, which is fine at awards-show scale (hundreds of counters).
//!
//! ## Consistency
//! A tally is eventually consistent with votes in flight while it runs.
//! Settings writes are last-writer-wins whole-document overwrites; two
//! admins editing at once can clobber each other and we accept that.

use std::time::Duration;

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod settings;
pub mod state;
pub mod votes;

use state::State;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = routes::router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
