//! HTTP API server with observability for the reservation system.
//!
//! Exposes hold creation, checkout settlement, availability reads, and
//! catalog administration over REST, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use service::{CheckoutService, DEFAULT_HOLD_TTL_SECS, InventoryService, ReservationService};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub reservations: ReservationService<S>,
    pub checkout: CheckoutService<S>,
    pub catalog: InventoryService<S>,
}

/// Creates the application state with the given hold TTL.
pub fn create_state<S: Store + Clone + 'static>(
    store: S,
    hold_ttl: chrono::Duration,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        reservations: ReservationService::with_ttl(store.clone(), hold_ttl),
        checkout: CheckoutService::new(store.clone()),
        catalog: InventoryService::new(store),
    })
}

/// Creates the application state with the default 5-minute hold TTL.
pub fn create_default_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(store, chrono::Duration::seconds(DEFAULT_HOLD_TTL_SECS))
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let v1 = Router::new()
        .route("/inventory/reserve", post(routes::inventory::reserve::<S>))
        .route("/inventory/{sku}", get(routes::inventory::availability::<S>))
        .route("/checkout/confirm", post(routes::checkout::confirm::<S>))
        .route("/checkout/cancel", post(routes::checkout::cancel::<S>))
        .route(
            "/admin/inventory",
            get(routes::admin::list::<S>).post(routes::admin::create::<S>),
        )
        .route(
            "/admin/inventory/bulk",
            post(routes::admin::create_bulk::<S>),
        )
        .route(
            "/admin/inventory/{sku}",
            put(routes::admin::update::<S>).delete(routes::admin::remove::<S>),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api/v1", v1)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
