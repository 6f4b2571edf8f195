//! HTTP API server for the shop ledger.
//!
//! Exposes the catalog, purchases, cancellations and order histories over
//! REST, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{OrderCoordinator, PayPalMeLink};
use ledger_store::Store;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::ShopQueries;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub coordinator: OrderCoordinator<S, PayPalMeLink>,
    pub queries: ShopQueries<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds the coordinator and the query façade over one store.
    pub fn new(store: S, config: &Config) -> Self {
        let coordinator =
            OrderCoordinator::new(store.clone(), PayPalMeLink::new(&config.paypal_user))
                .with_status_policy(config.status_policy);
        Self {
            coordinator,
            queries: ShopQueries::new(store),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>).delete(routes::products::delete::<S>),
        )
        .route("/products/{id}/stock", get(routes::products::stock::<S>))
        .route("/products/{id}/price", put(routes::products::reprice::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::place::<S>),
        )
        .route("/orders/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/orders/{id}/status",
            post(routes::orders::advance_status::<S>),
        )
        .route("/buyers/{id}/orders", get(routes::orders::by_buyer::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
