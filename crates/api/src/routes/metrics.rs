//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the shop metrics.
pub fn describe() {
    metrics::describe_counter!("orders_placed_total", "Orders accepted by the coordinator");
    metrics::describe_counter!(
        "orders_rejected_total",
        "Purchases refused, labelled by error kind"
    );
    metrics::describe_counter!(
        "orders_cancelled_total",
        "Orders removed by cancellation"
    );
    metrics::describe_counter!(
        "order_status_changes_total",
        "Status changes, labelled by target status"
    );
    metrics::describe_histogram!(
        "place_order_duration_seconds",
        Unit::Seconds,
        "Time spent placing an order, including rejections"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
