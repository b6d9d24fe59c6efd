//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::{identify_caller, USER_ID_HEADER};
use crate::server::routes::{
    accept_handler, availability_handler, decline_handler, event_tickets_handler,
    get_ticket_handler, get_transaction_handler, health_handler, join_handler, leave_handler,
    list_handler, my_tickets_handler, my_transactions_handler, purchase_handler,
    recount_handler, refund_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps, allowed_origins: &[String]) -> Router {
    let state = AppState { deps };

    Router::new()
        // Tickets
        .route("/tickets", post(purchase_handler))
        .route("/tickets/:id", get(get_ticket_handler))
        .route("/tickets/:id/refund", put(refund_handler))
        .route("/users/me/tickets", get(my_tickets_handler))
        // Events
        .route("/events/:id/tickets", get(event_tickets_handler))
        .route("/events/:id/availability", get(availability_handler))
        .route("/events/:id/inventory/recount", post(recount_handler))
        // Waitlist
        .route("/waitlist", post(join_handler).get(list_handler))
        .route("/waitlist/events/:event_id", delete(leave_handler))
        // Offers and transactions
        .route("/transactions/:id", get(get_transaction_handler))
        .route("/transactions/:id/accept", post(accept_handler))
        .route("/transactions/:id/decline", post(decline_handler))
        .route("/users/me/transactions", get(my_transactions_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(identify_caller))
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
