use axum::{
    extract::{Extension, Path},
    Json,
};

use crate::common::EventId;
use crate::domains::catalog::activities::{get_availability, recount_inventory, Availability};
use crate::server::app::AppState;
use crate::server::error::ApiResult;

/// GET /events/:id/availability
pub async fn availability_handler(
    Extension(state): Extension<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Availability>> {
    Ok(Json(get_availability(event_id, &state.deps).await?))
}

/// POST /events/:id/inventory/recount
pub async fn recount_handler(
    Extension(state): Extension<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Availability>> {
    Ok(Json(recount_inventory(event_id, &state.deps).await?))
}
