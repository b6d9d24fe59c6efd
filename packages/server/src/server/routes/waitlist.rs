use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::common::{EventId, UserId};
use crate::domains::waitlist::activities::{
    join_waitlist, leave_waitlist, list_waitlist, JoinOutcome, LeftWaitlist, WaitlistFilter,
};
use crate::domains::waitlist::RankedEntry;
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub event_id: EventId,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    #[serde(flatten)]
    pub outcome: JoinOutcome,
    pub ticket_offered: bool,
}

#[derive(Debug, Deserialize)]
pub struct WaitlistQuery {
    pub event_id: Option<EventId>,
    pub user_id: Option<UserId>,
}

/// POST /waitlist
pub async fn join_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Json(body): Json<JoinBody>,
) -> ApiResult<(StatusCode, Json<JoinResponse>)> {
    let outcome = join_waitlist(body.event_id, caller.user_id, &state.deps).await?;
    let ticket_offered = outcome.ticket_offered();

    Ok((
        StatusCode::CREATED,
        Json(JoinResponse {
            outcome,
            ticket_offered,
        }),
    ))
}

/// GET /waitlist?event_id=... or ?user_id=...
pub async fn list_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<WaitlistQuery>,
) -> ApiResult<Json<Vec<RankedEntry>>> {
    let filter = match (query.event_id, query.user_id) {
        (Some(event_id), _) => WaitlistFilter::Event(event_id),
        (None, Some(user_id)) => WaitlistFilter::User(user_id),
        (None, None) => return Err(ApiError::bad_request("event_id or user_id is required")),
    };

    Ok(Json(list_waitlist(filter, &state.deps).await?))
}

/// DELETE /waitlist/events/:event_id
pub async fn leave_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<LeftWaitlist>> {
    Ok(Json(
        leave_waitlist(event_id, caller.user_id, &state.deps).await?,
    ))
}
