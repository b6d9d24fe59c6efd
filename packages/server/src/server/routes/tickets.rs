use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::common::{EventId, TicketId, TicketTypeId, TicketingError};
use crate::domains::tickets::activities::{
    get_ticket, list_event_tickets, list_user_tickets, purchase_tickets, return_ticket,
    PurchaseReceipt, PurchaseRequest, RefundOutcome,
};
use crate::domains::tickets::Ticket;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub quantity: i32,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// POST /tickets
pub async fn purchase_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Json(body): Json<PurchaseBody>,
) -> ApiResult<(StatusCode, Json<PurchaseReceipt>)> {
    let request = PurchaseRequest {
        event_id: body.event_id,
        ticket_type_id: body.ticket_type_id,
        user_id: caller.user_id,
        quantity: body.quantity,
        payment_method: body.payment_method,
    };

    let receipt = purchase_tickets(request, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /tickets/:id
pub async fn get_ticket_handler(
    Extension(state): Extension<AppState>,
    Path(ticket_id): Path<TicketId>,
) -> ApiResult<Json<Ticket>> {
    Ok(Json(get_ticket(ticket_id, &state.deps).await?))
}

/// PUT /tickets/:id/refund
///
/// Only the holder may return a ticket; anyone else gets a 404.
pub async fn refund_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
    Path(ticket_id): Path<TicketId>,
) -> ApiResult<Json<RefundOutcome>> {
    let ticket = get_ticket(ticket_id, &state.deps).await?;
    if !ticket.is_owned_by(caller.user_id) {
        return Err(TicketingError::not_found("Ticket", ticket_id).into());
    }

    Ok(Json(return_ticket(ticket_id, &state.deps).await?))
}

/// GET /users/me/tickets
pub async fn my_tickets_handler(
    Extension(state): Extension<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<Ticket>>> {
    Ok(Json(list_user_tickets(caller.user_id, &state.deps).await?))
}

/// GET /events/:id/tickets
pub async fn event_tickets_handler(
    Extension(state): Extension<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<Vec<Ticket>>> {
    Ok(Json(list_event_tickets(event_id, &state.deps).await?))
}
