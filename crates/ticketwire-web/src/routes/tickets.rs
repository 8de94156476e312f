//! Ticket route handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use ticketwire_core::{Ticket, TicketFields, TicketId};

use super::error_response;
use crate::state::AppState;

type ApiError = (StatusCode, String);

fn parse_id(raw: &str) -> Result<TicketId, ApiError> {
    match raw.parse::<TicketId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err((StatusCode::BAD_REQUEST, "invalid id".to_string())),
    }
}

fn parse_body(body: Result<Json<TicketFields>, JsonRejection>) -> Result<TicketFields, ApiError> {
    body.map(|Json(fields)| fields)
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid json".to_string()))
}

pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Vec<Ticket>>, ApiError> {
    let tickets = state.gateway.list().await.map_err(error_response)?;
    Ok(Json(tickets))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    body: Result<Json<TicketFields>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let fields = parse_body(body)?;
    let ticket = state.gateway.create(fields).await.map_err(error_response)?;
    Ok(Json(ticket))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let id = parse_id(&id)?;
    let ticket = state.gateway.get(id).await.map_err(error_response)?;
    Ok(Json(ticket))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TicketFields>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let id = parse_id(&id)?;
    let fields = parse_body(body)?;
    let ticket = state.gateway.update(id, fields).await.map_err(error_response)?;
    Ok(Json(ticket))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.gateway.delete(id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert_eq!(parse_id("0").unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(parse_id("-4").unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(parse_id("abc").unwrap_err().1, "invalid id");
    }
}
