use axum::{extract::{State, Path, Query}, response::IntoResponse, Json, http::StatusCode};
use bson::oid::ObjectId;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::dto::party_dto::{AddFollowUpRequest, CreatePartyRequest, PartyResponse, UpcomingQuery, UpdatePartyRequest};
use crate::model::party::Party;
use crate::service::party_service::{PartyService, PartyServiceImpl};
use crate::util::error::HandlerError;

use validator::Validate;

pub(crate) fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, HandlerError> {
    ObjectId::parse_str(raw).map_err(|_| HandlerError::bad_request(format!("Invalid {} id", what)))
}

fn responses(parties: Vec<Party>) -> Vec<PartyResponse> {
    parties.into_iter().map(PartyResponse::from).collect()
}

pub async fn list_parties_handler(
    State(service): State<Arc<PartyServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let parties = service.list_parties().await?;
    Ok(Json(responses(parties)))
}

pub async fn create_party_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Json(payload): Json<CreatePartyRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let party = service.create_party(payload).await?;
    info!(party_id = %party.party_id, "[create_party_handler] Party created");
    Ok((StatusCode::CREATED, Json(PartyResponse::from(party))))
}

pub async fn party_stats_handler(
    State(service): State<Arc<PartyServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    Ok(Json(service.party_stats().await?))
}

pub async fn get_party_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "party")?;
    let party = service.get_party(id).await?;
    Ok(Json(PartyResponse::from(party)))
}

pub async fn get_party_by_party_id_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Path((party_id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let party = service.get_party_by_party_id(&party_id).await?;
    Ok(Json(PartyResponse::from(party)))
}

pub async fn update_party_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<UpdatePartyRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "party")?;
    payload.validate()?;
    let party = service.update_party(id, payload.into()).await?;
    Ok(Json(PartyResponse::from(party)))
}

pub async fn delete_party_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "party")?;
    service.delete_party(id).await?;
    Ok(Json(serde_json::json!({ "message": "Party deleted successfully" })))
}

pub async fn add_follow_up_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<AddFollowUpRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "party")?;
    payload.validate()?;
    let party = service.add_follow_up(id, payload.scheduled_at, payload.note).await?;
    Ok((StatusCode::CREATED, Json(PartyResponse::from(party))))
}

pub async fn complete_follow_up_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Path((id, follow_up_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "party")?;
    let follow_up_id = parse_object_id(&follow_up_id, "follow-up")?;
    let party = service.complete_follow_up(id, follow_up_id).await?;
    Ok(Json(PartyResponse::from(party)))
}

pub async fn upcoming_follow_ups_handler(
    State(service): State<Arc<PartyServiceImpl>>,
    Query(query): Query<UpcomingQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let parties = service.upcoming_follow_ups(date).await?;
    Ok(Json(responses(parties)))
}

pub async fn overdue_follow_ups_handler(
    State(service): State<Arc<PartyServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let parties = service.overdue_follow_ups().await?;
    Ok(Json(responses(parties)))
}
