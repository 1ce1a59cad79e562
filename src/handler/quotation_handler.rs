use axum::{extract::{State, Path, Query}, response::IntoResponse, Json, http::StatusCode};
use std::sync::Arc;

use crate::dto::quotation_dto::{
    CreateQuotationRequest, DeleteQuotationResponse, ListQuery, QuotationResponse, ReviseQuotationRequest,
    UpdateQuotationRequest, UpdateQuotationStatusRequest,
};
use crate::handler::party_handler::parse_object_id;
use crate::service::quotation_service::{QuotationService, QuotationServiceImpl};
use crate::util::error::HandlerError;

use validator::Validate;

const DEFAULT_PAGE_SIZE: u32 = 50;

pub async fn list_quotations_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let quotations = service.list_quotations(page, limit).await?;
    Ok(Json(quotations.into_iter().map(QuotationResponse::from).collect::<Vec<_>>()))
}

pub async fn create_quotation_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Json(payload): Json<CreateQuotationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let quotation = service.create_quotation(payload).await?;
    Ok((StatusCode::CREATED, Json(QuotationResponse::from(quotation))))
}

pub async fn quotation_stats_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    Ok(Json(service.quotation_stats().await?))
}

pub async fn list_party_quotations_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Path((party_id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let party = parse_object_id(&party_id, "party")?;
    let quotations = service.list_party_quotations(party).await?;
    Ok(Json(quotations.into_iter().map(QuotationResponse::from).collect::<Vec<_>>()))
}

pub async fn get_quotation_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quotation")?;
    let quotation = service.get_quotation(id).await?;
    Ok(Json(QuotationResponse::from(quotation)))
}

pub async fn update_quotation_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<UpdateQuotationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quotation")?;
    payload.validate()?;
    let quotation = service.update_quotation(id, payload).await?;
    Ok(Json(QuotationResponse::from(quotation)))
}

pub async fn update_quotation_status_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<UpdateQuotationStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quotation")?;
    payload.validate()?;
    let quotation = service.update_status(id, &payload.status).await?;
    Ok(Json(QuotationResponse::from(quotation)))
}

pub async fn revise_quotation_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<ReviseQuotationRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quotation")?;
    payload.validate()?;
    let quotation = service.revise_quotation(id, payload).await?;
    Ok((StatusCode::CREATED, Json(QuotationResponse::from(quotation))))
}

pub async fn delete_quotation_handler(
    State(service): State<Arc<QuotationServiceImpl>>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quotation")?;
    let deleted = service.delete_quotation(id).await?;
    Ok(Json(DeleteQuotationResponse {
        message: "Quotation deleted successfully".to_string(),
        deleted_quotation_title: deleted.title,
    }))
}
