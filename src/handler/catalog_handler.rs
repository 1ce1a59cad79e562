use axum::{extract::{State, Query}, response::IntoResponse, Json, http::StatusCode};
use std::sync::Arc;

use crate::dto::catalog_dto::{CreateModelRequest, CreateNamedRequest, ModelResponse, NamedResponse, SearchQuery};
use crate::service::catalog_service::{CatalogService, CatalogServiceImpl};
use crate::util::error::HandlerError;

use validator::Validate;

pub async fn list_categories_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let categories = service.list_categories().await?;
    Ok(Json(categories.into_iter().map(NamedResponse::from).collect::<Vec<_>>()))
}

pub async fn create_category_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
    Json(payload): Json<CreateNamedRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let category = service.create_category(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(NamedResponse::from(category))))
}

pub async fn list_brands_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let brands = service.list_brands().await?;
    Ok(Json(brands.into_iter().map(NamedResponse::from).collect::<Vec<_>>()))
}

pub async fn create_brand_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
    Json(payload): Json<CreateNamedRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let brand = service.create_brand(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(NamedResponse::from(brand))))
}

pub async fn list_models_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let models = service.list_models().await?;
    Ok(Json(models.into_iter().map(ModelResponse::from).collect::<Vec<_>>()))
}

pub async fn create_model_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
    Json(payload): Json<CreateModelRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let model = service.create_model(payload).await?;
    Ok((StatusCode::CREATED, Json(ModelResponse::from(model))))
}

pub async fn search_models_handler(
    State(service): State<Arc<CatalogServiceImpl>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let models = service.search_models(&query.term).await?;
    Ok(Json(models.into_iter().map(ModelResponse::from).collect::<Vec<_>>()))
}
