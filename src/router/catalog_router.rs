use axum::{Router, routing::get};
use crate::handler::catalog_handler::{
    list_categories_handler,
    create_category_handler,
    list_brands_handler,
    create_brand_handler,
    list_models_handler,
    create_model_handler,
    search_models_handler,
};
use std::sync::Arc;
use crate::service::catalog_service::CatalogServiceImpl;

pub fn catalog_router(service: Arc<CatalogServiceImpl>) -> Router {
    Router::new()
        .route("/categories", get(list_categories_handler).post(create_category_handler))
        .route("/brands", get(list_brands_handler).post(create_brand_handler))
        .route("/models", get(list_models_handler).post(create_model_handler))
        .route("/models/search", get(search_models_handler))
        .with_state(service)
}
