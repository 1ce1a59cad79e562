use axum::{Router, routing::{get, post, put}};
use crate::handler::quotation_handler::{
    list_quotations_handler,
    create_quotation_handler,
    quotation_stats_handler,
    list_party_quotations_handler,
    get_quotation_handler,
    update_quotation_handler,
    delete_quotation_handler,
    update_quotation_status_handler,
    revise_quotation_handler,
};
use std::sync::Arc;
use crate::service::quotation_service::QuotationServiceImpl;

pub fn quotation_router(service: Arc<QuotationServiceImpl>) -> Router {
    Router::new()
        .route("/quotations", get(list_quotations_handler).post(create_quotation_handler))
        .route("/quotations/stats", get(quotation_stats_handler))
        .route("/quotations/party/{party_id}", get(list_party_quotations_handler))
        .route(
            "/quotations/{id}",
            get(get_quotation_handler).put(update_quotation_handler).delete(delete_quotation_handler),
        )
        .route("/quotations/{id}/status", put(update_quotation_status_handler))
        .route("/quotations/{id}/revise", post(revise_quotation_handler))
        .with_state(service)
}
