use axum::{Router, routing::{get, post}};
use crate::handler::party_handler::{
    list_parties_handler,
    create_party_handler,
    party_stats_handler,
    get_party_handler,
    get_party_by_party_id_handler,
    update_party_handler,
    delete_party_handler,
    add_follow_up_handler,
    complete_follow_up_handler,
    upcoming_follow_ups_handler,
    overdue_follow_ups_handler,
};
use std::sync::Arc;
use crate::service::party_service::PartyServiceImpl;

pub fn party_router(service: Arc<PartyServiceImpl>) -> Router {
    Router::new()
        .route("/parties", get(list_parties_handler).post(create_party_handler))
        .route("/parties/stats", get(party_stats_handler))
        .route("/parties/follow-ups/upcoming", get(upcoming_follow_ups_handler))
        .route("/parties/follow-ups/overdue", get(overdue_follow_ups_handler))
        .route("/parties/party-id/{party_id}", get(get_party_by_party_id_handler))
        .route(
            "/parties/{id}",
            get(get_party_handler).put(update_party_handler).delete(delete_party_handler),
        )
        .route("/parties/{id}/follow-ups", post(add_follow_up_handler))
        .route("/parties/{id}/follow-ups/{follow_up_id}/complete", post(complete_follow_up_handler))
        .with_state(service)
}
