mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{init_tracing, party_fixture, MockPartyRepository, TestContext};
use quotation_backend::config::retry_conf::RetryConfig;
use quotation_backend::dto::party_dto::CreatePartyRequest;
use quotation_backend::model::party::PartyDetails;
use quotation_backend::service::party_service::{PartyService, PartyServiceImpl};
use quotation_backend::util::error::ServiceError;
use std::collections::HashSet;
use std::sync::Arc;

fn request(name: &str) -> CreatePartyRequest {
    CreatePartyRequest {
        name: name.to_string(),
        phone: "9876543210".to_string(),
        address: "12 Market Road".to_string(),
        email: Some("  ".to_string()),
    }
}

#[tokio::test]
async fn test_sequential_creations_are_numbered_from_one() {
    init_tracing();
    let ctx = TestContext::new();
    for expected in ["P0001", "P0002", "P0003", "P0004", "P0005"] {
        let party = ctx.party_service.create_party(request("Acme")).await.unwrap();
        assert_eq!(party.party_id, expected);
    }
    let first = ctx.party_service.get_party_by_party_id("P0001").await.unwrap();
    assert_eq!(first.sequence, Some(1));
    assert_eq!(first.email, None, "blank email is dropped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creations_get_distinct_identifiers() {
    init_tracing();
    let retry = RetryConfig { party_id_attempts: 10, follow_up_attempts: 5, ..RetryConfig::default() };
    let ctx = TestContext::with(MockPartyRepository::new(), retry);

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = ctx.party_service.clone();
        handles.push(tokio::spawn(async move { service.create_party(request(&format!("Party {}", i))).await }));
    }
    let mut ids = HashSet::new();
    for handle in handles {
        let party = handle.await.unwrap().unwrap();
        assert!(party.party_id.starts_with('P'));
        ids.insert(party.party_id);
    }
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_malformed_latest_identifier_falls_back_to_count() {
    let parties = MockPartyRepository::new();
    parties.seed(party_fixture("LEGACY-7"));
    parties.seed(party_fixture("X-1"));
    let ctx = TestContext::with(parties, RetryConfig::default());

    let party = ctx.party_service.create_party(request("Fallback")).await.unwrap();
    assert_eq!(party.party_id, "P0003");
    let next = ctx.party_service.create_party(request("Sequenced")).await.unwrap();
    assert_eq!(next.party_id, "P0004");
}

#[tokio::test]
async fn test_identifier_widens_past_four_digits() {
    let parties = MockPartyRepository::new();
    parties.seed(party_fixture("P9999"));
    let ctx = TestContext::with(parties, RetryConfig::default());

    let party = ctx.party_service.create_party(request("Wide")).await.unwrap();
    assert_eq!(party.party_id, "P10000");
    let next = ctx.party_service.create_party(request("Wider")).await.unwrap();
    assert_eq!(next.party_id, "P10001");
}

#[tokio::test]
async fn test_exhausted_retries_use_clock_identifier() {
    let parties = MockPartyRepository { reject_sequenced_ids: true, ..MockPartyRepository::new() };
    let retry = RetryConfig { party_id_attempts: 3, follow_up_attempts: 5, ..RetryConfig::default() };
    let ctx = TestContext::with(parties.clone(), retry);

    let party = ctx.party_service.create_party(request("Clock")).await.unwrap();
    assert!(party.party_id.starts_with("PT"), "got {}", party.party_id);
    assert_eq!(party.sequence, None);
    assert_eq!(parties.insert_attempts.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_create_rejects_blank_fields() {
    let ctx = TestContext::new();
    let err = ctx.party_service.create_party(request("   ")).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    assert!(ctx.parties.parties.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_keeps_identifier() {
    let ctx = TestContext::new();
    let party = ctx.party_service.create_party(request("Before")).await.unwrap();
    let id = party.id.unwrap();
    let details = PartyDetails { name: Some("After".into()), ..PartyDetails::default() };
    let updated = ctx.party_service.update_party(id, details).await.unwrap();
    assert_eq!(updated.name, "After");
    assert_eq!(updated.party_id, "P0001");

    let blank = PartyDetails { phone: Some(" ".into()), ..PartyDetails::default() };
    assert!(matches!(ctx.party_service.update_party(id, blank).await, Err(ServiceError::InvalidInput(_))));
}

#[tokio::test]
async fn test_delete_refused_while_quotations_exist() {
    let ctx = TestContext::new();
    let party = ctx.party_service.create_party(request("Guarded")).await.unwrap();
    let id = party.id.unwrap();
    ctx.quotations.seed(id, 1, None);

    let err = ctx.party_service.delete_party(id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(ctx.party_service.get_party(id).await.is_ok());

    ctx.quotations.quotations.lock().unwrap().clear();
    ctx.party_service.delete_party(id).await.unwrap();
    assert!(matches!(ctx.party_service.get_party(id).await, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_without_counter_skips_guard() {
    let parties = MockPartyRepository::new();
    let service = PartyServiceImpl::new(Arc::new(parties.clone()), None, RetryConfig::default());
    let party = service.create_party(request("Unguarded")).await.unwrap();
    service.delete_party(party.id.unwrap()).await.unwrap();
    assert!(parties.parties.lock().unwrap().is_empty());

    let stats = service.party_stats().await.unwrap();
    assert!(!stats.quotation_model_available);
    assert_eq!(stats.total_parties, 0);
}

#[tokio::test]
async fn test_party_stats() {
    let ctx = TestContext::new();
    let a = ctx.party_service.create_party(request("A")).await.unwrap();
    ctx.party_service.create_party(request("B")).await.unwrap();
    ctx.party_service.create_party(request("C")).await.unwrap();
    ctx.quotations.seed(a.id.unwrap(), 1, None);
    ctx.quotations.seed(a.id.unwrap(), 2, None);

    let stats = ctx.party_service.party_stats().await.unwrap();
    assert_eq!(stats.total_parties, 3);
    assert_eq!(stats.parties_with_quotations, 1);
    assert_eq!(stats.parties_without_quotations, 2);
    assert!(stats.quotation_model_available);
}

#[tokio::test]
async fn test_follow_up_projection_moves_earlier_only() {
    let ctx = TestContext::new();
    let party = ctx.party_service.create_party(request("Follow")).await.unwrap();
    let id = party.id.unwrap();
    let later = Utc::now() + Duration::days(10);
    let sooner = Utc::now() + Duration::days(5);

    ctx.party_service.add_follow_up(id, later, "later".into()).await.unwrap();
    let party = ctx.party_service.add_follow_up(id, sooner, "sooner".into()).await.unwrap();
    assert_eq!(party.next_follow_up.as_ref().unwrap().scheduled_at, sooner);

    let party = ctx.party_service.add_follow_up(id, later + Duration::days(1), "latest".into()).await.unwrap();
    assert_eq!(party.next_follow_up.as_ref().unwrap().note, "sooner");
    assert_eq!(party.follow_ups.len(), 3);
    assert_eq!(ctx.parties.stored(id).follow_up_revision, 3);
}

#[tokio::test]
async fn test_completing_projection_source_recomputes() {
    let ctx = TestContext::new();
    let party = ctx.party_service.create_party(request("Complete")).await.unwrap();
    let id = party.id.unwrap();
    let first = Utc::now() + Duration::days(2);
    let second = Utc::now() + Duration::days(4);
    let third = Utc::now() + Duration::days(6);
    ctx.party_service.add_follow_up(id, third, "third".into()).await.unwrap();
    ctx.party_service.add_follow_up(id, first, "first".into()).await.unwrap();
    let party = ctx.party_service.add_follow_up(id, second, "second".into()).await.unwrap();

    let third_id = party.follow_ups.iter().find(|f| f.note == "third").unwrap().id;
    let first_id = party.follow_ups.iter().find(|f| f.note == "first").unwrap().id;

    // Not the projection source: unchanged
    let party = ctx.party_service.complete_follow_up(id, third_id).await.unwrap();
    assert_eq!(party.next_follow_up.as_ref().unwrap().note, "first");

    let party = ctx.party_service.complete_follow_up(id, first_id).await.unwrap();
    assert_eq!(party.next_follow_up.as_ref().unwrap().note, "second");
    assert_eq!(ctx.parties.stored(id).next_follow_up.unwrap().scheduled_at, second);
}

#[tokio::test]
async fn test_complete_unknown_follow_up_is_not_found() {
    let ctx = TestContext::new();
    let party = ctx.party_service.create_party(request("Unknown")).await.unwrap();
    let err = ctx
        .party_service
        .complete_follow_up(party.id.unwrap(), bson::oid::ObjectId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_stale_follow_up_write_is_retried() {
    let ctx = TestContext::new();
    let party = ctx.party_service.create_party(request("Racy")).await.unwrap();
    let id = party.id.unwrap();
    *ctx.parties.stale_follow_up_writes.lock().unwrap() = 2;

    let party = ctx.party_service.add_follow_up(id, Utc::now() + Duration::days(1), "retry".into()).await.unwrap();
    assert_eq!(party.follow_ups.len(), 1);
    assert_eq!(ctx.parties.stored(id).follow_ups.len(), 1);
}

#[tokio::test]
async fn test_follow_up_conflict_after_attempts_exhausted() {
    let retry = RetryConfig { party_id_attempts: 5, follow_up_attempts: 2, ..RetryConfig::default() };
    let ctx = TestContext::with(MockPartyRepository::new(), retry);
    let party = ctx.party_service.create_party(request("Busy")).await.unwrap();
    *ctx.parties.stale_follow_up_writes.lock().unwrap() = 2;

    let err = ctx
        .party_service
        .add_follow_up(party.id.unwrap(), Utc::now() + Duration::days(1), "never".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(ctx.parties.stored(party.id.unwrap()).follow_ups.is_empty());
}

#[tokio::test]
async fn test_follow_up_on_party_deleted_mid_write_is_not_found() {
    let retry = RetryConfig { follow_up_attempts: 1, ..RetryConfig::default() };
    let ctx = TestContext::with(MockPartyRepository::new(), retry);
    let party = ctx.party_service.create_party(request("Vanishing")).await.unwrap();
    *ctx.parties.delete_on_follow_up_write.lock().unwrap() = true;

    let err = ctx
        .party_service
        .add_follow_up(party.id.unwrap(), Utc::now() + Duration::days(1), "too late".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_upcoming_and_overdue_queries() {
    let ctx = TestContext::new();
    let due = ctx.party_service.create_party(request("Due")).await.unwrap();
    let late = ctx.party_service.create_party(request("Late")).await.unwrap();
    let inactive = ctx.party_service.create_party(request("Inactive")).await.unwrap();

    let day = NaiveDate::from_ymd_opt(2031, 3, 14).unwrap();
    let on_day = Utc.with_ymd_and_hms(2031, 3, 14, 23, 59, 59).unwrap();
    let past = Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap();

    ctx.party_service.add_follow_up(due.id.unwrap(), on_day, "on day".into()).await.unwrap();
    ctx.party_service.add_follow_up(late.id.unwrap(), past, "missed".into()).await.unwrap();
    ctx.party_service.add_follow_up(inactive.id.unwrap(), past, "ignored".into()).await.unwrap();
    ctx.party_service
        .update_party(inactive.id.unwrap(), PartyDetails { is_active: Some(false), ..PartyDetails::default() })
        .await
        .unwrap();

    let upcoming = ctx.party_service.upcoming_follow_ups(day).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, due.id);

    let overdue = ctx.party_service.overdue_follow_ups().await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, late.id);

    let next_day = day.succ_opt().unwrap();
    assert!(ctx.party_service.upcoming_follow_ups(next_day).await.unwrap().is_empty());
}
