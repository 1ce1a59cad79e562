#![feature(test)]
extern crate test;

use bson::oid::ObjectId;
use chrono::{Duration, TimeZone, Utc};
use test::Bencher;
use quotation_backend::domain::follow_up::{add_follow_up, recompute_next_follow_up};
use quotation_backend::domain::line_items::{normalize_line_items, CatalogRef, Numeric, RawLineItem};
use quotation_backend::domain::lineage::{plan_quotation, QuotationVersionRef};
use quotation_backend::domain::sequence::assign_identifier;
use quotation_backend::model::party::Party;

/// Benchmark: Next identifier from a parsed maximum
#[bench]
fn bench_assign_identifier(b: &mut Bencher) {
    b.iter(|| assign_identifier(Some("P0421"), 0));
}

/// Benchmark: Lineage plan over a 50-version history
#[bench]
fn bench_plan_quotation(b: &mut Bencher) {
    let root = ObjectId::new();
    let history: Vec<QuotationVersionRef> = (1..=50)
        .map(|version| QuotationVersionRef {
            id: if version == 1 { root } else { ObjectId::new() },
            version,
            original_quote: if version == 1 { None } else { Some(root) },
        })
        .collect();
    b.iter(|| plan_quotation(Some("P0042"), &history, None, None));
}

/// Benchmark: Normalize a 20-item quotation body
#[bench]
fn bench_normalize_line_items(b: &mut Bencher) {
    let item = RawLineItem {
        category: Some(CatalogRef::Id(ObjectId::new().to_hex())),
        brand: Some(CatalogRef::Object { id: ObjectId::new().to_hex() }),
        model: Some(CatalogRef::Id(ObjectId::new().to_hex())),
        quantity: Some(Numeric::Text("3".into())),
        sales_price: Some(Numeric::Number(1250.0)),
        ..RawLineItem::default()
    };
    let items = vec![item; 20];
    b.iter(|| normalize_line_items(&items));
}

/// Benchmark: Recompute projection over 200 follow-ups
#[bench]
fn bench_recompute_next_follow_up(b: &mut Bencher) {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    let mut party = Party {
        id: Some(ObjectId::new()),
        party_id: "P0001".into(),
        sequence: Some(1),
        name: "Bench".into(),
        phone: "0".into(),
        address: "-".into(),
        email: None,
        is_active: true,
        follow_ups: Vec::new(),
        next_follow_up: None,
        follow_up_revision: 0,
        created_at: None,
        updated_at: None,
    };
    for i in 0..200 {
        add_follow_up(&mut party, start + Duration::hours(i * 7), String::new(), start);
    }
    let now = start + Duration::days(20);
    b.iter(|| recompute_next_follow_up(&party.follow_ups, now));
}
