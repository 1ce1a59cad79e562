//! Follow-up scheduling for parties
//!
//! A party keeps an append-only list of follow-ups and a cached
//! `next_follow_up` projection used by the reminder queries. Adding only ever
//! moves the projection earlier. Completing the follow-up the projection
//! points at rebuilds it from the full list.

use bson::oid::ObjectId;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::model::party::{FollowUp, NextFollowUp, Party};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FollowUpError {
    #[error("Follow-up {0} not found")]
    NotFound(ObjectId),
}

/// Appends a pending follow-up and returns the resulting projection.
pub fn add_follow_up(party: &mut Party, scheduled_at: DateTime<Utc>, note: String, now: DateTime<Utc>) -> Option<NextFollowUp> {
    let follow_up = FollowUp {
        id: ObjectId::new(),
        scheduled_at,
        note,
        completed: false,
        completed_at: None,
        created_at: now,
    };

    let replaces = match &party.next_follow_up {
        None => true,
        Some(current) => follow_up.scheduled_at < current.scheduled_at,
    };
    if replaces {
        party.next_follow_up = Some(NextFollowUp::from(&follow_up));
    }
    party.follow_ups.push(follow_up);
    party.next_follow_up.clone()
}

/// Marks a follow-up completed and returns the resulting projection.
///
/// Completing an already completed follow-up keeps its first timestamp.
pub fn complete_follow_up(party: &mut Party, follow_up_id: ObjectId, now: DateTime<Utc>) -> Result<Option<NextFollowUp>, FollowUpError> {
    let follow_up = party
        .follow_ups
        .iter_mut()
        .find(|f| f.id == follow_up_id)
        .ok_or(FollowUpError::NotFound(follow_up_id))?;

    if !follow_up.completed {
        follow_up.completed = true;
        follow_up.completed_at = Some(now);
    }

    let was_projected = party
        .next_follow_up
        .as_ref()
        .is_some_and(|next| next.follow_up_id == follow_up_id);
    if was_projected {
        party.next_follow_up = recompute_next_follow_up(&party.follow_ups, now);
    }
    Ok(party.next_follow_up.clone())
}

/// Earliest incomplete follow-up scheduled strictly after `now`.
pub fn recompute_next_follow_up(follow_ups: &[FollowUp], now: DateTime<Utc>) -> Option<NextFollowUp> {
    follow_ups
        .iter()
        .filter(|f| !f.completed && f.scheduled_at > now)
        .min_by_key(|f| f.scheduled_at)
        .map(NextFollowUp::from)
}

/// Inclusive UTC bounds of the day containing `date`.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

fn projected_at(party: &Party) -> Option<DateTime<Utc>> {
    party.next_follow_up.as_ref().map(|next| next.scheduled_at)
}

fn sorted_by_projection(mut parties: Vec<Party>) -> Vec<Party> {
    parties.sort_by_key(projected_at);
    parties
}

/// Active parties whose next follow-up falls on `reference_date`.
pub fn upcoming(parties: Vec<Party>, reference_date: NaiveDate) -> Vec<Party> {
    let (start, end) = day_bounds(reference_date);
    sorted_by_projection(
        parties
            .into_iter()
            .filter(|p| p.is_active)
            .filter(|p| projected_at(p).is_some_and(|at| at >= start && at <= end))
            .collect(),
    )
}

/// Active parties whose next follow-up is before `now`.
pub fn overdue(parties: Vec<Party>, now: DateTime<Utc>) -> Vec<Party> {
    sorted_by_projection(
        parties
            .into_iter()
            .filter(|p| p.is_active)
            .filter(|p| projected_at(p).is_some_and(|at| at < now))
            .collect(),
    )
}
