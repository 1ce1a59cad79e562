use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn, instrument};

use crate::config::retry_conf::RetryConfig;
use crate::domain::follow_up::{self, day_bounds};
use crate::domain::sequence::{assign_identifier, clock_identifier, parse_sequence, SequenceSource};
use crate::dto::party_dto::CreatePartyRequest;
use crate::model::party::{Party, PartyDetails, PartyStats};
use crate::repository::party_repo::PartyRepository;
use crate::repository::quotation_repo::QuotationCounter;
use crate::util::error::ServiceError;

#[async_trait]
pub trait PartyService: Send + Sync {
    async fn create_party(&self, request: CreatePartyRequest) -> Result<Party, ServiceError>;
    async fn get_party(&self, id: ObjectId) -> Result<Party, ServiceError>;
    async fn get_party_by_party_id(&self, party_id: &str) -> Result<Party, ServiceError>;
    async fn list_parties(&self) -> Result<Vec<Party>, ServiceError>;
    async fn update_party(&self, id: ObjectId, details: PartyDetails) -> Result<Party, ServiceError>;
    async fn delete_party(&self, id: ObjectId) -> Result<(), ServiceError>;
    async fn party_stats(&self) -> Result<PartyStats, ServiceError>;

    async fn add_follow_up(&self, id: ObjectId, scheduled_at: DateTime<Utc>, note: String) -> Result<Party, ServiceError>;
    async fn complete_follow_up(&self, id: ObjectId, follow_up_id: ObjectId) -> Result<Party, ServiceError>;
    async fn upcoming_follow_ups(&self, reference_date: NaiveDate) -> Result<Vec<Party>, ServiceError>;
    async fn overdue_follow_ups(&self) -> Result<Vec<Party>, ServiceError>;
}

pub struct PartyServiceImpl {
    pub party_repo: Arc<dyn PartyRepository>,
    /// Used by the deletion guard and the stats. Without it both skip quotation checks.
    pub quotation_counter: Option<Arc<dyn QuotationCounter>>,
    pub retry: RetryConfig,
}

impl PartyServiceImpl {
    pub fn new(
        party_repo: Arc<dyn PartyRepository>,
        quotation_counter: Option<Arc<dyn QuotationCounter>>,
        retry: RetryConfig,
    ) -> Self {
        PartyServiceImpl { party_repo, quotation_counter, retry }
    }

    fn build_party(request: &CreatePartyRequest, party_id: String, sequence: Option<u64>) -> Party {
        Party {
            id: None,
            party_id,
            sequence: sequence.and_then(|s| i64::try_from(s).ok()),
            name: request.name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            address: request.address.trim().to_string(),
            email: request
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            is_active: true,
            follow_ups: Vec::new(),
            next_follow_up: None,
            follow_up_revision: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Reads the party, applies `apply` and writes the follow-up list back
    /// guarded by the follow-up revision. A lost race re-reads and reapplies.
    async fn mutate_follow_ups<F>(&self, id: ObjectId, mut apply: F) -> Result<Party, ServiceError>
    where
        F: FnMut(&mut Party, DateTime<Utc>) -> Result<(), ServiceError> + Send,
    {
        for attempt in 1..=self.retry.follow_up_attempts {
            let mut party = self.party_repo.get_by_id(id).await?;
            let expected_revision = party.follow_up_revision;
            let now = Utc::now();
            apply(&mut party, now)?;

            let saved = self
                .party_repo
                .save_follow_ups(id, &party.follow_ups, party.next_follow_up.as_ref(), expected_revision)
                .await?;
            if saved {
                party.follow_up_revision = expected_revision + 1;
                party.updated_at = Some(now);
                return Ok(party);
            }
            warn!(party = %id, attempt, "Follow-up list changed concurrently, retrying");
        }
        // A failed write also means the party is gone; report that over a conflict
        self.party_repo.get_by_id(id).await?;
        Err(ServiceError::Conflict(format!(
            "Follow-ups of party {} kept changing; gave up after {} attempts",
            id, self.retry.follow_up_attempts
        )))
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(())
}

#[async_trait]
impl PartyService for PartyServiceImpl {
    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_party(&self, request: CreatePartyRequest) -> Result<Party, ServiceError> {
        require_non_blank("Name", &request.name)?;
        require_non_blank("Phone", &request.phone)?;
        require_non_blank("Address", &request.address)?;

        for attempt in 1..=self.retry.party_id_attempts {
            let latest = self.party_repo.find_latest_party_id().await?;
            let count = match latest.as_deref() {
                Some(id) if parse_sequence(id).is_none() => self.party_repo.count().await?,
                _ => 0,
            };
            let assignment = assign_identifier(latest.as_deref(), count);
            if assignment.source == SequenceSource::CountFallback {
                warn!(latest = ?latest, fallback = %assignment.party_id, "Latest party identifier is malformed, using record count");
            }

            let party = Self::build_party(&request, assignment.party_id.clone(), Some(assignment.sequence));
            match self.party_repo.insert(party).await {
                Ok(created) => {
                    info!(party_id = %created.party_id, attempt, "Party created");
                    return Ok(created);
                }
                Err(e) if e.is_already_exists() => {
                    warn!(party_id = %assignment.party_id, attempt, "Party identifier already taken, reassigning");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let party_id = clock_identifier(Utc::now());
        warn!(
            party_id = %party_id,
            attempts = self.retry.party_id_attempts,
            "Identifier retries exhausted, falling back to clock-derived identifier"
        );
        let created = self
            .party_repo
            .insert(Self::build_party(&request, party_id, None))
            .await?;
        info!(party_id = %created.party_id, "Party created");
        Ok(created)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_party(&self, id: ObjectId) -> Result<Party, ServiceError> {
        Ok(self.party_repo.get_by_id(id).await?)
    }

    #[instrument(skip(self))]
    async fn get_party_by_party_id(&self, party_id: &str) -> Result<Party, ServiceError> {
        Ok(self.party_repo.find_by_party_id(party_id.trim()).await?)
    }

    #[instrument(skip(self))]
    async fn list_parties(&self) -> Result<Vec<Party>, ServiceError> {
        Ok(self.party_repo.list().await?)
    }

    #[instrument(skip(self, details), fields(id = %id))]
    async fn update_party(&self, id: ObjectId, details: PartyDetails) -> Result<Party, ServiceError> {
        for (field, value) in [("Name", &details.name), ("Phone", &details.phone), ("Address", &details.address)] {
            if let Some(value) = value {
                require_non_blank(field, value)?;
            }
        }
        let updated = self.party_repo.update_details(id, details).await?;
        info!(party_id = %updated.party_id, "Party updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_party(&self, id: ObjectId) -> Result<(), ServiceError> {
        match &self.quotation_counter {
            Some(counter) => {
                let quotations = counter.count_by_party(id).await?;
                if quotations > 0 {
                    warn!(quotations, "Refusing to delete party with quotations");
                    return Err(ServiceError::Conflict(format!(
                        "Cannot delete party. It has {} associated quotation(s). Please delete the quotations first.",
                        quotations
                    )));
                }
            }
            None => info!("No quotation store configured, skipping quotation check before delete"),
        }
        self.party_repo.delete(id).await?;
        info!("Party deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn party_stats(&self) -> Result<PartyStats, ServiceError> {
        let total_parties = self.party_repo.count().await?;
        let parties_with_quotations = match &self.quotation_counter {
            Some(counter) => counter.count_parties_with_quotations().await?,
            None => {
                info!("No quotation store configured, skipping quotation stats");
                0
            }
        };
        Ok(PartyStats {
            total_parties,
            parties_with_quotations,
            parties_without_quotations: total_parties.saturating_sub(parties_with_quotations),
            quotation_model_available: self.quotation_counter.is_some(),
        })
    }

    #[instrument(skip(self, note), fields(id = %id, scheduled_at = %scheduled_at))]
    async fn add_follow_up(&self, id: ObjectId, scheduled_at: DateTime<Utc>, note: String) -> Result<Party, ServiceError> {
        let note = note.trim().to_string();
        let party = self
            .mutate_follow_ups(id, |party, now| {
                follow_up::add_follow_up(party, scheduled_at, note.clone(), now);
                Ok(())
            })
            .await?;
        info!(next = ?party.next_follow_up.as_ref().map(|n| n.scheduled_at), "Follow-up added");
        Ok(party)
    }

    #[instrument(skip(self), fields(id = %id, follow_up_id = %follow_up_id))]
    async fn complete_follow_up(&self, id: ObjectId, follow_up_id: ObjectId) -> Result<Party, ServiceError> {
        let party = self
            .mutate_follow_ups(id, |party, now| {
                follow_up::complete_follow_up(party, follow_up_id, now)?;
                Ok(())
            })
            .await?;
        info!(next = ?party.next_follow_up.as_ref().map(|n| n.scheduled_at), "Follow-up completed");
        Ok(party)
    }

    #[instrument(skip(self))]
    async fn upcoming_follow_ups(&self, reference_date: NaiveDate) -> Result<Vec<Party>, ServiceError> {
        let (start, end) = day_bounds(reference_date);
        let candidates = self.party_repo.find_upcoming(start, end).await?;
        Ok(follow_up::upcoming(candidates, reference_date))
    }

    #[instrument(skip(self))]
    async fn overdue_follow_ups(&self) -> Result<Vec<Party>, ServiceError> {
        let now = Utc::now();
        let candidates = self.party_repo.find_overdue(now).await?;
        Ok(follow_up::overdue(candidates, now))
    }
}
