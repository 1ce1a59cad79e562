use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, warn, instrument};

use crate::config::retry_conf::RetryConfig;
use crate::domain::line_items::{normalize_amount, normalize_line_items, CatalogReferences, Numeric};
use crate::domain::lineage::{plan_quotation, max_version, LineageAnomaly, LineagePlan, QuotationVersionRef};
use crate::dto::quotation_dto::{CreateQuotationRequest, ReviseQuotationRequest, UpdateQuotationRequest};
use crate::model::quotation::{LineItem, Quotation, QuotationContent, QuotationStats, QuotationStatus};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::party_repo::PartyRepository;
use crate::repository::quotation_repo::QuotationRepository;
use crate::util::error::ServiceError;

#[async_trait]
pub trait QuotationService: Send + Sync {
    async fn create_quotation(&self, request: CreateQuotationRequest) -> Result<Quotation, ServiceError>;
    async fn revise_quotation(&self, source_id: ObjectId, request: ReviseQuotationRequest) -> Result<Quotation, ServiceError>;
    async fn get_quotation(&self, id: ObjectId) -> Result<Quotation, ServiceError>;
    async fn list_quotations(&self, page: u32, limit: u32) -> Result<Vec<Quotation>, ServiceError>;
    /// A party's quotations, lowest version first.
    async fn list_party_quotations(&self, party: ObjectId) -> Result<Vec<Quotation>, ServiceError>;
    async fn update_quotation(&self, id: ObjectId, request: UpdateQuotationRequest) -> Result<Quotation, ServiceError>;
    async fn update_status(&self, id: ObjectId, status: &str) -> Result<Quotation, ServiceError>;
    async fn delete_quotation(&self, id: ObjectId) -> Result<Quotation, ServiceError>;
    async fn quotation_stats(&self) -> Result<QuotationStats, ServiceError>;
}

pub struct QuotationServiceImpl {
    pub quotation_repo: Arc<dyn QuotationRepository>,
    pub party_repo: Arc<dyn PartyRepository>,
    pub catalog_repo: Arc<dyn CatalogRepository>,
    pub retry: RetryConfig,
}

/// Normalized quotation body, ready to be stamped with a lineage plan.
#[derive(Clone)]
struct QuotationBody {
    components: Vec<LineItem>,
    total_amount: f64,
    total_purchase: f64,
    total_tax: f64,
    notes: String,
    terms_and_conditions: String,
    status: QuotationStatus,
}

fn parse_status(raw: Option<&str>) -> Result<Option<QuotationStatus>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<QuotationStatus>().map(Some).map_err(ServiceError::InvalidInput),
    }
}

fn optional_amount(field: &'static str, value: Option<&Numeric>) -> Result<Option<f64>, ServiceError> {
    match value {
        None => Ok(None),
        Some(v) => Ok(Some(normalize_amount(field, Some(v))?)),
    }
}

impl QuotationServiceImpl {
    pub fn new(
        quotation_repo: Arc<dyn QuotationRepository>,
        party_repo: Arc<dyn PartyRepository>,
        catalog_repo: Arc<dyn CatalogRepository>,
        retry: RetryConfig,
    ) -> Self {
        QuotationServiceImpl { quotation_repo, party_repo, catalog_repo, retry }
    }

    async fn ensure_catalog_references(&self, components: &[LineItem]) -> Result<(), ServiceError> {
        let references = CatalogReferences::from_items(components);
        let missing = self.catalog_repo.missing_references(&references).await?;
        if !missing.is_empty() {
            return Err(ServiceError::InvalidInput(format!("Components reference {}", missing)));
        }
        Ok(())
    }

    /// Plans lineage for the next quotation of `party` and inserts it.
    /// A `(party, version)` collision with a concurrent writer re-reads the
    /// history and plans again, up to `quotation_attempts` times.
    async fn insert_planned(
        &self,
        party: ObjectId,
        revision_source: Option<ObjectId>,
        body: QuotationBody,
    ) -> Result<Quotation, ServiceError> {
        let party_record = self.party_repo.get_by_id(party).await?;

        for attempt in 1..=self.retry.quotation_attempts {
            let plan = self.plan_next(party, &party_record.party_id, revision_source).await?;
            let quotation = Quotation {
                id: None,
                title: plan.title,
                party,
                version: plan.version,
                original_quote: plan.original_quote,
                components: body.components.clone(),
                total_amount: body.total_amount,
                total_purchase: body.total_purchase,
                total_tax: body.total_tax,
                notes: body.notes.clone(),
                terms_and_conditions: body.terms_and_conditions.clone(),
                status: body.status,
                created_at: None,
                updated_at: None,
            };
            match self.quotation_repo.insert(quotation).await {
                Ok(created) => {
                    info!(title = %created.title, version = created.version, attempt, "Quotation saved");
                    return Ok(created);
                }
                Err(e) if e.is_already_exists() => {
                    warn!(party = %party, version = plan.version, attempt, "Quotation version already taken, replanning");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict(format!(
            "Quotation versions of party {} kept changing; gave up after {} attempts",
            party, self.retry.quotation_attempts
        )))
    }

    async fn plan_next(
        &self,
        party: ObjectId,
        party_id: &str,
        revision_source: Option<ObjectId>,
    ) -> Result<LineagePlan, ServiceError> {
        let existing: Vec<QuotationVersionRef> = self
            .quotation_repo
            .find_by_party(party)
            .await?
            .iter()
            .filter_map(QuotationVersionRef::from_quotation)
            .collect();

        let reserved_version = if existing.is_empty() {
            None
        } else {
            self.party_repo.reserve_quotation_version(party, max_version(&existing)).await?
        };
        if reserved_version.is_none() && !existing.is_empty() {
            warn!(party = %party, "No version counter available, using highest stored version");
        }

        let plan = plan_quotation(Some(party_id), &existing, revision_source, reserved_version);
        for anomaly in &plan.anomalies {
            match anomaly {
                LineageAnomaly::MissingRoot { anchored_to } => {
                    warn!(party = %party, anchored_to = %anchored_to, "Version 1 quotation missing, anchoring lineage elsewhere");
                }
                LineageAnomaly::UnresolvedParty => {
                    warn!(party = %party, "Party has no identifier, refusing to title quotation");
                }
            }
        }
        if plan.has_unresolved_party() {
            return Err(ServiceError::NotFound(format!("Party {} has no party identifier", party)));
        }
        Ok(plan)
    }
}

#[async_trait]
impl QuotationService for QuotationServiceImpl {
    #[instrument(skip(self, request), fields(party = %request.party))]
    async fn create_quotation(&self, request: CreateQuotationRequest) -> Result<Quotation, ServiceError> {
        let party = ObjectId::parse_str(request.party.trim())
            .map_err(|_| ServiceError::InvalidInput(format!("Invalid party id: {}", request.party)))?;
        // Existence first so an unknown party reads as NotFound rather than a component error
        self.party_repo.get_by_id(party).await?;

        let components = normalize_line_items(&request.components)?;
        self.ensure_catalog_references(&components).await?;

        let body = QuotationBody {
            components,
            total_amount: normalize_amount("totalAmount", request.total_amount.as_ref())?,
            total_purchase: normalize_amount("totalPurchase", request.total_purchase.as_ref())?,
            total_tax: normalize_amount("totalTax", request.total_tax.as_ref())?,
            notes: request.notes.unwrap_or_default(),
            terms_and_conditions: request.terms_and_conditions.unwrap_or_default(),
            status: parse_status(request.status.as_deref())?.unwrap_or_default(),
        };
        self.insert_planned(party, None, body).await
    }

    #[instrument(skip(self, request), fields(source = %source_id))]
    async fn revise_quotation(&self, source_id: ObjectId, request: ReviseQuotationRequest) -> Result<Quotation, ServiceError> {
        let source = self.quotation_repo.get_by_id(source_id).await?;

        let components = match request.components.as_deref() {
            Some(raw) => {
                let components = normalize_line_items(raw)?;
                self.ensure_catalog_references(&components).await?;
                components
            }
            None => source.components.clone(),
        };

        let body = QuotationBody {
            components,
            total_amount: optional_amount("totalAmount", request.total_amount.as_ref())?.unwrap_or(source.total_amount),
            total_purchase: optional_amount("totalPurchase", request.total_purchase.as_ref())?.unwrap_or(source.total_purchase),
            total_tax: optional_amount("totalTax", request.total_tax.as_ref())?.unwrap_or(source.total_tax),
            notes: request.notes.unwrap_or(source.notes),
            terms_and_conditions: request.terms_and_conditions.unwrap_or(source.terms_and_conditions),
            status: parse_status(request.status.as_deref())?.unwrap_or_default(),
        };
        self.insert_planned(source.party, Some(source_id), body).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_quotation(&self, id: ObjectId) -> Result<Quotation, ServiceError> {
        Ok(self.quotation_repo.get_by_id(id).await?)
    }

    #[instrument(skip(self))]
    async fn list_quotations(&self, page: u32, limit: u32) -> Result<Vec<Quotation>, ServiceError> {
        if page == 0 || limit == 0 {
            return Err(ServiceError::InvalidInput("page and limit must be at least 1".to_string()));
        }
        Ok(self.quotation_repo.list(page, limit).await?)
    }

    #[instrument(skip(self), fields(party = %party))]
    async fn list_party_quotations(&self, party: ObjectId) -> Result<Vec<Quotation>, ServiceError> {
        let mut quotations = self.quotation_repo.find_by_party(party).await?;
        quotations.sort_by_key(|q| q.version);
        Ok(quotations)
    }

    #[instrument(skip(self, request), fields(id = %id))]
    async fn update_quotation(&self, id: ObjectId, request: UpdateQuotationRequest) -> Result<Quotation, ServiceError> {
        let components = match request.components.as_deref() {
            Some(raw) => {
                let components = normalize_line_items(raw)?;
                self.ensure_catalog_references(&components).await?;
                Some(components)
            }
            None => None,
        };
        let content = QuotationContent {
            components,
            total_amount: optional_amount("totalAmount", request.total_amount.as_ref())?,
            total_purchase: optional_amount("totalPurchase", request.total_purchase.as_ref())?,
            total_tax: optional_amount("totalTax", request.total_tax.as_ref())?,
            notes: request.notes,
            terms_and_conditions: request.terms_and_conditions,
            status: parse_status(request.status.as_deref())?,
        };
        let updated = self.quotation_repo.update_content(id, content).await?;
        info!(title = %updated.title, "Quotation updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id, status = %status))]
    async fn update_status(&self, id: ObjectId, status: &str) -> Result<Quotation, ServiceError> {
        let status = parse_status(Some(status))?
            .ok_or_else(|| ServiceError::InvalidInput("status is required".to_string()))?;
        Ok(self.quotation_repo.update_status(id, status).await?)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_quotation(&self, id: ObjectId) -> Result<Quotation, ServiceError> {
        let quotation = self.quotation_repo.get_by_id(id).await?;
        self.quotation_repo.delete(id).await?;
        info!(title = %quotation.title, "Quotation deleted");
        Ok(quotation)
    }

    #[instrument(skip(self))]
    async fn quotation_stats(&self) -> Result<QuotationStats, ServiceError> {
        Ok(QuotationStats {
            total_quotations: self.quotation_repo.count().await?,
            status_breakdown: self.quotation_repo.status_breakdown().await?,
        })
    }
}
