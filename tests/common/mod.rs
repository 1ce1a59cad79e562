#![allow(dead_code)]

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quotation_backend::config::retry_conf::RetryConfig;
use quotation_backend::domain::line_items::{CatalogRef, CatalogReferences, Numeric, RawLineItem};
use quotation_backend::model::catalog::{Brand, Category, ProductModel};
use quotation_backend::model::party::{FollowUp, NextFollowUp, Party, PartyDetails};
use quotation_backend::model::quotation::{Quotation, QuotationContent, QuotationStatus, StatusBreakdown};
use quotation_backend::repository::catalog_repo::{CatalogRepository, MissingReferences};
use quotation_backend::repository::party_repo::PartyRepository;
use quotation_backend::repository::quotation_repo::{QuotationCounter, QuotationRepository};
use quotation_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use quotation_backend::service::catalog_service::CatalogServiceImpl;
use quotation_backend::service::party_service::PartyServiceImpl;
use quotation_backend::service::quotation_service::QuotationServiceImpl;

/// Initialize tracing for tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// In-memory party store enforcing the unique `partyId` constraint.
#[derive(Clone, Default)]
pub struct MockPartyRepository {
    pub parties: Arc<Mutex<Vec<Party>>>,
    pub version_counters: Arc<Mutex<HashMap<ObjectId, u32>>>,
    /// When false `reserve_quotation_version` reports no counter.
    pub with_version_counter: bool,
    /// Every `P<digits>` insert is rejected as a duplicate.
    pub reject_sequenced_ids: bool,
    /// Number of follow-up writes to lose to a simulated concurrent writer.
    pub stale_follow_up_writes: Arc<Mutex<u32>>,
    pub insert_attempts: Arc<Mutex<Vec<String>>>,
    /// The party disappears during its next follow-up write.
    pub delete_on_follow_up_write: Arc<Mutex<bool>>,
}

impl MockPartyRepository {
    pub fn new() -> Self {
        Self { with_version_counter: true, ..Self::default() }
    }

    pub fn without_version_counter() -> Self {
        Self::default()
    }

    pub fn seed(&self, party: Party) -> Party {
        let mut party = party;
        if party.id.is_none() {
            party.id = Some(ObjectId::new());
        }
        self.parties.lock().unwrap().push(party.clone());
        party
    }

    pub fn stored(&self, id: ObjectId) -> Party {
        self.parties.lock().unwrap().iter().find(|p| p.id == Some(id)).cloned().unwrap()
    }
}

pub fn party_fixture(party_id: &str) -> Party {
    Party {
        id: None,
        party_id: party_id.to_string(),
        sequence: quotation_backend::domain::sequence::parse_sequence(party_id).map(|s| s as i64),
        name: format!("Party {}", party_id),
        phone: "9876543210".to_string(),
        address: "12 Market Road".to_string(),
        email: None,
        is_active: true,
        follow_ups: Vec::new(),
        next_follow_up: None,
        follow_up_revision: 0,
        created_at: None,
        updated_at: None,
    }
}

#[async_trait]
impl PartyRepository for MockPartyRepository {
    async fn find_latest_party_id(&self) -> RepositoryResult<Option<String>> {
        let parties = self.parties.lock().unwrap();
        Ok(parties
            .iter()
            .filter(|p| !p.party_id.is_empty())
            .max_by_key(|p| (p.sequence.unwrap_or(i64::MIN), p.party_id.clone()))
            .map(|p| p.party_id.clone()))
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.parties.lock().unwrap().len() as u64)
    }

    async fn insert(&self, party: Party) -> RepositoryResult<Party> {
        self.insert_attempts.lock().unwrap().push(party.party_id.clone());
        let mut parties = self.parties.lock().unwrap();
        let sequenced = quotation_backend::domain::sequence::parse_sequence(&party.party_id).is_some();
        if (self.reject_sequenced_ids && sequenced) || parties.iter().any(|p| p.party_id == party.party_id) {
            return Err(RepositoryError::already_exists(format!("E11000 duplicate key partyId {}", party.party_id)));
        }
        let mut party = party;
        party.id = Some(party.id.unwrap_or_else(ObjectId::new));
        party.created_at = Some(Utc::now());
        party.updated_at = party.created_at;
        parties.push(party.clone());
        Ok(party)
    }

    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Party> {
        self.parties
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Party not found for ID: {}", id)))
    }

    async fn find_by_party_id(&self, party_id: &str) -> RepositoryResult<Party> {
        self.parties
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.party_id == party_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Party not found with partyId: {}", party_id)))
    }

    async fn list(&self) -> RepositoryResult<Vec<Party>> {
        let mut parties = self.parties.lock().unwrap().clone();
        parties.sort_by(|a, b| a.party_id.cmp(&b.party_id));
        Ok(parties)
    }

    async fn update_details(&self, id: ObjectId, details: PartyDetails) -> RepositoryResult<Party> {
        let mut parties = self.parties.lock().unwrap();
        let party = parties
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found("No party found to update"))?;
        if let Some(name) = details.name {
            party.name = name;
        }
        if let Some(phone) = details.phone {
            party.phone = phone;
        }
        if let Some(address) = details.address {
            party.address = address;
        }
        if let Some(email) = details.email {
            party.email = Some(email).filter(|e| !e.is_empty());
        }
        if let Some(is_active) = details.is_active {
            party.is_active = is_active;
        }
        party.updated_at = Some(Utc::now());
        Ok(party.clone())
    }

    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        let mut parties = self.parties.lock().unwrap();
        let before = parties.len();
        parties.retain(|p| p.id != Some(id));
        if parties.len() == before {
            return Err(RepositoryError::not_found("No party found to delete"));
        }
        Ok(())
    }

    async fn save_follow_ups(
        &self,
        id: ObjectId,
        follow_ups: &[FollowUp],
        next_follow_up: Option<&NextFollowUp>,
        expected_revision: i64,
    ) -> RepositoryResult<bool> {
        let mut parties = self.parties.lock().unwrap();
        if std::mem::take(&mut *self.delete_on_follow_up_write.lock().unwrap()) {
            parties.retain(|p| p.id != Some(id));
        }
        let Some(party) = parties.iter_mut().find(|p| p.id == Some(id)) else {
            return Ok(false);
        };
        let mut stale = self.stale_follow_up_writes.lock().unwrap();
        if *stale > 0 {
            *stale -= 1;
            // Another writer got there first
            party.follow_up_revision += 1;
            return Ok(false);
        }
        if party.follow_up_revision != expected_revision {
            return Ok(false);
        }
        party.follow_ups = follow_ups.to_vec();
        party.next_follow_up = next_follow_up.cloned();
        party.follow_up_revision += 1;
        Ok(true)
    }

    async fn find_upcoming(&self, _start: DateTime<Utc>, _end: DateTime<Utc>) -> RepositoryResult<Vec<Party>> {
        // Unfiltered on purpose: the service must narrow the candidates itself
        Ok(self.parties.lock().unwrap().clone())
    }

    async fn find_overdue(&self, _before: DateTime<Utc>) -> RepositoryResult<Vec<Party>> {
        Ok(self.parties.lock().unwrap().clone())
    }

    async fn reserve_quotation_version(&self, id: ObjectId, floor: u32) -> RepositoryResult<Option<u32>> {
        if !self.with_version_counter {
            return Ok(None);
        }
        let mut counters = self.version_counters.lock().unwrap();
        let counter = counters.entry(id).or_insert(0);
        *counter = (*counter).max(floor) + 1;
        Ok(Some(*counter))
    }
}

/// In-memory quotation store enforcing the unique `(party, version)` constraint.
#[derive(Clone, Default)]
pub struct MockQuotationRepository {
    pub quotations: Arc<Mutex<Vec<Quotation>>>,
    /// Delay before each history read, widening the window between planning and insert.
    pub history_delay: Option<Duration>,
}

impl MockQuotationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_delay(delay: Duration) -> Self {
        Self { history_delay: Some(delay), ..Self::default() }
    }

    pub fn seed(&self, party: ObjectId, version: u32, original_quote: Option<ObjectId>) -> Quotation {
        let quotation = Quotation {
            id: Some(ObjectId::new()),
            title: format!("seeded-{}", version),
            party,
            version,
            original_quote,
            components: Vec::new(),
            total_amount: 100.0 * f64::from(version),
            total_purchase: 0.0,
            total_tax: 0.0,
            notes: String::new(),
            terms_and_conditions: String::new(),
            status: QuotationStatus::Draft,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.quotations.lock().unwrap().push(quotation.clone());
        quotation
    }
}

#[async_trait]
impl QuotationCounter for MockQuotationRepository {
    async fn count_by_party(&self, party: ObjectId) -> RepositoryResult<u64> {
        Ok(self.quotations.lock().unwrap().iter().filter(|q| q.party == party).count() as u64)
    }

    async fn count_parties_with_quotations(&self) -> RepositoryResult<u64> {
        let quotations = self.quotations.lock().unwrap();
        let mut parties: Vec<ObjectId> = quotations.iter().map(|q| q.party).collect();
        parties.sort();
        parties.dedup();
        Ok(parties.len() as u64)
    }
}

#[async_trait]
impl QuotationRepository for MockQuotationRepository {
    async fn insert(&self, quotation: Quotation) -> RepositoryResult<Quotation> {
        let mut quotations = self.quotations.lock().unwrap();
        if quotations.iter().any(|q| q.party == quotation.party && q.version == quotation.version) {
            return Err(RepositoryError::already_exists(format!(
                "E11000 duplicate key party {} version {}",
                quotation.party, quotation.version
            )));
        }
        let mut quotation = quotation;
        quotation.id = Some(ObjectId::new());
        quotation.created_at = Some(Utc::now());
        quotation.updated_at = quotation.created_at;
        quotations.push(quotation.clone());
        Ok(quotation)
    }

    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quotation> {
        self.quotations
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Quotation not found for ID: {}", id)))
    }

    async fn list(&self, page: u32, limit: u32) -> RepositoryResult<Vec<Quotation>> {
        let quotations = self.quotations.lock().unwrap();
        Ok(quotations
            .iter()
            .rev()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_by_party(&self, party: ObjectId) -> RepositoryResult<Vec<Quotation>> {
        if let Some(delay) = self.history_delay {
            tokio::time::sleep(delay).await;
        }
        let mut found: Vec<Quotation> =
            self.quotations.lock().unwrap().iter().filter(|q| q.party == party).cloned().collect();
        found.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(found)
    }

    async fn update_content(&self, id: ObjectId, content: QuotationContent) -> RepositoryResult<Quotation> {
        let mut quotations = self.quotations.lock().unwrap();
        let quotation = quotations
            .iter_mut()
            .find(|q| q.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found("No quotation found to update"))?;
        if let Some(components) = content.components {
            quotation.components = components;
        }
        if let Some(v) = content.total_amount {
            quotation.total_amount = v;
        }
        if let Some(v) = content.total_purchase {
            quotation.total_purchase = v;
        }
        if let Some(v) = content.total_tax {
            quotation.total_tax = v;
        }
        if let Some(notes) = content.notes {
            quotation.notes = notes;
        }
        if let Some(terms) = content.terms_and_conditions {
            quotation.terms_and_conditions = terms;
        }
        if let Some(status) = content.status {
            quotation.status = status;
        }
        quotation.updated_at = Some(Utc::now());
        Ok(quotation.clone())
    }

    async fn update_status(&self, id: ObjectId, status: QuotationStatus) -> RepositoryResult<Quotation> {
        self.update_content(id, QuotationContent { status: Some(status), ..QuotationContent::default() }).await
    }

    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        let mut quotations = self.quotations.lock().unwrap();
        let before = quotations.len();
        quotations.retain(|q| q.id != Some(id));
        if quotations.len() == before {
            return Err(RepositoryError::not_found("No quotation found to delete"));
        }
        Ok(())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.quotations.lock().unwrap().len() as u64)
    }

    async fn status_breakdown(&self) -> RepositoryResult<Vec<StatusBreakdown>> {
        let quotations = self.quotations.lock().unwrap();
        let mut groups: Vec<StatusBreakdown> = Vec::new();
        for q in quotations.iter() {
            match groups.iter_mut().find(|g| g.status == q.status.as_str()) {
                Some(group) => {
                    group.count += 1;
                    group.total_amount += q.total_amount;
                }
                None => groups.push(StatusBreakdown {
                    status: q.status.as_str().to_string(),
                    count: 1,
                    total_amount: q.total_amount,
                }),
            }
        }
        groups.sort_by(|a, b| a.status.cmp(&b.status));
        Ok(groups)
    }
}

#[derive(Clone, Default)]
pub struct MockCatalogRepository {
    pub categories: Arc<Mutex<Vec<Category>>>,
    pub brands: Arc<Mutex<Vec<Brand>>>,
    pub models: Arc<Mutex<Vec<ProductModel>>>,
}

/// Ids of one seeded category, brand and model.
#[derive(Debug, Clone, Copy)]
pub struct CatalogIds {
    pub category: ObjectId,
    pub brand: ObjectId,
    pub model: ObjectId,
}

impl MockCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self) -> CatalogIds {
        let ids = CatalogIds { category: ObjectId::new(), brand: ObjectId::new(), model: ObjectId::new() };
        self.categories.lock().unwrap().push(Category { id: Some(ids.category), name: "Laptops".into(), created_at: None });
        self.brands.lock().unwrap().push(Brand { id: Some(ids.brand), name: "Lenovo".into(), created_at: None });
        self.models.lock().unwrap().push(ProductModel {
            id: Some(ids.model),
            name: "ThinkPad E14".into(),
            category: ids.category,
            brand: ids.brand,
            hsn: "8471".into(),
            warranty: "1 year".into(),
            purchase_price: 50000.0,
            sales_price: 56000.0,
            gst_rate: 18.0,
            created_at: None,
        });
        ids
    }
}

#[async_trait]
impl CatalogRepository for MockCatalogRepository {
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn create_category(&self, category: Category) -> RepositoryResult<Category> {
        let mut category = category;
        category.id = Some(ObjectId::new());
        self.categories.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn list_brands(&self) -> RepositoryResult<Vec<Brand>> {
        Ok(self.brands.lock().unwrap().clone())
    }

    async fn create_brand(&self, brand: Brand) -> RepositoryResult<Brand> {
        let mut brand = brand;
        brand.id = Some(ObjectId::new());
        self.brands.lock().unwrap().push(brand.clone());
        Ok(brand)
    }

    async fn list_models(&self) -> RepositoryResult<Vec<ProductModel>> {
        Ok(self.models.lock().unwrap().clone())
    }

    async fn create_model(&self, model: ProductModel) -> RepositoryResult<ProductModel> {
        let mut model = model;
        model.id = Some(ObjectId::new());
        self.models.lock().unwrap().push(model.clone());
        Ok(model)
    }

    async fn search_models(&self, term: &str) -> RepositoryResult<Vec<ProductModel>> {
        let term = term.to_lowercase();
        Ok(self
            .models
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&term) || m.hsn.to_lowercase().contains(&term))
            .take(10)
            .cloned()
            .collect())
    }

    async fn missing_references(&self, references: &CatalogReferences) -> RepositoryResult<MissingReferences> {
        let categories = self.categories.lock().unwrap();
        let brands = self.brands.lock().unwrap();
        let models = self.models.lock().unwrap();
        Ok(MissingReferences {
            categories: references.categories.iter().filter(|id| !categories.iter().any(|c| c.id == Some(**id))).copied().collect(),
            brands: references.brands.iter().filter(|id| !brands.iter().any(|b| b.id == Some(**id))).copied().collect(),
            models: references.models.iter().filter(|id| !models.iter().any(|m| m.id == Some(**id))).copied().collect(),
        })
    }
}

pub fn raw_item(ids: CatalogIds) -> RawLineItem {
    RawLineItem {
        category: Some(CatalogRef::Id(ids.category.to_hex())),
        brand: Some(CatalogRef::Object { id: ids.brand.to_hex() }),
        model: Some(CatalogRef::Id(ids.model.to_hex())),
        hsn: Some("8471".into()),
        warranty: Some("1 year".into()),
        quantity: Some(Numeric::Text("2".into())),
        purchase_price: Some(Numeric::Number(50000.0)),
        sales_price: Some(Numeric::Text("56000".into())),
        gst_rate: None,
    }
}

/// Wired services sharing one set of mock stores.
pub struct TestContext {
    pub parties: MockPartyRepository,
    pub quotations: MockQuotationRepository,
    pub catalog: MockCatalogRepository,
    pub party_service: Arc<PartyServiceImpl>,
    pub quotation_service: Arc<QuotationServiceImpl>,
    pub catalog_service: Arc<CatalogServiceImpl>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with(MockPartyRepository::new(), RetryConfig::default())
    }

    pub fn with(parties: MockPartyRepository, retry: RetryConfig) -> Self {
        Self::with_stores(parties, MockQuotationRepository::new(), retry)
    }

    pub fn with_stores(parties: MockPartyRepository, quotations: MockQuotationRepository, retry: RetryConfig) -> Self {
        let catalog = MockCatalogRepository::new();
        let party_service = Arc::new(PartyServiceImpl::new(
            Arc::new(parties.clone()),
            Some(Arc::new(quotations.clone()) as Arc<dyn QuotationCounter>),
            retry,
        ));
        let quotation_service = Arc::new(QuotationServiceImpl::new(
            Arc::new(quotations.clone()),
            Arc::new(parties.clone()),
            Arc::new(catalog.clone()),
            retry,
        ));
        let catalog_service = Arc::new(CatalogServiceImpl::new(Arc::new(catalog.clone())));
        TestContext { parties, quotations, catalog, party_service, quotation_service, catalog_service }
    }
}
