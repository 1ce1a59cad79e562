use crate::model::quotation::{Quotation, QuotationContent, QuotationStatus, StatusBreakdown};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::config::mongo_conf::MongoConfig;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Database, IndexModel};
use tracing::{debug, error, info};

/// Read-only view used by the party deletion guard.
#[async_trait]
pub trait QuotationCounter: Send + Sync {
    async fn count_by_party(&self, party: ObjectId) -> RepositoryResult<u64>;
    async fn count_parties_with_quotations(&self) -> RepositoryResult<u64>;
}

#[async_trait]
pub trait QuotationRepository: QuotationCounter {
    async fn insert(&self, quotation: Quotation) -> RepositoryResult<Quotation>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quotation>;
    /// Newest first.
    async fn list(&self, page: u32, limit: u32) -> RepositoryResult<Vec<Quotation>>;
    /// Every quotation of a party, highest version first.
    async fn find_by_party(&self, party: ObjectId) -> RepositoryResult<Vec<Quotation>>;
    async fn update_content(&self, id: ObjectId, content: QuotationContent) -> RepositoryResult<Quotation>;
    async fn update_status(&self, id: ObjectId, status: QuotationStatus) -> RepositoryResult<Quotation>;
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()>;
    async fn count(&self) -> RepositoryResult<u64>;
    async fn status_breakdown(&self) -> RepositoryResult<Vec<StatusBreakdown>>;
}

pub struct MongoQuotationRepository {
    collection: mongodb::Collection<Quotation>,
}

impl MongoQuotationRepository {
    pub fn new(db: &Database, config: &MongoConfig) -> Self {
        let collection = db.collection::<Quotation>(config.quotation_collection_name());
        MongoQuotationRepository { collection }
    }

    /// Unique `(party, version)` index. Concurrent first quotations of a
    /// party collide here instead of both becoming version 1.
    pub async fn ensure_unique_indexes(&self) -> RepositoryResult<()> {
        let party_version = IndexModel::builder()
            .keys(doc! { "party": 1, "version": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(party_version, None).await.map_err(|e| {
            error!("Failed to create unique (party, version) index: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Quotation unique indexes ensured");
        Ok(())
    }

    async fn aggregate_documents(&self, pipeline: Vec<Document>) -> RepositoryResult<Vec<Document>> {
        let cursor = self.collection.aggregate(pipeline, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn collect(&self, filter: Document, options: FindOptions) -> RepositoryResult<Vec<Quotation>> {
        let cursor = self.collection.find(filter, options).await?;
        cursor.try_collect().await.map_err(|e| {
            error!("Failed to deserialize quotation: {}", e);
            RepositoryError::serialization(format!("Failed to deserialize quotation: {}", e))
        })
    }
}

fn numeric(document: &Document, key: &str) -> f64 {
    match document.get(key) {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

#[async_trait]
impl QuotationCounter for MongoQuotationRepository {
    #[tracing::instrument(skip(self), fields(party = %party))]
    async fn count_by_party(&self, party: ObjectId) -> RepositoryResult<u64> {
        let count = self.collection.count_documents(doc! { "party": party }, None).await?;
        debug!("Quotations for party: {}", count);
        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn count_parties_with_quotations(&self) -> RepositoryResult<u64> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$party" } },
            doc! { "$count": "parties" },
        ];
        let documents = self.aggregate_documents(pipeline).await?;
        let count = documents.first().map(|d| numeric(d, "parties") as u64).unwrap_or(0);
        debug!("Parties with quotations: {}", count);
        Ok(count)
    }
}

#[async_trait]
impl QuotationRepository for MongoQuotationRepository {
    #[tracing::instrument(skip(self, quotation), fields(title = %quotation.title, version = quotation.version))]
    async fn insert(&self, quotation: Quotation) -> RepositoryResult<Quotation> {
        info!("Creating new quotation");
        let mut new_quotation = quotation;
        if new_quotation.id.is_none() {
            new_quotation.id = Some(ObjectId::new());
        }
        let now = Utc::now();
        new_quotation.created_at = Some(now);
        new_quotation.updated_at = Some(now);

        match self.collection.insert_one(new_quotation.clone(), None).await {
            Ok(_) => {
                info!("Quotation created successfully");
                Ok(new_quotation)
            }
            Err(e) => {
                error!("Failed to create quotation: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quotation> {
        match self.collection.find_one(doc! { "_id": id }, None).await? {
            Some(quotation) => Ok(quotation),
            None => {
                error!("Quotation not found for ID: {}", id);
                Err(RepositoryError::not_found(format!("Quotation not found for ID: {}", id)))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(page = page, limit = limit))]
    async fn list(&self, page: u32, limit: u32) -> RepositoryResult<Vec<Quotation>> {
        let skip = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(i64::from(limit))
            .build();
        let quotations = self.collect(doc! {}, options).await?;
        info!("Fetched {} quotations", quotations.len());
        Ok(quotations)
    }

    #[tracing::instrument(skip(self), fields(party = %party))]
    async fn find_by_party(&self, party: ObjectId) -> RepositoryResult<Vec<Quotation>> {
        let options = FindOptions::builder().sort(doc! { "version": -1 }).build();
        self.collect(doc! { "party": party }, options).await
    }

    #[tracing::instrument(skip(self, content), fields(id = %id))]
    async fn update_content(&self, id: ObjectId, content: QuotationContent) -> RepositoryResult<Quotation> {
        info!("Updating quotation content");
        let mut set = doc! { "updatedAt": bson::DateTime::from_chrono(Utc::now()) };
        if let Some(components) = content.components {
            set.insert("components", bson::to_bson(&components)?);
        }
        if let Some(total_amount) = content.total_amount {
            set.insert("totalAmount", total_amount);
        }
        if let Some(total_purchase) = content.total_purchase {
            set.insert("totalPurchase", total_purchase);
        }
        if let Some(total_tax) = content.total_tax {
            set.insert("totalTax", total_tax);
        }
        if let Some(notes) = content.notes {
            set.insert("notes", notes);
        }
        if let Some(terms) = content.terms_and_conditions {
            set.insert("termsAndConditions", terms);
        }
        if let Some(status) = content.status {
            set.insert("status", status.as_str());
        }
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        match self.collection.find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options).await? {
            Some(quotation) => Ok(quotation),
            None => {
                error!("No quotation found to update for ID: {}", id);
                Err(RepositoryError::not_found(format!("No quotation found to update for ID: {}", id)))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id, status = %status))]
    async fn update_status(&self, id: ObjectId, status: QuotationStatus) -> RepositoryResult<Quotation> {
        self.update_content(id, QuotationContent { status: Some(status), ..QuotationContent::default() }).await
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count > 0 {
            info!("Quotation deleted successfully for ID: {}", id);
            Ok(())
        } else {
            error!("No quotation found to delete for ID: {}", id);
            Err(RepositoryError::not_found(format!("No quotation found to delete for ID: {}", id)))
        }
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self) -> RepositoryResult<u64> {
        let count = self.collection.count_documents(doc! {}, None).await?;
        info!("Total quotations count: {}", count);
        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn status_breakdown(&self) -> RepositoryResult<Vec<StatusBreakdown>> {
        let pipeline = vec![
            doc! { "$group": {
                "_id": { "$ifNull": ["$status", QuotationStatus::Draft.as_str()] },
                "count": { "$sum": 1 },
                "totalAmount": { "$sum": "$totalAmount" },
            } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let documents = self.aggregate_documents(pipeline).await?;
        let breakdown = documents
            .iter()
            .map(|d| StatusBreakdown {
                status: d.get_str("_id").unwrap_or(QuotationStatus::Draft.as_str()).to_string(),
                count: numeric(d, "count") as u64,
                total_amount: numeric(d, "totalAmount"),
            })
            .collect();
        Ok(breakdown)
    }
}
