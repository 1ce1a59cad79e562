use crate::model::party::{FollowUp, NextFollowUp, Party, PartyDetails};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::config::mongo_conf::MongoConfig;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Database, IndexModel};
use tracing::{info, error, debug};

#[async_trait]
pub trait PartyRepository: Send + Sync {
    /// Identifier of the most recently sequenced party, if any.
    async fn find_latest_party_id(&self) -> RepositoryResult<Option<String>>;
    async fn count(&self) -> RepositoryResult<u64>;
    /// Fails with `AlreadyExists` when `party_id` is taken.
    async fn insert(&self, party: Party) -> RepositoryResult<Party>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Party>;
    async fn find_by_party_id(&self, party_id: &str) -> RepositoryResult<Party>;
    async fn list(&self) -> RepositoryResult<Vec<Party>>;
    async fn update_details(&self, id: ObjectId, details: PartyDetails) -> RepositoryResult<Party>;
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()>;
    /// Compare-and-set write of the follow-up list. Returns `false` when
    /// `expected_revision` is stale or the party is gone.
    async fn save_follow_ups(
        &self,
        id: ObjectId,
        follow_ups: &[FollowUp],
        next_follow_up: Option<&NextFollowUp>,
        expected_revision: i64,
    ) -> RepositoryResult<bool>;
    async fn find_upcoming(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> RepositoryResult<Vec<Party>>;
    async fn find_overdue(&self, before: DateTime<Utc>) -> RepositoryResult<Vec<Party>>;
    /// Hands out the next quotation version from a per-party counter that is
    /// never lower than `floor + 1`. `None` means no counter is available.
    async fn reserve_quotation_version(&self, id: ObjectId, floor: u32) -> RepositoryResult<Option<u32>>;
}

pub struct MongoPartyRepository {
    collection: mongodb::Collection<Party>,
}

impl MongoPartyRepository {
    pub fn new(db: &Database, config: &MongoConfig) -> Self {
        let collection = db.collection::<Party>(config.party_collection_name());
        MongoPartyRepository { collection }
    }

    fn raw(&self) -> mongodb::Collection<Document> {
        self.collection.clone_with_type::<Document>()
    }

    /// Unique sparse index on `partyId`. Identifier assignment relies on it to
    /// detect a concurrent writer, so callers must not serve without it.
    pub async fn ensure_unique_indexes(&self) -> RepositoryResult<()> {
        let unique_party_id = IndexModel::builder()
            .keys(doc! { "partyId": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        self.collection.create_index(unique_party_id, None).await.map_err(|e| {
            error!("Failed to create unique partyId index: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Party unique indexes ensured");
        Ok(())
    }

    /// Follow-up and max-scan indexes. Queries stay correct without them.
    pub async fn ensure_query_indexes(&self) -> RepositoryResult<()> {
        let next_follow_up = IndexModel::builder()
            .keys(doc! { "nextFollowUp.scheduledAt": 1 })
            .build();
        let sequence = IndexModel::builder()
            .keys(doc! { "sequence": -1 })
            .build();
        self.collection
            .create_indexes(vec![next_follow_up, sequence], None)
            .await?;
        info!("Party query indexes ensured");
        Ok(())
    }

    async fn find_sorted(&self, filter: Document, sort: Document) -> RepositoryResult<Vec<Party>> {
        let options = FindOptions::builder().sort(sort).build();
        let cursor = self.collection.find(filter, options).await?;
        let parties: Vec<Party> = cursor.try_collect().await.map_err(|e| {
            error!("Failed to deserialize party: {}", e);
            RepositoryError::serialization(format!("Failed to deserialize party: {}", e))
        })?;
        debug!("Fetched {} parties", parties.len());
        Ok(parties)
    }
}

#[async_trait]
impl PartyRepository for MongoPartyRepository {
    #[tracing::instrument(skip(self))]
    async fn find_latest_party_id(&self) -> RepositoryResult<Option<String>> {
        let filter = doc! { "partyId": { "$exists": true, "$nin": [Bson::Null, ""] } };
        // Numeric sequence first so P10000 beats P9999; partyId breaks ties for legacy rows
        let options = FindOneOptions::builder()
            .sort(doc! { "sequence": -1, "partyId": -1 })
            .projection(doc! { "partyId": 1 })
            .build();
        let latest = self.raw().find_one(filter, options).await?;
        let party_id = latest.and_then(|d| d.get_str("partyId").ok().map(str::to_string));
        debug!(latest = ?party_id, "Latest party identifier");
        Ok(party_id)
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self) -> RepositoryResult<u64> {
        let count = self.collection.count_documents(doc! {}, None).await?;
        debug!("Total parties count: {}", count);
        Ok(count)
    }

    #[tracing::instrument(skip(self, party), fields(party_id = %party.party_id))]
    async fn insert(&self, party: Party) -> RepositoryResult<Party> {
        info!("Inserting party");
        let mut new_party = party;
        if new_party.id.is_none() {
            new_party.id = Some(ObjectId::new());
        }
        let now = Utc::now();
        new_party.created_at = Some(now);
        new_party.updated_at = Some(now);

        match self.collection.insert_one(new_party.clone(), None).await {
            Ok(_) => {
                info!("Party inserted successfully");
                Ok(new_party)
            }
            Err(e) => {
                let err = RepositoryError::from(e);
                if err.is_already_exists() {
                    debug!("Party identifier already taken");
                } else {
                    error!("Failed to insert party: {}", err);
                }
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Party> {
        match self.collection.find_one(doc! { "_id": id }, None).await? {
            Some(party) => Ok(party),
            None => {
                error!("Party not found for ID: {}", id);
                Err(RepositoryError::not_found(format!("Party not found for ID: {}", id)))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_party_id(&self, party_id: &str) -> RepositoryResult<Party> {
        match self.collection.find_one(doc! { "partyId": party_id }, None).await? {
            Some(party) => Ok(party),
            None => Err(RepositoryError::not_found(format!("Party not found with partyId: {}", party_id))),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> RepositoryResult<Vec<Party>> {
        self.find_sorted(doc! {}, doc! { "sequence": 1, "partyId": 1 }).await
    }

    #[tracing::instrument(skip(self, details), fields(id = %id))]
    async fn update_details(&self, id: ObjectId, details: PartyDetails) -> RepositoryResult<Party> {
        info!("Updating party details");
        let mut set = doc! { "updatedAt": bson::DateTime::from_chrono(Utc::now()) };
        if let Some(name) = details.name {
            set.insert("name", name);
        }
        if let Some(phone) = details.phone {
            set.insert("phone", phone);
        }
        if let Some(address) = details.address {
            set.insert("address", address);
        }
        let mut unset = Document::new();
        match details.email {
            Some(email) if email.is_empty() => {
                unset.insert("email", "");
            }
            Some(email) => {
                set.insert("email", email);
            }
            None => {}
        }
        if let Some(is_active) = details.is_active {
            set.insert("isActive", is_active);
        }
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        match self.collection.find_one_and_update(doc! { "_id": id }, update, options).await? {
            Some(party) => {
                info!("Party updated successfully");
                Ok(party)
            }
            None => Err(RepositoryError::not_found(format!("No party found to update for ID: {}", id))),
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count > 0 {
            info!("Party deleted successfully");
            Ok(())
        } else {
            Err(RepositoryError::not_found(format!("No party found to delete for ID: {}", id)))
        }
    }

    #[tracing::instrument(skip(self, follow_ups, next_follow_up), fields(id = %id, expected_revision))]
    async fn save_follow_ups(
        &self,
        id: ObjectId,
        follow_ups: &[FollowUp],
        next_follow_up: Option<&NextFollowUp>,
        expected_revision: i64,
    ) -> RepositoryResult<bool> {
        let mut filter = doc! { "_id": id };
        if expected_revision == 0 {
            filter.insert("$or", vec![
                Bson::Document(doc! { "followUpRevision": 0_i64 }),
                Bson::Document(doc! { "followUpRevision": { "$exists": false } }),
            ]);
        } else {
            filter.insert("followUpRevision", expected_revision);
        }
        let update = doc! {
            "$set": {
                "followUps": bson::to_bson(follow_ups)?,
                "nextFollowUp": bson::to_bson(&next_follow_up)?,
                "updatedAt": bson::DateTime::from_chrono(Utc::now()),
            },
            "$inc": { "followUpRevision": 1_i64 },
        };
        let result = self.collection.update_one(filter, update, None).await?;
        debug!(matched = result.matched_count, "Follow-up write");
        Ok(result.matched_count == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn find_upcoming(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> RepositoryResult<Vec<Party>> {
        let filter = doc! {
            "isActive": { "$ne": false },
            "nextFollowUp.scheduledAt": {
                "$gte": bson::DateTime::from_chrono(start),
                "$lte": bson::DateTime::from_chrono(end),
            },
        };
        self.find_sorted(filter, doc! { "nextFollowUp.scheduledAt": 1 }).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_overdue(&self, before: DateTime<Utc>) -> RepositoryResult<Vec<Party>> {
        let filter = doc! {
            "isActive": { "$ne": false },
            "nextFollowUp.scheduledAt": { "$lt": bson::DateTime::from_chrono(before) },
        };
        self.find_sorted(filter, doc! { "nextFollowUp.scheduledAt": 1 }).await
    }

    #[tracing::instrument(skip(self), fields(id = %id, floor))]
    async fn reserve_quotation_version(&self, id: ObjectId, floor: u32) -> RepositoryResult<Option<u32>> {
        let raw = self.raw();
        // Lift the counter to the scanned maximum first so legacy parties start past their history
        raw.update_one(
            doc! { "_id": id },
            doc! { "$max": { "quotationVersionCounter": i64::from(floor) } },
            None,
        )
        .await?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .projection(doc! { "quotationVersionCounter": 1 })
            .build();
        let updated = raw
            .find_one_and_update(doc! { "_id": id }, doc! { "$inc": { "quotationVersionCounter": 1_i64 } }, options)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Party not found for ID: {}", id)))?;
        let value = match updated.get("quotationVersionCounter") {
            Some(Bson::Int64(v)) => *v,
            Some(Bson::Int32(v)) => i64::from(*v),
            other => {
                return Err(RepositoryError::serialization(format!(
                    "Unexpected quotationVersionCounter value: {:?}",
                    other
                )))
            }
        };
        let version = u32::try_from(value)
            .map_err(|_| RepositoryError::validation(format!("Quotation version out of range: {}", value)))?;
        debug!(version, "Reserved quotation version");
        Ok(Some(version))
    }
}
