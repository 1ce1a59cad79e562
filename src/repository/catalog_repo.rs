use crate::domain::line_items::CatalogReferences;
use crate::model::catalog::{Brand, Category, ProductModel};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Database, IndexModel};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

pub const MODEL_SEARCH_LIMIT: i64 = 10;

/// References that did not resolve to a catalog record, per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingReferences {
    pub categories: Vec<ObjectId>,
    pub brands: Vec<ObjectId>,
    pub models: Vec<ObjectId>,
}

impl MissingReferences {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.brands.is_empty() && self.models.is_empty()
    }
}

impl std::fmt::Display for MissingReferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        for (label, ids) in [("category", &self.categories), ("brand", &self.brands), ("model", &self.models)] {
            if !ids.is_empty() {
                let hex: Vec<String> = ids.iter().map(|id| id.to_hex()).collect();
                parts.push(format!("{} [{}]", label, hex.join(", ")));
            }
        }
        write!(f, "unknown {}", parts.join("; "))
    }
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>>;
    async fn create_category(&self, category: Category) -> RepositoryResult<Category>;
    async fn list_brands(&self) -> RepositoryResult<Vec<Brand>>;
    async fn create_brand(&self, brand: Brand) -> RepositoryResult<Brand>;
    async fn list_models(&self) -> RepositoryResult<Vec<ProductModel>>;
    async fn create_model(&self, model: ProductModel) -> RepositoryResult<ProductModel>;
    /// Case-insensitive match on model name or HSN code.
    async fn search_models(&self, term: &str) -> RepositoryResult<Vec<ProductModel>>;
    async fn missing_references(&self, references: &CatalogReferences) -> RepositoryResult<MissingReferences>;
}

pub struct MongoCatalogRepository {
    categories: mongodb::Collection<Category>,
    brands: mongodb::Collection<Brand>,
    models: mongodb::Collection<ProductModel>,
}

impl MongoCatalogRepository {
    pub fn new(db: &Database) -> Self {
        MongoCatalogRepository {
            categories: db.collection::<Category>("categories"),
            brands: db.collection::<Brand>("brands"),
            models: db.collection::<ProductModel>("models"),
        }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let unique_name = || {
            IndexModel::builder()
                .keys(doc! { "name": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.categories.create_index(unique_name(), None).await?;
        self.brands.create_index(unique_name(), None).await?;
        info!("Catalog indexes ensured");
        Ok(())
    }
}

async fn find_all<T>(collection: &mongodb::Collection<T>, filter: Document, options: FindOptions) -> RepositoryResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let cursor = collection.find(filter, options).await?;
    cursor.try_collect().await.map_err(|e| {
        error!("Failed to deserialize catalog record: {}", e);
        RepositoryError::serialization(format!("Failed to deserialize catalog record: {}", e))
    })
}

/// Ids from `wanted` that have no document in `collection`.
async fn absent_ids<T>(collection: &mongodb::Collection<T>, wanted: &[ObjectId]) -> RepositoryResult<Vec<ObjectId>>
where
    T: Send + Sync,
{
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let raw = collection.clone_with_type::<Document>();
    let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
    let found: Vec<Document> = raw
        .find(doc! { "_id": { "$in": wanted.to_vec() } }, options)
        .await?
        .try_collect()
        .await?;
    let present: Vec<ObjectId> = found.iter().filter_map(|d| d.get_object_id("_id").ok()).collect();
    Ok(wanted.iter().filter(|id| !present.contains(id)).copied().collect())
}

fn by_name() -> FindOptions {
    FindOptions::builder().sort(doc! { "name": 1 }).build()
}

#[async_trait]
impl CatalogRepository for MongoCatalogRepository {
    #[tracing::instrument(skip(self))]
    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        find_all(&self.categories, doc! {}, by_name()).await
    }

    #[tracing::instrument(skip(self), fields(name = %category.name))]
    async fn create_category(&self, category: Category) -> RepositoryResult<Category> {
        let mut category = category;
        category.id = Some(ObjectId::new());
        category.created_at = Some(Utc::now());
        self.categories.insert_one(category.clone(), None).await?;
        info!("Category created");
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    async fn list_brands(&self) -> RepositoryResult<Vec<Brand>> {
        find_all(&self.brands, doc! {}, by_name()).await
    }

    #[tracing::instrument(skip(self), fields(name = %brand.name))]
    async fn create_brand(&self, brand: Brand) -> RepositoryResult<Brand> {
        let mut brand = brand;
        brand.id = Some(ObjectId::new());
        brand.created_at = Some(Utc::now());
        self.brands.insert_one(brand.clone(), None).await?;
        info!("Brand created");
        Ok(brand)
    }

    #[tracing::instrument(skip(self))]
    async fn list_models(&self) -> RepositoryResult<Vec<ProductModel>> {
        find_all(&self.models, doc! {}, by_name()).await
    }

    #[tracing::instrument(skip(self), fields(name = %model.name))]
    async fn create_model(&self, model: ProductModel) -> RepositoryResult<ProductModel> {
        let mut model = model;
        model.id = Some(ObjectId::new());
        model.created_at = Some(Utc::now());
        self.models.insert_one(model.clone(), None).await?;
        info!("Model created");
        Ok(model)
    }

    #[tracing::instrument(skip(self))]
    async fn search_models(&self, term: &str) -> RepositoryResult<Vec<ProductModel>> {
        let pattern = escape_regex(term.trim());
        let filter = doc! {
            "$or": [
                { "name": { "$regex": &pattern, "$options": "i" } },
                { "hsn": { "$regex": &pattern, "$options": "i" } },
            ]
        };
        let options = FindOptions::builder()
            .sort(doc! { "name": 1 })
            .limit(MODEL_SEARCH_LIMIT)
            .build();
        let models = find_all(&self.models, filter, options).await?;
        debug!("Model search matched {}", models.len());
        Ok(models)
    }

    #[tracing::instrument(skip(self, references))]
    async fn missing_references(&self, references: &CatalogReferences) -> RepositoryResult<MissingReferences> {
        Ok(MissingReferences {
            categories: absent_ids(&self.categories, &references.categories).await?,
            brands: absent_ids(&self.brands, &references.brands).await?,
            models: absent_ids(&self.models, &references.models).await?,
        })
    }
}

/// Escapes regex metacharacters so a search term matches literally.
pub fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
