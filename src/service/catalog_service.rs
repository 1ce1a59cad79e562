use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument};

use crate::domain::line_items::{normalize_amount, CatalogReferences, DEFAULT_GST_RATE};
use crate::dto::catalog_dto::CreateModelRequest;
use crate::model::catalog::{Brand, Category, ProductModel};
use crate::repository::catalog_repo::CatalogRepository;
use crate::util::error::ServiceError;

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError>;
    async fn create_category(&self, name: &str) -> Result<Category, ServiceError>;
    async fn list_brands(&self) -> Result<Vec<Brand>, ServiceError>;
    async fn create_brand(&self, name: &str) -> Result<Brand, ServiceError>;
    async fn list_models(&self) -> Result<Vec<ProductModel>, ServiceError>;
    async fn create_model(&self, request: CreateModelRequest) -> Result<ProductModel, ServiceError>;
    async fn search_models(&self, term: &str) -> Result<Vec<ProductModel>, ServiceError>;
}

pub struct CatalogServiceImpl {
    pub catalog_repo: Arc<dyn CatalogRepository>,
}

impl CatalogServiceImpl {
    pub fn new(catalog_repo: Arc<dyn CatalogRepository>) -> Self {
        CatalogServiceImpl { catalog_repo }
    }
}

fn parse_id(field: &str, raw: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ServiceError::InvalidInput(format!("Invalid {} id: {}", field, raw)))
}

fn trimmed_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

#[async_trait]
impl CatalogService for CatalogServiceImpl {
    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.catalog_repo.list_categories().await?)
    }

    #[instrument(skip(self))]
    async fn create_category(&self, name: &str) -> Result<Category, ServiceError> {
        let category = Category { id: None, name: trimmed_name(name)?, created_at: None };
        Ok(self.catalog_repo.create_category(category).await?)
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, ServiceError> {
        Ok(self.catalog_repo.list_brands().await?)
    }

    #[instrument(skip(self))]
    async fn create_brand(&self, name: &str) -> Result<Brand, ServiceError> {
        let brand = Brand { id: None, name: trimmed_name(name)?, created_at: None };
        Ok(self.catalog_repo.create_brand(brand).await?)
    }

    async fn list_models(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(self.catalog_repo.list_models().await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_model(&self, request: CreateModelRequest) -> Result<ProductModel, ServiceError> {
        let category = parse_id("category", &request.category)?;
        let brand = parse_id("brand", &request.brand)?;
        let gst_rate = match request.gst_rate.as_ref() {
            Some(rate) => normalize_amount("gstRate", Some(rate))?,
            None => DEFAULT_GST_RATE,
        };
        let model = ProductModel {
            id: None,
            name: trimmed_name(&request.name)?,
            category,
            brand,
            hsn: request.hsn.trim().to_string(),
            warranty: request.warranty.trim().to_string(),
            purchase_price: normalize_amount("purchasePrice", request.purchase_price.as_ref())?,
            sales_price: normalize_amount("salesPrice", request.sales_price.as_ref())?,
            gst_rate,
            created_at: None,
        };
        let missing = self
            .catalog_repo
            .missing_references(&CatalogReferences {
                categories: vec![category],
                brands: vec![brand],
                models: Vec::new(),
            })
            .await?;
        if !missing.is_empty() {
            return Err(ServiceError::InvalidInput(format!("Model references {}", missing)));
        }
        let created = self.catalog_repo.create_model(model).await?;
        info!("Model created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn search_models(&self, term: &str) -> Result<Vec<ProductModel>, ServiceError> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.catalog_repo.search_models(term).await?)
    }
}
