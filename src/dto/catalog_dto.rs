use crate::domain::line_items::Numeric;
use crate::model::catalog::{Brand, Category, ProductModel};
use serde::{Deserialize, Serialize};

use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNamedRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(equal = 24))]
    pub category: String,

    #[validate(length(equal = 24))]
    pub brand: String,

    #[serde(default)]
    pub hsn: String,

    #[serde(default)]
    pub warranty: String,

    pub purchase_price: Option<Numeric>,
    pub sales_price: Option<Numeric>,
    pub gst_rate: Option<Numeric>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedResponse {
    pub id: String,
    pub name: String,
}

impl From<Category> for NamedResponse {
    fn from(category: Category) -> Self {
        NamedResponse {
            id: category.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: category.name,
        }
    }
}

impl From<Brand> for NamedResponse {
    fn from(brand: Brand) -> Self {
        NamedResponse {
            id: brand.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: brand.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub id: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub hsn: String,
    pub warranty: String,
    pub purchase_price: f64,
    pub sales_price: f64,
    pub gst_rate: f64,
}

impl From<ProductModel> for ModelResponse {
    fn from(model: ProductModel) -> Self {
        ModelResponse {
            id: model.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: model.name,
            category: model.category.to_hex(),
            brand: model.brand.to_hex(),
            hsn: model.hsn,
            warranty: model.warranty,
            purchase_price: model.purchase_price,
            sales_price: model.sales_price,
            gst_rate: model.gst_rate,
        }
    }
}
