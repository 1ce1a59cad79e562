use crate::domain::line_items::{Numeric, RawLineItem};
use crate::model::quotation::{LineItem, Quotation};
use serde::{Deserialize, Serialize};

use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationRequest {
    #[validate(length(equal = 24))] // MongoDB ObjectId hex string
    pub party: String,

    #[serde(default)]
    pub components: Vec<RawLineItem>,

    pub total_amount: Option<Numeric>,
    pub total_purchase: Option<Numeric>,
    pub total_tax: Option<Numeric>,

    #[validate(length(max = 5000))]
    pub notes: Option<String>,

    #[validate(length(max = 10000))]
    pub terms_and_conditions: Option<String>,

    pub status: Option<String>,
}

/// Content for a revision. Absent fields are carried over from the revised quotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviseQuotationRequest {
    pub components: Option<Vec<RawLineItem>>,
    pub total_amount: Option<Numeric>,
    pub total_purchase: Option<Numeric>,
    pub total_tax: Option<Numeric>,

    #[validate(length(max = 5000))]
    pub notes: Option<String>,

    #[validate(length(max = 10000))]
    pub terms_and_conditions: Option<String>,

    pub status: Option<String>,
}

/// Content update. `party`, `version`, `originalQuote` and `title` are not accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuotationRequest {
    pub components: Option<Vec<RawLineItem>>,
    pub total_amount: Option<Numeric>,
    pub total_purchase: Option<Numeric>,
    pub total_tax: Option<Numeric>,

    #[validate(length(max = 5000))]
    pub notes: Option<String>,

    #[validate(length(max = 10000))]
    pub terms_and_conditions: Option<String>,

    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuotationStatusRequest {
    #[validate(length(min = 4, max = 10))]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub category: String,
    pub brand: String,
    pub model: String,
    pub hsn: String,
    pub warranty: String,
    pub quantity: u32,
    pub purchase_price: f64,
    pub sales_price: f64,
    pub gst_rate: f64,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        LineItemResponse {
            category: item.category.to_hex(),
            brand: item.brand.to_hex(),
            model: item.model.to_hex(),
            hsn: item.hsn.clone(),
            warranty: item.warranty.clone(),
            quantity: item.quantity,
            purchase_price: item.purchase_price,
            sales_price: item.sales_price,
            gst_rate: item.gst_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationResponse {
    pub id: String,
    pub title: String,
    pub party: String,
    pub version: u32,
    pub original_quote: Option<String>,
    pub components: Vec<LineItemResponse>,
    pub total_amount: f64,
    pub total_purchase: f64,
    pub total_tax: f64,
    pub notes: String,
    pub terms_and_conditions: String,
    pub status: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Quotation> for QuotationResponse {
    fn from(quotation: Quotation) -> Self {
        QuotationResponse {
            id: quotation.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: quotation.title,
            party: quotation.party.to_hex(),
            version: quotation.version,
            original_quote: quotation.original_quote.map(|id| id.to_hex()),
            components: quotation.components.iter().map(LineItemResponse::from).collect(),
            total_amount: quotation.total_amount,
            total_purchase: quotation.total_purchase,
            total_tax: quotation.total_tax,
            notes: quotation.notes,
            terms_and_conditions: quotation.terms_and_conditions,
            status: quotation.status.to_string(),
            created_at: quotation.created_at.map(|at| at.to_rfc3339()),
            updated_at: quotation.updated_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuotationResponse {
    pub message: String,
    pub deleted_quotation_title: String,
}
