use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::optional_bson_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    #[default]
    Draft,
    Sent,
    Lost,
    Sold,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Lost => "lost",
            QuotationStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(QuotationStatus::Draft),
            "sent" => Ok(QuotationStatus::Sent),
            "lost" => Ok(QuotationStatus::Lost),
            "sold" => Ok(QuotationStatus::Sold),
            other => Err(format!("Unknown quotation status: {}", other)),
        }
    }
}

/// One priced catalog entry on a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub category: ObjectId,
    pub brand: ObjectId,
    pub model: ObjectId,
    #[serde(default)]
    pub hsn: String,
    #[serde(default)]
    pub warranty: String,
    pub quantity: u32,
    pub purchase_price: f64,
    pub sales_price: f64,
    pub gst_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub party: ObjectId,
    pub version: u32,
    #[serde(default)]
    pub original_quote: Option<ObjectId>,
    #[serde(default)]
    pub components: Vec<LineItem>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub total_purchase: f64,
    #[serde(default)]
    pub total_tax: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms_and_conditions: String,
    #[serde(default)]
    pub status: QuotationStatus,
    #[serde(default, with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_bson_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Content that may change after creation. Lineage fields never appear here.
#[derive(Debug, Clone, Default)]
pub struct QuotationContent {
    pub components: Option<Vec<LineItem>>,
    pub total_amount: Option<f64>,
    pub total_purchase: Option<f64>,
    pub total_tax: Option<f64>,
    pub notes: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub status: Option<QuotationStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: String,
    pub count: u64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationStats {
    pub total_quotations: u64,
    pub status_breakdown: Vec<StatusBreakdown>,
}
