use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::optional_bson_datetime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default, with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default, with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A sellable product model, stored in the `models` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductModel {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub category: ObjectId,
    pub brand: ObjectId,
    pub hsn: String,
    pub warranty: String,
    pub purchase_price: f64,
    pub sales_price: f64,
    #[serde(default = "default_gst_rate")]
    pub gst_rate: f64,
    #[serde(default, with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn default_gst_rate() -> f64 {
    crate::domain::line_items::DEFAULT_GST_RATE
}
