//! Line-item normalization for quotations
//!
//! Incoming components are loosely typed: references may be plain id strings
//! or populated `{ "_id": ... }` objects and numbers may arrive as strings.
//! Normalization either produces a complete `Vec<LineItem>` or rejects the
//! whole batch.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::quotation::LineItem;

pub const DEFAULT_QUANTITY: u32 = 1;
pub const DEFAULT_GST_RATE: f64 = 18.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogRef {
    Id(String),
    Object {
        #[serde(rename = "_id")]
        id: String,
    },
}

impl CatalogRef {
    pub fn as_str(&self) -> &str {
        match self {
            CatalogRef::Id(id) => id,
            CatalogRef::Object { id } => id,
        }
    }
}

/// A number that may have been sent as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub category: Option<CatalogRef>,
    pub brand: Option<CatalogRef>,
    pub model: Option<CatalogRef>,
    pub hsn: Option<String>,
    pub warranty: Option<String>,
    pub quantity: Option<Numeric>,
    pub purchase_price: Option<Numeric>,
    pub sales_price: Option<Numeric>,
    pub gst_rate: Option<Numeric>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuotationInputError {
    #[error("Components array is required and must not be empty")]
    NoComponents,
    #[error("Component {index} is missing required reference `{field}`")]
    MissingReference { index: usize, field: &'static str },
    #[error("Component {index} has an invalid `{field}` reference: {value}")]
    InvalidReference { index: usize, field: &'static str, value: String },
    #[error("Component {index} has a non-numeric `{field}`: {value}")]
    InvalidNumber { index: usize, field: &'static str, value: String },
    #[error("Component {index} has a negative `{field}`")]
    Negative { index: usize, field: &'static str },
    #[error("Component {index} quantity must be a whole number of at least 1, got {value}")]
    InvalidQuantity { index: usize, value: f64 },
    #[error("`{field}` is not a valid amount: {value}")]
    InvalidAmount { field: &'static str, value: String },
}

/// Distinct catalog ids referenced by a batch of line items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogReferences {
    pub categories: Vec<ObjectId>,
    pub brands: Vec<ObjectId>,
    pub models: Vec<ObjectId>,
}

impl CatalogReferences {
    pub fn from_items(items: &[LineItem]) -> Self {
        let categories: BTreeSet<ObjectId> = items.iter().map(|i| i.category).collect();
        let brands: BTreeSet<ObjectId> = items.iter().map(|i| i.brand).collect();
        let models: BTreeSet<ObjectId> = items.iter().map(|i| i.model).collect();
        CatalogReferences {
            categories: categories.into_iter().collect(),
            brands: brands.into_iter().collect(),
            models: models.into_iter().collect(),
        }
    }
}

enum Coerced {
    Absent,
    Value(f64),
    Invalid(String),
}

fn coerce(value: Option<&Numeric>) -> Coerced {
    match value {
        None => Coerced::Absent,
        Some(Numeric::Number(n)) if n.is_finite() => Coerced::Value(*n),
        Some(Numeric::Number(n)) => Coerced::Invalid(n.to_string()),
        Some(Numeric::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Coerced::Absent;
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => Coerced::Value(n),
                _ => Coerced::Invalid(text.clone()),
            }
        }
    }
}

fn reference(index: usize, field: &'static str, value: Option<&CatalogRef>) -> Result<ObjectId, QuotationInputError> {
    let raw = match value {
        Some(r) if !r.as_str().trim().is_empty() => r.as_str().trim(),
        _ => return Err(QuotationInputError::MissingReference { index, field }),
    };
    ObjectId::parse_str(raw).map_err(|_| QuotationInputError::InvalidReference {
        index,
        field,
        value: raw.to_string(),
    })
}

fn amount(index: usize, field: &'static str, value: Option<&Numeric>, default: f64) -> Result<f64, QuotationInputError> {
    let n = match coerce(value) {
        Coerced::Absent => default,
        Coerced::Value(n) => n,
        Coerced::Invalid(value) => return Err(QuotationInputError::InvalidNumber { index, field, value }),
    };
    if n < 0.0 {
        return Err(QuotationInputError::Negative { index, field });
    }
    Ok(n)
}

fn quantity(index: usize, value: Option<&Numeric>) -> Result<u32, QuotationInputError> {
    match coerce(value) {
        Coerced::Absent => Ok(DEFAULT_QUANTITY),
        Coerced::Invalid(value) => Err(QuotationInputError::InvalidNumber { index, field: "quantity", value }),
        Coerced::Value(n) if n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as u32),
        Coerced::Value(n) => Err(QuotationInputError::InvalidQuantity { index, value: n }),
    }
}

pub fn normalize_line_item(index: usize, raw: &RawLineItem) -> Result<LineItem, QuotationInputError> {
    Ok(LineItem {
        category: reference(index, "category", raw.category.as_ref())?,
        brand: reference(index, "brand", raw.brand.as_ref())?,
        model: reference(index, "model", raw.model.as_ref())?,
        hsn: raw.hsn.as_deref().map(str::trim).unwrap_or_default().to_string(),
        warranty: raw.warranty.as_deref().map(str::trim).unwrap_or_default().to_string(),
        quantity: quantity(index, raw.quantity.as_ref())?,
        purchase_price: amount(index, "purchasePrice", raw.purchase_price.as_ref(), 0.0)?,
        sales_price: amount(index, "salesPrice", raw.sales_price.as_ref(), 0.0)?,
        gst_rate: amount(index, "gstRate", raw.gst_rate.as_ref(), DEFAULT_GST_RATE)?,
    })
}

/// Normalizes every component or none of them.
pub fn normalize_line_items(raw: &[RawLineItem]) -> Result<Vec<LineItem>, QuotationInputError> {
    if raw.is_empty() {
        return Err(QuotationInputError::NoComponents);
    }
    raw.iter()
        .enumerate()
        .map(|(index, item)| normalize_line_item(index, item))
        .collect()
}

/// Coerces a quotation total; absent or blank means zero.
pub fn normalize_amount(field: &'static str, value: Option<&Numeric>) -> Result<f64, QuotationInputError> {
    match coerce(value) {
        Coerced::Absent => Ok(0.0),
        Coerced::Value(n) if n >= 0.0 => Ok(n),
        Coerced::Value(n) => Err(QuotationInputError::InvalidAmount { field, value: n.to_string() }),
        Coerced::Invalid(value) => Err(QuotationInputError::InvalidAmount { field, value }),
    }
}
