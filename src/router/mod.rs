pub mod party_router;
pub mod quotation_router;
pub mod catalog_router;
