pub mod party_handler;
pub mod quotation_handler;
pub mod catalog_handler;
