pub mod party_service;
pub mod quotation_service;
pub mod catalog_service;
