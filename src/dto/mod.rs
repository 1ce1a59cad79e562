pub mod party_dto;
pub mod quotation_dto;
pub mod catalog_dto;
