// src/storage/mod.rs
pub mod ingester;
pub mod issuance_store;
pub mod staging;
