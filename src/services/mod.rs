// src/services/mod.rs
pub mod api_server;
pub mod digest;
pub mod identifier;
pub mod issuance;
pub mod resolver;
pub mod verifier;
