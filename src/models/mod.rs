// src/models/mod.rs
pub mod bundle;
pub mod credential;
pub mod outcome;
pub mod submission;
