// src/edgar/mod.rs
pub mod client;
pub mod models;

pub use client::{EdgarClient, EdgarConfig};
pub use models::{FilingQuery, FilingRecord};
