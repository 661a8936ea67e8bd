// src/extractors/mod.rs
pub mod ticker;
pub mod timestamp;

pub use ticker::extract_ticker;
pub use timestamp::extract_accepted_timestamp;
