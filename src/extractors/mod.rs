// src/extractors/mod.rs
pub mod equipment;
pub mod header;
pub mod lines;
pub mod pests;
pub mod pricing;
pub mod quote;
pub mod schedule;
pub mod services;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use quote::{ExtractorConfig, EquipmentOverrides, QuoteDraft, QuoteExtractor};
#[allow(unused_imports)]
pub use services::{Frequency, ServiceCode, ServiceRecord, ServicesResult};
