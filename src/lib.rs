//! Pharma Inquiry: turns inbound supplier-inquiry emails into CRM records.

pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod store;
