//! `DomainStore` trait: the learned email-domain → company table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DatabaseError;

/// A learned association between an email domain and a company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainMapping {
    pub id: String,
    /// Lowercased email domain (unique).
    pub email_domain: String,
    pub company_name: String,
    pub confidence_score: f64,
    /// Whether a human has confirmed the association.
    pub is_verified: bool,
    pub match_count: i64,
    pub last_matched: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to learn a new mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDomainMapping {
    pub email_domain: String,
    pub company_name: String,
    pub confidence_score: f64,
    pub is_verified: bool,
    pub match_count: i64,
}

impl NewDomainMapping {
    /// An unverified mapping learned from a single extraction.
    pub fn learned(
        email_domain: impl Into<String>,
        company_name: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            email_domain: email_domain.into(),
            company_name: company_name.into(),
            confidence_score,
            is_verified: false,
            match_count: 1,
        }
    }
}

/// Backend-agnostic access to domain mappings.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Look up the mapping for an already-lowercased domain.
    async fn get_domain_mapping(&self, domain: &str)
    -> Result<Option<DomainMapping>, DatabaseError>;

    /// Insert a new mapping. Fails with `Constraint` if the domain exists.
    async fn insert_domain_mapping(&self, mapping: &NewDomainMapping) -> Result<(), DatabaseError>;

    /// Increment the match counter and stamp `last_matched`.
    /// Returns `false` when no row exists for the domain.
    async fn record_domain_match(&self, domain: &str) -> Result<bool, DatabaseError>;
}
