//! libSQL backend: async `DomainStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{DomainMapping, DomainStore, NewDomainMapping};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(&self.conn).await
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

const MAPPING_COLUMNS: &str = "id, email_domain, company_name, confidence_score, is_verified, match_count, last_matched, created_at, updated_at";

/// Map a libsql Row to a DomainMapping. Column order matches MAPPING_COLUMNS.
fn row_to_mapping(row: &libsql::Row) -> Result<DomainMapping, libsql::Error> {
    let last_matched: Option<String> = row.get(6).ok();
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    Ok(DomainMapping {
        id: row.get(0)?,
        email_domain: row.get(1)?,
        company_name: row.get(2)?,
        confidence_score: row.get(3)?,
        is_verified: row.get::<i64>(4)? != 0,
        match_count: row.get(5)?,
        last_matched: last_matched.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl DomainStore for LibSqlBackend {
    async fn get_domain_mapping(
        &self,
        domain: &str,
    ) -> Result<Option<DomainMapping>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {MAPPING_COLUMNS} FROM company_domain_mappings WHERE email_domain = ?1"
                ),
                params![domain],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_domain_mapping: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let mapping = row_to_mapping(&row)
                    .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                Ok(Some(mapping))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_domain_mapping: {e}"))),
        }
    }

    async fn insert_domain_mapping(&self, mapping: &NewDomainMapping) -> Result<(), DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO company_domain_mappings (id, email_domain, company_name,
                    confidence_score, is_verified, match_count, last_matched, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
                params![
                    id.clone(),
                    mapping.email_domain.as_str(),
                    mapping.company_name.as_str(),
                    mapping.confidence_score,
                    i64::from(mapping.is_verified),
                    mapping.match_count,
                    now,
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::Constraint(format!(
                        "domain mapping for {} already exists",
                        mapping.email_domain
                    ))
                } else {
                    DatabaseError::Query(format!("insert_domain_mapping: {e}"))
                }
            })?;

        debug!(id = %id, domain = %mapping.email_domain, "Domain mapping inserted");
        Ok(())
    }

    async fn record_domain_match(&self, domain: &str) -> Result<bool, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE company_domain_mappings
                 SET match_count = match_count + 1, last_matched = ?1, updated_at = ?1
                 WHERE email_domain = ?2",
                params![now, domain],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_domain_match: {e}")))?;

        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_get_mapping() {
        let db = test_db().await;
        db.insert_domain_mapping(&NewDomainMapping::learned("pharmaco.id", "PT Pharmaco", 0.85))
            .await
            .unwrap();

        let mapping = db.get_domain_mapping("pharmaco.id").await.unwrap().unwrap();
        assert_eq!(mapping.email_domain, "pharmaco.id");
        assert_eq!(mapping.company_name, "PT Pharmaco");
        assert!((mapping.confidence_score - 0.85).abs() < 1e-9);
        assert!(!mapping.is_verified);
        assert_eq!(mapping.match_count, 1);
        assert!(mapping.last_matched.is_some());
    }

    #[tokio::test]
    async fn get_mapping_not_found() {
        let db = test_db().await;
        assert!(db.get_domain_mapping("nobody.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_match_increments_counter() {
        let db = test_db().await;
        db.insert_domain_mapping(&NewDomainMapping::learned("kimia.co.id", "PT Kimia", 0.7))
            .await
            .unwrap();

        assert!(db.record_domain_match("kimia.co.id").await.unwrap());
        assert!(db.record_domain_match("kimia.co.id").await.unwrap());

        let mapping = db.get_domain_mapping("kimia.co.id").await.unwrap().unwrap();
        assert_eq!(mapping.match_count, 3);
    }

    #[tokio::test]
    async fn record_match_on_missing_domain_reports_false() {
        let db = test_db().await;
        assert!(!db.record_domain_match("ghost.org").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_domain_is_constraint_error() {
        let db = test_db().await;
        let mapping = NewDomainMapping::learned("dup.com", "Dup Inc", 0.7);
        db.insert_domain_mapping(&mapping).await.unwrap();

        let err = db.insert_domain_mapping(&mapping).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
    }

    #[tokio::test]
    async fn verified_flag_round_trips() {
        let db = test_db().await;
        let mapping = NewDomainMapping {
            is_verified: true,
            ..NewDomainMapping::learned("verified.com", "Verified Ltd", 1.0)
        };
        db.insert_domain_mapping(&mapping).await.unwrap();

        let fetched = db.get_domain_mapping("verified.com").await.unwrap().unwrap();
        assert!(fetched.is_verified);
    }

    #[tokio::test]
    async fn local_file_creates_parent_dirs_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("mappings.db");

        {
            let db = LibSqlBackend::new_local(&db_path).await.unwrap();
            db.insert_domain_mapping(&NewDomainMapping::learned("file.com", "File Co", 0.9))
                .await
                .unwrap();
        }
        assert!(db_path.exists());

        let reopened = LibSqlBackend::new_local(&db_path).await.unwrap();
        let mapping = reopened.get_domain_mapping("file.com").await.unwrap();
        assert_eq!(mapping.unwrap().company_name, "File Co");
    }

    #[test]
    fn parse_datetime_formats() {
        let rfc = parse_datetime("2026-04-03T10:00:00+00:00");
        assert_eq!(rfc.to_rfc3339(), "2026-04-03T10:00:00+00:00");
        let sqlite = parse_datetime("2026-04-03 10:00:00");
        assert_eq!(sqlite, rfc);
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
