//! Company Fingerprint Manager — derives and caches a structural/stylistic
//! profile per company so rewrites keep the employer's template and voice.
//!
//! The fingerprint is the only entity with cross-request lifetime. It is read
//! at the start of an optimization and replaced in full (never patched) when
//! drift is detected. Concurrent optimizations for the same company may race
//! on writes; last-writer-wins is acceptable because fingerprints are
//! advisory, not correctness-critical.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

pub mod derive;

use crate::document::Document;
use crate::errors::AppError;

/// A cached fingerprint is stale when the label-order overlap with the newly
/// observed document drops below this ratio.
pub const STALENESS_OVERLAP_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyFingerprint {
    pub version: u32,
    pub section_order: Vec<String>,
    pub heading_aliases: BTreeMap<String, Vec<String>>,
    pub tone: String,
    pub formatting: String,
    pub lexical_anchors: Vec<String>,
    pub selectors: Vec<String>,
    pub last_seen: DateTime<Utc>,
}

/// Normalized store key: lowercase, non-alphanumeric runs collapsed to `-`.
pub fn normalize_company_key(company: &str) -> String {
    company
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Overlap ratio between two section-label orders:
/// `|intersection| / max(|a|, |b|)`. Two empty orders overlap fully.
pub fn label_overlap(a: &[String], b: &[String]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let shared = a.iter().filter(|label| b.contains(label)).count();
    shared as f64 / longest as f64
}

/// The external store contract. Keyed by the normalized company slug; upsert
/// is full replacement.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CompanyFingerprint>, AppError>;
    async fn upsert(
        &self,
        key: &str,
        fingerprint: &CompanyFingerprint,
    ) -> Result<CompanyFingerprint, AppError>;
}

/// Returns a usable fingerprint for the company, re-deriving and upserting
/// when none is cached or the cached one no longer matches the observed
/// section order. Reads never block on the write.
pub async fn ensure_fingerprint(
    store: &dyn FingerprintStore,
    company: &str,
    doc: &Document,
) -> Result<CompanyFingerprint, AppError> {
    let key = normalize_company_key(company);
    let observed = derive::derive_profile(doc);
    let cached = store.get(&key).await?;

    if let Some(existing) = &cached {
        let overlap = label_overlap(&existing.section_order, &observed.section_order);
        if overlap >= STALENESS_OVERLAP_THRESHOLD {
            return Ok(existing.clone());
        }
        info!(
            "Fingerprint for '{key}' is stale (overlap {overlap:.2}) — re-deriving v{}",
            existing.version + 1
        );
    } else {
        info!("No fingerprint cached for '{key}' — deriving v1");
    }

    let fingerprint = CompanyFingerprint {
        version: cached.map(|c| c.version + 1).unwrap_or(1),
        section_order: observed.section_order,
        heading_aliases: observed.heading_aliases,
        tone: observed.tone,
        formatting: observed.formatting,
        lexical_anchors: observed.lexical_anchors,
        selectors: observed.selectors,
        last_seen: Utc::now(),
    };

    store.upsert(&key, &fingerprint).await
}

/// Postgres-backed store. The fingerprint document is stored whole as JSONB;
/// upsert-by-key gives the read-modify-write its atomicity.
pub struct PgFingerprintStore {
    pool: PgPool,
}

impl PgFingerprintStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn store_error(operation: &'static str, key: &str, message: String) -> AppError {
        AppError::FingerprintStore {
            operation,
            key: key.to_string(),
            message,
        }
    }
}

#[async_trait]
impl FingerprintStore for PgFingerprintStore {
    async fn get(&self, key: &str) -> Result<Option<CompanyFingerprint>, AppError> {
        let row: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT data FROM company_fingerprints WHERE company_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Self::store_error("get", key, e.to_string()))?;

        row.map(serde_json::from_value)
            .transpose()
            .map_err(|e| Self::store_error("get", key, e.to_string()))
    }

    async fn upsert(
        &self,
        key: &str,
        fingerprint: &CompanyFingerprint,
    ) -> Result<CompanyFingerprint, AppError> {
        let data = serde_json::to_value(fingerprint)
            .map_err(|e| Self::store_error("upsert", key, e.to_string()))?;

        sqlx::query(
            "INSERT INTO company_fingerprints (company_key, data, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (company_key)
             DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()",
        )
        .bind(key)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::store_error("upsert", key, e.to_string()))?;

        Ok(fingerprint.clone())
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory store double shared by pipeline tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryFingerprintStore {
        entries: Mutex<HashMap<String, CompanyFingerprint>>,
    }

    impl MemoryFingerprintStore {
        pub fn with(key: &str, fingerprint: CompanyFingerprint) -> Self {
            let store = Self::default();
            store
                .entries
                .lock()
                .unwrap()
                .insert(key.to_string(), fingerprint);
            store
        }
    }

    #[async_trait]
    impl FingerprintStore for MemoryFingerprintStore {
        async fn get(&self, key: &str) -> Result<Option<CompanyFingerprint>, AppError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn upsert(
            &self,
            key: &str,
            fingerprint: &CompanyFingerprint,
        ) -> Result<CompanyFingerprint, AppError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), fingerprint.clone());
            Ok(fingerprint.clone())
        }
    }

    /// Fails every operation, for surfacing-store-errors tests.
    pub struct FailingFingerprintStore;

    #[async_trait]
    impl FingerprintStore for FailingFingerprintStore {
        async fn get(&self, key: &str) -> Result<Option<CompanyFingerprint>, AppError> {
            Err(AppError::FingerprintStore {
                operation: "get",
                key: key.to_string(),
                message: "connection refused".to_string(),
            })
        }

        async fn upsert(
            &self,
            key: &str,
            _fingerprint: &CompanyFingerprint,
        ) -> Result<CompanyFingerprint, AppError> {
            Err(AppError::FingerprintStore {
                operation: "upsert",
                key: key.to_string(),
                message: "connection refused".to_string(),
            })
        }
    }
}
