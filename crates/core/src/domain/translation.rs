// Cached translation record and its freshness relative to a source

use super::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// Cached translation, valid while `source_fingerprint` matches the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub source_fingerprint: Fingerprint,
    /// Translated HTML
    pub content: String,
    /// Epoch ms of the commit
    pub updated_at: i64,
}

impl TranslationRecord {
    pub fn new(source_fingerprint: Fingerprint, content: impl Into<String>, updated_at: i64) -> Self {
        Self {
            source_fingerprint,
            content: content.into(),
            updated_at,
        }
    }

    pub fn is_valid_for(&self, fingerprint: &Fingerprint) -> bool {
        &self.source_fingerprint == fingerprint
    }
}

/// Operator-facing state of one (document, target language) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranslationStatus {
    UpToDate { updated_at: i64 },
    Stale { updated_at: i64 },
    Missing,
    Processing,
}

impl TranslationStatus {
    /// Derive the status from the cache record; a held lock wins over everything
    pub fn evaluate(
        record: Option<&TranslationRecord>,
        fingerprint: &Fingerprint,
        lock_held: bool,
    ) -> Self {
        if lock_held {
            return TranslationStatus::Processing;
        }
        match record {
            Some(r) if r.is_valid_for(fingerprint) => TranslationStatus::UpToDate {
                updated_at: r.updated_at,
            },
            Some(r) => TranslationStatus::Stale {
                updated_at: r.updated_at,
            },
            None => TranslationStatus::Missing,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TranslationStatus::UpToDate { .. } => "up_to_date",
            TranslationStatus::Stale { .. } => "stale",
            TranslationStatus::Missing => "missing",
            TranslationStatus::Processing => "processing",
        }
    }
}
