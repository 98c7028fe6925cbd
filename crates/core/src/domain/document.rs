// Document identity: what is being translated, and where it lands in the cache

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a single request token (type, language, country)
const MAX_TOKEN_LEN: usize = 64;

/// A source document as handed over by the document store.
///
/// This is the whole capability contract the core relies on: the content to
/// translate and, when the store knows it, when the document was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Store key the document was resolved under
    pub key: String,
    pub content: String,
    /// Creation time in epoch ms
    pub created_at: Option<i64>,
}

impl SourceDocument {
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Cache/lock/progress identity: document type + target language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub document_type: String,
    pub target_lang: String,
}

impl DocumentKey {
    pub fn new(document_type: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Key used by the persistent stores
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.document_type, self.target_lang)
    }

    pub fn validate(&self) -> Result<()> {
        validate_token("document_type", &self.document_type)?;
        validate_token("target_lang", &self.target_lang)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document_type, self.target_lang)
    }
}

/// Everything needed to locate a source and translate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub document_type: String,
    pub source_lang: String,
    #[serde(default)]
    pub country: Option<String>,
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(
        document_type: impl Into<String>,
        source_lang: impl Into<String>,
        country: Option<&str>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            source_lang: source_lang.into(),
            country: country.map(str::to_string),
            target_lang: target_lang.into(),
        }
    }

    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.document_type.clone(), self.target_lang.clone())
    }

    /// Country token, if one was given and it is not blank
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Reject tokens that cannot be plain identifiers.
    ///
    /// All four fields end up inside store keys, so they are restricted to
    /// ASCII alphanumerics, `_` and `-`.
    pub fn validate(&self) -> Result<()> {
        validate_token("document_type", &self.document_type)?;
        validate_token("source_lang", &self.source_lang)?;
        validate_token("target_lang", &self.target_lang)?;
        if let Some(country) = self.country() {
            validate_token("country", country)?;
        }
        Ok(())
    }
}

fn validate_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DomainError::InvalidRequest(format!("{} cannot be empty", field)));
    }
    if value.len() > MAX_TOKEN_LEN {
        return Err(DomainError::InvalidRequest(format!(
            "{} too long (max {} bytes)",
            field, MAX_TOKEN_LEN
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::InvalidRequest(format!(
            "{} must be alphanumeric (with _ or -): {}",
            field, value
        )));
    }
    Ok(())
}
