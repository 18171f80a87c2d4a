/*!
 * Marketing document model.
 *
 * The document is a nested record with metadata, a cover page, a disclaimer
 * slide, ordered body slides, and a closing page. It is immutable once loaded
 * and owned exclusively by the run. Field values live in named content maps;
 * lookups go through a two-phase resolution: structured field first, then a
 * labeled free-text fallback with reduced confidence.
 */

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// Target audience of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Retail,
    Professional,
    #[default]
    Unknown,
}

impl FromStr for ClientType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "retail" | "non-professional" => Ok(Self::Retail),
            "professional" | "institutional" => Ok(Self::Professional),
            "" | "unknown" => Ok(Self::Unknown),
            other => Err(anyhow::anyhow!("Invalid client type: {}", other)),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retail => write!(f, "retail"),
            Self::Professional => write!(f, "professional"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Declared ESG classification tier of the fund
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EsgTier {
    /// No sustainability claim
    Article6,
    /// Promotes environmental or social characteristics
    Article8,
    /// Sustainable investment objective
    Article9,
    /// Not declared or unparseable
    Undeclared,
}

impl EsgTier {
    /// Parse a free-form classification string ("Article 8", "art.9", "SFDR 6")
    pub fn parse(value: &str) -> Self {
        let lowered = value.to_lowercase();
        if lowered.contains('9') {
            Self::Article9
        } else if lowered.contains('8') {
            Self::Article8
        } else if lowered.contains('6') {
            Self::Article6
        } else {
            Self::Undeclared
        }
    }
}

/// Document-level metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Target audience
    #[serde(default)]
    pub client_type: ClientType,

    /// ISIN of the presented fund
    #[serde(default)]
    pub fund_isin: String,

    /// Name of the presented fund
    #[serde(default)]
    pub fund_name: String,

    /// Declared ESG classification ("Article 8", ...)
    #[serde(default)]
    pub esg_classification: String,

    /// Kind of document ("presentation", "factsheet", ...)
    #[serde(default)]
    pub document_type: String,

    /// Document language tag, loosely formatted
    #[serde(default)]
    pub language: String,

    /// Management company name
    #[serde(default)]
    pub management_company: String,
}

impl DocumentMetadata {
    /// ESG tier parsed from the declared classification
    pub fn esg_tier(&self) -> EsgTier {
        if self.esg_classification.trim().is_empty() {
            EsgTier::Undeclared
        } else {
            EsgTier::parse(&self.esg_classification)
        }
    }
}

/// Metadata override record with human-readable keys.
///
/// External metadata files fill in fields the document itself left blank.
/// Override values take precedence for `client_type` and `management_company`
/// only when the document's own field is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataOverrides {
    /// Raw key/value pairs ("is client professional" -> "yes")
    #[serde(flatten)]
    pub entries: BTreeMap<String, String>,
}

impl MetadataOverrides {
    /// Apply the overrides onto document metadata
    pub fn apply(&self, metadata: &mut DocumentMetadata) {
        for (key, value) in &self.entries {
            let key = key.trim().to_lowercase();
            match key.as_str() {
                "is client professional" => {
                    if metadata.client_type == ClientType::Unknown {
                        metadata.client_type = if parse_bool(value) {
                            ClientType::Professional
                        } else {
                            ClientType::Retail
                        };
                    }
                }
                "client type" => {
                    if metadata.client_type == ClientType::Unknown {
                        if let Ok(parsed) = value.parse::<ClientType>() {
                            metadata.client_type = parsed;
                        }
                    }
                }
                "management company" => {
                    if metadata.management_company.trim().is_empty() {
                        metadata.management_company = value.trim().to_string();
                    }
                }
                "language" => {
                    if metadata.language.trim().is_empty() {
                        metadata.language = value.trim().to_string();
                    }
                }
                "fund name" => {
                    if metadata.fund_name.trim().is_empty() {
                        metadata.fund_name = value.trim().to_string();
                    }
                }
                "fund isin" => {
                    if metadata.fund_isin.trim().is_empty() {
                        metadata.fund_isin = value.trim().to_string();
                    }
                }
                _ => {}
            }
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "yes" | "true" | "1" | "y")
}

/// Named content fields of a fixed page (cover, disclaimer, closing)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContent {
    /// Field name -> value
    #[serde(default)]
    pub content: BTreeMap<String, serde_json::Value>,
}

impl PageContent {
    /// Structured-field lookup: the value of a named field as trimmed text.
    ///
    /// Returns `None` when the field is absent; an empty string when present
    /// but blank (the two cases are distinct for presence rules).
    pub fn field_text(&self, key: &str) -> Option<String> {
        self.content.get(key).map(|value| match value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
            other => other.to_string(),
        })
    }

    /// All textual content of the page, for free-text fallback scans
    pub fn all_text(&self) -> String {
        let mut parts = Vec::new();
        for value in self.content.values() {
            match value {
                serde_json::Value::String(s) => parts.push(s.clone()),
                serde_json::Value::Array(items) => {
                    parts.extend(items.iter().filter_map(|v| v.as_str().map(String::from)));
                }
                _ => {}
            }
        }
        parts.join("\n")
    }
}

/// A table on a slide, as extracted cells
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideTable {
    /// Row-major cell text
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl SlideTable {
    /// All cell text joined for scanning
    pub fn all_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One body slide
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based position in the deck
    pub slide_number: u32,

    /// Slide title
    #[serde(default)]
    pub title: String,

    /// Text lines in reading order
    #[serde(default)]
    pub text: Vec<String>,

    /// Tables on the slide
    #[serde(default)]
    pub tables: Vec<SlideTable>,

    /// Speaker notes
    #[serde(default)]
    pub notes: Vec<String>,

    /// Layout metadata from the extractor, passed through untouched
    #[serde(default)]
    pub layout: BTreeMap<String, serde_json::Value>,
}

impl Slide {
    /// All text on the slide: title, lines, table cells, notes
    pub fn all_text(&self) -> String {
        let mut parts = vec![self.title.clone()];
        parts.extend(self.text.iter().cloned());
        parts.extend(self.tables.iter().map(|t| t.all_text()));
        parts.extend(self.notes.iter().cloned());
        parts.retain(|p| !p.trim().is_empty());
        parts.join("\n")
    }
}

/// The structured marketing document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document-level metadata
    #[serde(default)]
    pub document_metadata: DocumentMetadata,

    /// Cover page content fields
    #[serde(default)]
    pub cover_page: PageContent,

    /// Disclaimer slide content fields
    #[serde(default)]
    pub disclaimer_slide: PageContent,

    /// Ordered body slides
    #[serde(default)]
    pub body_slides: Vec<Slide>,

    /// Closing page content fields
    #[serde(default)]
    pub closing_page: PageContent,
}

impl Document {
    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Structural(format!("document does not parse: {}", e)))
    }

    /// Minimal shape validation, run before any module starts.
    ///
    /// Failure here aborts the run with a structural error - no partial report.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.body_slides.is_empty() {
            return Err(EngineError::Structural("document has no body slides".to_string()));
        }
        let mut last = 0u32;
        for slide in &self.body_slides {
            if slide.slide_number == 0 {
                return Err(EngineError::Structural(
                    "slide numbers must be 1-based".to_string(),
                ));
            }
            if slide.slide_number <= last {
                return Err(EngineError::Structural(format!(
                    "slide numbers out of order at slide {}",
                    slide.slide_number
                )));
            }
            last = slide.slide_number;
        }
        Ok(())
    }

    /// Number of body slides
    pub fn slide_count(&self) -> usize {
        self.body_slides.len()
    }

    /// Body slide by number
    pub fn slide(&self, number: u32) -> Option<&Slide> {
        self.body_slides.iter().find(|s| s.slide_number == number)
    }

    /// All document text: cover, body, disclaimer, closing
    pub fn full_text(&self) -> String {
        let mut parts = vec![self.cover_page.all_text()];
        parts.extend(self.body_slides.iter().map(|s| s.all_text()));
        parts.push(self.disclaimer_slide.all_text());
        parts.push(self.closing_page.all_text());
        parts.retain(|p| !p.trim().is_empty());
        parts.join("\n")
    }

    /// Total character count of the document text
    pub fn total_char_count(&self) -> usize {
        self.full_text().chars().count()
    }

    /// Two-phase field resolution: structured field on the given page first,
    /// then a labeled free-text fallback across the page text.
    ///
    /// Returns the value and the confidence of the resolution (100 for the
    /// structured path, 70 for the free-text path).
    pub fn resolve_field(&self, page: &PageContent, key: &str, label: &str) -> Option<(String, u8)> {
        if let Some(value) = page.field_text(key) {
            if !value.is_empty() {
                return Some((value, 100));
            }
        }
        // Free-text fallback: a "Label: value" line anywhere on the page
        let label_lower = label.to_lowercase();
        for line in page.all_text().lines() {
            let trimmed = line.trim();
            if let Some((lhs, rhs)) = trimmed.split_once(':') {
                if lhs.trim().to_lowercase() == label_lower && !rhs.trim().is_empty() {
                    return Some((rhs.trim().to_string(), 70));
                }
            }
        }
        None
    }

    /// Hex sha256 fingerprint of the canonicalized document JSON
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
