/*!
 * Disclaimer template glossary.
 *
 * Canonical disclaimer texts keyed by (language, client type, management
 * company). The disclaimers check fuzzy-matches the selected template against
 * the document's disclaimer content.
 */

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::document::model::ClientType;
use crate::errors::ReferenceError;
use crate::file_utils::FileManager;
use crate::text_utils::canonical_language_tag;

/// One canonical disclaimer template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclaimerTemplate {
    /// Template identifier ("risk_warning", "past_performance", ...)
    pub template_id: String,

    /// Language tag, loosely formatted
    pub language: String,

    /// Client type the template is written for
    pub client_type: ClientType,

    /// Management company the template belongs to
    pub management_company: String,

    /// Canonical template text
    pub text: String,

    /// Whether the disclaimer is mandatory for matching documents
    #[serde(default)]
    pub required: bool,
}

/// The disclaimer glossary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisclaimerGlossary {
    /// All templates
    pub templates: Vec<DisclaimerTemplate>,
}

impl DisclaimerGlossary {
    /// Load the glossary from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        if !FileManager::file_exists(path) {
            return Err(ReferenceError::Missing(path.display().to_string()));
        }
        FileManager::read_json(path).map_err(|e| ReferenceError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Templates for a (language, client type, company) key.
    ///
    /// Language tags are canonicalized before comparison, company names are
    /// compared case-insensitively. An empty result means the glossary has no
    /// entry for the key - the caller reports that as missing reference data,
    /// not as a missing disclaimer.
    pub fn lookup(
        &self,
        language: &str,
        client_type: ClientType,
        management_company: &str,
    ) -> Vec<&DisclaimerTemplate> {
        let wanted_language = canonical_language_tag(language);
        let wanted_company = management_company.trim().to_lowercase();

        self.templates
            .iter()
            .filter(|t| t.client_type == client_type)
            .filter(|t| t.management_company.trim().to_lowercase() == wanted_company)
            .filter(|t| match (&wanted_language, canonical_language_tag(&t.language)) {
                (Some(wanted), Some(candidate)) => *wanted == candidate,
                // Unresolvable tags fall back to raw comparison
                _ => t.language.trim().eq_ignore_ascii_case(language.trim()),
            })
            .collect()
    }
}
