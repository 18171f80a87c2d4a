/*!
 * Rule corpus model.
 *
 * Rules are immutable reference data, loaded once per run and shared
 * read-only across all checks. The validation kind is a tagged variant so a
 * new kind is a compile-time-checked addition, dispatched by exhaustive
 * pattern matching in the check modules.
 */

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::document::model::{ClientType, DocumentMetadata};
use crate::errors::ReferenceError;
use crate::file_utils::FileManager;
use crate::violation::Severity;

/// What a rule validates, with only the fields that kind needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "validation_type", rename_all = "snake_case")]
pub enum RuleValidation {
    /// A named field must be present and non-empty
    Presence {
        /// Field key in the page content map
        field: String,
        /// Section holding the field ("cover_page", "disclaimer_slide", ...)
        section: String,
        /// Free-text label for the fallback resolution phase
        #[serde(default)]
        label: String,
    },

    /// None of the forbidden terms may appear in the document
    Absence {
        /// Ordered forbidden terms
        forbidden_terms: Vec<String>,
    },

    /// A named field must match a pattern
    Format {
        /// Field key in the page content map
        field: String,
        /// Section holding the field
        section: String,
        /// Regex the value must match
        pattern: String,
    },

    /// Document content is compared against a reference dataset
    ExternalReference {
        /// Dataset key ("registration_table", "disclaimer_glossary",
        /// "prospectus_facts")
        dataset: String,
    },

    /// The analyzer judges a bounded natural-language question
    Semantic {
        /// Question template put to the analyzer
        question: String,
    },
}

/// Predicate over document metadata restricting when a rule applies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppliesIf {
    /// Rule only applies to this client type
    #[serde(default)]
    pub client_type: Option<ClientType>,
}

/// Whether a rule applies to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// The rule applies
    Applies,
    /// The rule does not apply to this document
    NotApplicable,
    /// The rule is gated on metadata the document does not carry
    UnknownMetadata,
}

/// One compliance rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Stable id, globally unique within its module
    pub rule_id: String,

    /// Severity assigned to violations of this rule
    pub severity: Severity,

    /// What the rule validates
    #[serde(flatten)]
    pub validation: RuleValidation,

    /// Keywords that scope the rule to matching content
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Optional applicability predicate
    #[serde(default)]
    pub applies_if: Option<AppliesIf>,

    /// Human-readable description of the requirement
    #[serde(default)]
    pub description: String,

    /// Suggested remediation attached to violations
    #[serde(default)]
    pub suggested_fix: String,
}

impl Rule {
    /// Evaluate the applicability predicate against resolved metadata
    pub fn applicability(&self, metadata: &DocumentMetadata) -> Applicability {
        let Some(applies_if) = &self.applies_if else {
            return Applicability::Applies;
        };
        match applies_if.client_type {
            None => Applicability::Applies,
            Some(required) => {
                if metadata.client_type == ClientType::Unknown {
                    Applicability::UnknownMetadata
                } else if metadata.client_type == required {
                    Applicability::Applies
                } else {
                    Applicability::NotApplicable
                }
            }
        }
    }
}

/// The rule set of one module, loaded from its own file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Category label carried by the rule file
    pub category: String,

    /// Rules in file order
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Load a module's rule file.
    ///
    /// A missing file is a [`ReferenceError::Missing`] so the module can run
    /// in degraded mode instead of falsely passing.
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

    /// Rule by id
    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }
}
