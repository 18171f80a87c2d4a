/*!
 * Violation types produced by the check modules.
 *
 * A violation moves through three stages: candidate (emitted by a check
 * module), filtered (survived the violation filter), reported (grouped into
 * the final report). It is never mutated after creation; filtering produces
 * reduced lists, not in-place edits.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Severity of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before the document can be distributed
    Critical,
    /// Should be fixed, human reviewer decides
    Major,
    /// Advisory, including "manual review required" escalations
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Major => write!(f, "major"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// How a violation was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// Deterministic field presence/absence/format check
    FieldCheck,
    /// Keyword or forbidden-term match
    KeywordMatch,
    /// Semantic analyzer judgment
    Semantic,
    /// Comparison against a reference dataset
    CrossReference,
}

/// The eight independent check modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    Structure,
    Registration,
    Disclaimers,
    GeneralRules,
    Securities,
    Esg,
    Performance,
    ProspectusAlignment,
}

impl ModuleId {
    /// All modules in their canonical execution order
    pub fn all() -> [ModuleId; 8] {
        [
            Self::Structure,
            Self::Registration,
            Self::Disclaimers,
            Self::GeneralRules,
            Self::Securities,
            Self::Esg,
            Self::Performance,
            Self::ProspectusAlignment,
        ]
    }

    /// Stable identifier, also the rule file stem for this module
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Registration => "registration",
            Self::Disclaimers => "disclaimers",
            Self::GeneralRules => "general_rules",
            Self::Securities => "securities",
            Self::Esg => "esg",
            Self::Performance => "performance",
            Self::ProspectusAlignment => "prospectus_alignment",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where in the document a violation was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Slide number; 0 for the cover page, slide count + 1 for the closing page
    pub slide_number: u32,
    /// Section name ("cover_page", "body", "disclaimer_slide", ...)
    pub section: String,
}

impl Location {
    /// Location on a body slide
    pub fn slide(number: u32) -> Self {
        Self { slide_number: number, section: "body".to_string() }
    }

    /// Location in a named section of the document
    pub fn section(number: u32, section: &str) -> Self {
        Self { slide_number: number, section: section.to_string() }
    }

    /// Location that applies to the document as a whole
    pub fn document() -> Self {
        Self { slide_number: 0, section: "document".to_string() }
    }
}

/// A single violation of a compliance rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Unique id of this finding
    pub violation_id: String,
    /// Rule that was violated
    pub rule_id: String,
    /// Module that produced the finding
    pub module: ModuleId,
    /// Severity of the finding
    pub severity: Severity,
    /// Where in the document
    pub location: Location,
    /// Verbatim excerpt supporting the finding
    pub evidence: String,
    /// Confidence 0-100
    pub confidence: u8,
    /// How the finding was detected
    pub detection_method: DetectionMethod,
    /// Human-readable explanation
    pub explanation: String,
    /// Suggested remediation
    pub suggested_fix: String,
    /// Whether low analyzer confidence means a human must confirm
    #[serde(default)]
    pub needs_manual_review: bool,
}

impl Violation {
    /// Start building a violation for a rule
    pub fn builder(rule_id: &str, module: ModuleId, severity: Severity) -> ViolationBuilder {
        ViolationBuilder {
            rule_id: rule_id.to_string(),
            module,
            severity,
            location: Location::document(),
            evidence: String::new(),
            confidence: 100,
            detection_method: DetectionMethod::FieldCheck,
            explanation: String::new(),
            suggested_fix: String::new(),
            needs_manual_review: false,
        }
    }
}

/// Builder for [`Violation`]
pub struct ViolationBuilder {
    rule_id: String,
    module: ModuleId,
    severity: Severity,
    location: Location,
    evidence: String,
    confidence: u8,
    detection_method: DetectionMethod,
    explanation: String,
    suggested_fix: String,
    needs_manual_review: bool,
}

impl ViolationBuilder {
    /// Set the location
    pub fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Set the verbatim evidence excerpt
    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Set the confidence (clamped to 0-100)
    pub fn confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    /// Set the detection method
    pub fn detection_method(mut self, method: DetectionMethod) -> Self {
        self.detection_method = method;
        self
    }

    /// Set the explanation
    pub fn explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Set the suggested remediation
    pub fn suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = fix.into();
        self
    }

    /// Mark the finding as requiring manual confirmation
    pub fn needs_manual_review(mut self, needs: bool) -> Self {
        self.needs_manual_review = needs;
        self
    }

    /// Finalize the violation, assigning its id
    pub fn build(self) -> Violation {
        Violation {
            violation_id: Uuid::new_v4().to_string(),
            rule_id: self.rule_id,
            module: self.module,
            severity: self.severity,
            location: self.location,
            evidence: self.evidence,
            confidence: self.confidence,
            detection_method: self.detection_method,
            explanation: self.explanation,
            suggested_fix: self.suggested_fix,
            needs_manual_review: self.needs_manual_review,
        }
    }
}
