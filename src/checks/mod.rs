/*!
 * Check modules.
 *
 * Eight mutually independent modules share one contract: given the document,
 * the per-run context, their rule set, the reference data, the classifier,
 * and the analyzer port, produce candidate violations. Modules are pure with
 * respect to their inputs except for reads/writes to the shared context
 * caches, and never raise on missing optional reference data.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analyzer::SemanticAnalyzer;
use crate::classifier::EntityClassifier;
use crate::document::context::DocumentContext;
use crate::document::model::Document;
use crate::errors::EngineError;
use crate::reference::{Applicability, ReferenceStore, Rule, RuleSet};
use crate::violation::{DetectionMethod, Location, ModuleId, Severity, Violation};

pub mod disclaimers;
pub mod esg;
pub mod general;
pub mod performance;
pub mod prospectus;
pub mod registration;
pub mod securities;
pub mod structure;

pub use disclaimers::DisclaimersCheck;
pub use esg::EsgCheck;
pub use general::GeneralRulesCheck;
pub use performance::PerformanceCheck;
pub use prospectus::ProspectusAlignmentCheck;
pub use registration::RegistrationCheck;
pub use securities::SecuritiesCheck;
pub use structure::StructureCheck;

/// Tunable thresholds shared by the check modules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Similarity at or above which a disclaimer counts as present
    #[serde(default = "default_disclaimer_similarity")]
    pub disclaimer_similarity: f32,

    /// Similarity above which a below-threshold match is "present but
    /// incomplete" rather than missing
    #[serde(default = "default_partial_similarity")]
    pub partial_similarity: f32,

    /// Mentions of the same security above this count are flagged
    #[serde(default = "default_repetition_threshold")]
    pub repetition_threshold: usize,

    /// Minimum track record in years before performance may be shown
    #[serde(default = "default_min_track_record_years")]
    pub min_track_record_years: u32,

    /// Maximum ESG content fraction for an undeclared/Article 6 fund
    #[serde(default = "default_esg_fraction_article6")]
    pub esg_fraction_article6: f64,

    /// Minimum ESG content fraction expected of an Article 9 fund
    #[serde(default = "default_esg_fraction_article9")]
    pub esg_fraction_article9: f64,
}

fn default_disclaimer_similarity() -> f32 {
    0.90
}

fn default_partial_similarity() -> f32 {
    0.50
}

fn default_repetition_threshold() -> usize {
    3
}

fn default_min_track_record_years() -> u32 {
    1
}

fn default_esg_fraction_article6() -> f64 {
    0.10
}

fn default_esg_fraction_article9() -> f64 {
    0.05
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            disclaimer_similarity: default_disclaimer_similarity(),
            partial_similarity: default_partial_similarity(),
            repetition_threshold: default_repetition_threshold(),
            min_track_record_years: default_min_track_record_years(),
            esg_fraction_article6: default_esg_fraction_article6(),
            esg_fraction_article9: default_esg_fraction_article9(),
        }
    }
}

/// Everything a check module consumes
pub struct CheckContext<'a> {
    /// The document under review
    pub document: &'a Document,
    /// Per-run context and caches
    pub ctx: &'a DocumentContext,
    /// Reference data store
    pub references: &'a ReferenceStore,
    /// Entity classifier
    pub classifier: &'a EntityClassifier,
    /// Semantic analyzer port
    pub analyzer: &'a dyn SemanticAnalyzer,
    /// Thresholds
    pub options: &'a CheckOptions,
}

/// A rule that was skipped, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCheck {
    /// Rule that was skipped
    pub rule_id: String,
    /// Why ("skipped_insufficient_metadata", "reference data unavailable")
    pub reason: String,
}

/// What one module produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleOutcome {
    /// Candidate violations in per-slide iteration order
    pub violations: Vec<Violation>,
    /// Set when the module ran without its rule file or a needed dataset
    pub degraded_reason: Option<String>,
    /// Rules that could not be evaluated
    pub skipped: Vec<SkippedCheck>,
}

impl ModuleOutcome {
    /// Outcome with violations only
    pub fn with_violations(violations: Vec<Violation>) -> Self {
        Self { violations, ..Default::default() }
    }
}

/// Common contract of the eight check modules
#[async_trait]
pub trait CheckModule: Send + Sync {
    /// Stable module identity
    fn id(&self) -> ModuleId;

    /// Evaluate the module's rules against the document
    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError>;
}

/// Outcome of a module whose rule file is absent: a single advisory so the
/// absence reads as "not verified", never as a false pass.
pub fn degraded_outcome(module: ModuleId) -> ModuleOutcome {
    let violation = Violation::builder(&format!("{}-unverified", module.as_str()), module, Severity::Warning)
        .location(Location::document())
        .detection_method(DetectionMethod::FieldCheck)
        .explanation(format!(
            "Checks of module '{}' were not verified - rule data unavailable",
            module
        ))
        .suggested_fix("Provide the module's rule file and re-run the analysis".to_string())
        .confidence(100)
        .needs_manual_review(true)
        .build();
    ModuleOutcome {
        violations: vec![violation],
        degraded_reason: Some("rule file missing".to_string()),
        skipped: Vec::new(),
    }
}

/// Advisory violation for a hard requirement that could not be verified
/// because its reference dataset is absent.
pub fn unverifiable_rule_advisory(rule: &Rule, module: ModuleId, dataset: &str) -> Violation {
    Violation::builder(&rule.rule_id, module, Severity::Warning)
        .location(Location::document())
        .detection_method(DetectionMethod::CrossReference)
        .explanation(format!(
            "Rule '{}' requires the '{}' dataset, which is unavailable - not verified",
            rule.rule_id, dataset
        ))
        .suggested_fix(format!("Provide the '{}' reference dataset and re-run", dataset))
        .confidence(100)
        .needs_manual_review(true)
        .build()
}

/// Warning violation for an analyzer that exhausted its retries: surfaced as
/// "manual review required" instead of failing the module.
pub fn manual_review_violation(
    rule_id: &str,
    module: ModuleId,
    location: Location,
    detail: &str,
) -> Violation {
    Violation::builder(rule_id, module, Severity::Warning)
        .location(location)
        .detection_method(DetectionMethod::Semantic)
        .explanation(format!("Manual review required - semantic analysis unavailable: {}", detail))
        .suggested_fix("Have a compliance reviewer confirm this point manually".to_string())
        .confidence(100)
        .needs_manual_review(true)
        .build()
}

/// Gate a rule on its applicability predicate, recording skips.
///
/// Returns `true` when the rule should be evaluated.
pub fn gate_rule(rule: &Rule, cx: &CheckContext<'_>, outcome: &mut ModuleOutcome) -> bool {
    match rule.applicability(&cx.ctx.metadata) {
        Applicability::Applies => true,
        Applicability::NotApplicable => false,
        Applicability::UnknownMetadata => {
            outcome.skipped.push(SkippedCheck {
                rule_id: rule.rule_id.clone(),
                reason: "skipped_insufficient_metadata".to_string(),
            });
            false
        }
    }
}

/// Fetch the module's rule set or produce the degraded outcome.
pub fn require_rules<'a>(
    cx: &'a CheckContext<'_>,
    module: ModuleId,
) -> Result<&'a RuleSet, Box<ModuleOutcome>> {
    match cx.references.rule_set(module) {
        Some(set) => Ok(set),
        None => Err(Box::new(degraded_outcome(module))),
    }
}
