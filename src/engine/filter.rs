/*!
 * Violation filter.
 *
 * Applies the curated false-positive pattern list and the per-module
 * confidence thresholds to candidate violations. Critical violations bypass
 * the confidence threshold (never silently dropped) but remain subject to
 * pattern exclusion. Every dropped candidate is retained in a filtered-out
 * list with its reason, for transparency and audit.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::file_utils::FileManager;
use crate::violation::{ModuleId, Severity, Violation};

/// Default confidence threshold for non-critical violations
pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 75;

/// A known false-positive signature: rule id plus an evidence substring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalsePositivePattern {
    /// Rule the pattern applies to
    pub rule_id: String,
    /// Substring of the evidence that marks the false positive
    pub evidence_contains: String,
    /// Why the pattern exists
    #[serde(default)]
    pub note: String,
}

impl FalsePositivePattern {
    fn matches(&self, violation: &Violation) -> bool {
        violation.rule_id == self.rule_id
            && !self.evidence_contains.is_empty()
            && violation
                .evidence
                .to_lowercase()
                .contains(&self.evidence_contains.to_lowercase())
    }
}

/// Why a candidate was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    /// Matched a curated false-positive pattern
    FalsePositivePattern,
    /// Confidence below the module's threshold
    BelowConfidenceThreshold,
}

/// A dropped candidate, kept for audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredViolation {
    /// The dropped candidate
    pub violation: Violation,
    /// Why it was dropped
    pub reason: FilterReason,
}

/// Result of a filter pass: a new reduced list, not in-place edits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOutcome {
    /// Violations that survived
    pub kept: Vec<Violation>,
    /// Violations that were dropped, with reasons
    pub filtered_out: Vec<FilteredViolation>,
}

/// The violation filter
#[derive(Debug, Clone)]
pub struct ViolationFilter {
    patterns: Vec<FalsePositivePattern>,
    default_threshold: u8,
    module_thresholds: HashMap<ModuleId, u8>,
}

impl Default for ViolationFilter {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            default_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            module_thresholds: HashMap::new(),
        }
    }
}

impl ViolationFilter {
    /// Filter with the default threshold and no patterns
    pub fn new() -> Self {
        Self::default()
    }

    /// Add false-positive patterns
    pub fn with_patterns(mut self, patterns: Vec<FalsePositivePattern>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    /// Load additional patterns from a JSON file (an array of patterns).
    /// A missing file leaves the filter unchanged.
    pub fn with_patterns_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        if let Ok(Some(patterns)) =
            FileManager::read_json_optional::<Vec<FalsePositivePattern>, _>(path)
        {
            self.patterns.extend(patterns);
        }
        self
    }

    /// Set the default confidence threshold
    pub fn with_default_threshold(mut self, threshold: u8) -> Self {
        self.default_threshold = threshold.min(100);
        self
    }

    /// Override the threshold for one module
    pub fn with_module_threshold(mut self, module: ModuleId, threshold: u8) -> Self {
        self.module_thresholds.insert(module, threshold.min(100));
        self
    }

    fn threshold_for(&self, module: ModuleId) -> u8 {
        self.module_thresholds.get(&module).copied().unwrap_or(self.default_threshold)
    }

    /// Apply pattern exclusion, then the confidence threshold.
    ///
    /// Candidates are never mutated; the outcome is a reduced copy.
    pub fn filter(&self, candidates: Vec<Violation>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for violation in candidates {
            if self.patterns.iter().any(|p| p.matches(&violation)) {
                debug!("Filtered {} by false-positive pattern", violation.rule_id);
                outcome.filtered_out.push(FilteredViolation {
                    violation,
                    reason: FilterReason::FalsePositivePattern,
                });
                continue;
            }

            // Critical findings bypass the confidence threshold
            if violation.severity != Severity::Critical
                && violation.confidence < self.threshold_for(violation.module)
            {
                debug!(
                    "Filtered {} below confidence threshold ({} < {})",
                    violation.rule_id,
                    violation.confidence,
                    self.threshold_for(violation.module)
                );
                outcome.filtered_out.push(FilteredViolation {
                    violation,
                    reason: FilterReason::BelowConfidenceThreshold,
                });
                continue;
            }

            outcome.kept.push(violation);
        }

        outcome
    }
}
