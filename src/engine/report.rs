/*!
 * Report aggregation.
 *
 * Terminal stage of a run: groups the filtered violations by slide and by
 * module, orders them by severity then rule id, computes the compliance
 * score, and records which modules ran, which ran degraded and why, and
 * which findings need manual confirmation. The report is immutable and
 * produced once per run.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::checks::SkippedCheck;
use crate::document::context::ContextStats;
use crate::violation::{ModuleId, Severity, Violation};

use super::filter::FilteredViolation;

/// How a module fared during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Ran with its full rule set and reference data
    Ran,
    /// Ran without some of its inputs
    Degraded {
        /// What was missing
        reason: String,
    },
    /// Did not contribute to the report
    Skipped {
        /// Why the module was skipped
        reason: String,
    },
}

/// Per-module record in the report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module identity
    pub module: ModuleId,
    /// Outcome status
    pub status: ModuleStatus,
    /// Violations the module contributed (after filtering)
    pub violation_count: usize,
    /// Rules the module could not evaluate
    pub skipped_checks: Vec<SkippedCheck>,
}

/// Violation counts by severity
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical findings
    pub critical: usize,
    /// Major findings
    pub major: usize,
    /// Warnings
    pub warning: usize,
}

impl SeverityCounts {
    fn count(violations: &[Violation]) -> Self {
        let mut counts = Self::default();
        for violation in violations {
            match violation.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Major => counts.major += 1,
                Severity::Warning => counts.warning += 1,
            }
        }
        counts
    }

    /// Total findings
    pub fn total(&self) -> usize {
        self.critical + self.major + self.warning
    }
}

/// The final compliance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Unique id of this run
    pub run_id: String,

    /// When the report was produced
    pub generated_at: DateTime<Utc>,

    /// Hex sha256 of the analyzed document
    pub document_fingerprint: String,

    /// Fraction of body slides with zero reported violations
    pub compliance_score: f64,

    /// All reported violations, severity-then-rule ordered per slide
    pub violations: Vec<Violation>,

    /// Violations grouped by slide number (0 holds document-level findings)
    pub by_slide: BTreeMap<u32, Vec<Violation>>,

    /// Violations grouped by module
    pub by_module: BTreeMap<String, Vec<Violation>>,

    /// Counts by severity
    pub severity_counts: SeverityCounts,

    /// Candidates dropped by the filter, kept for audit
    pub filtered_out: Vec<FilteredViolation>,

    /// Per-module run records
    pub modules: Vec<ModuleRecord>,

    /// Cache and analyzer-call statistics
    pub context_stats: ContextStats,
}

impl Report {
    /// Modules that ran (fully or degraded)
    pub fn modules_run(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|r| !matches!(r.status, ModuleStatus::Skipped { .. }))
            .map(|r| r.module)
            .collect()
    }

    /// Modules that were skipped
    pub fn modules_skipped(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|r| matches!(r.status, ModuleStatus::Skipped { .. }))
            .map(|r| r.module)
            .collect()
    }

    /// Findings that need a human to confirm them
    pub fn manual_review_items(&self) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.needs_manual_review).collect()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} violations ({} critical, {} major, {} warning), compliance score {:.2}",
            self.severity_counts.total(),
            self.severity_counts.critical,
            self.severity_counts.major,
            self.severity_counts.warning,
            self.compliance_score
        )
    }
}

/// Builds the immutable report from the filtered violations
pub struct ReportAggregator {
    /// Number of body slides in the document
    total_slides: usize,
}

impl ReportAggregator {
    /// Aggregator for a document with the given slide count
    pub fn new(total_slides: usize) -> Self {
        Self { total_slides }
    }

    /// Produce the report.
    ///
    /// Violations within each slide sort by severity (critical > major >
    /// warning) then rule id, for a deterministic listing given identical
    /// cache state.
    pub fn aggregate(
        &self,
        mut violations: Vec<Violation>,
        filtered_out: Vec<FilteredViolation>,
        modules: Vec<ModuleRecord>,
        fingerprint: String,
        context_stats: ContextStats,
    ) -> Report {
        violations.sort_by(|a, b| {
            a.location
                .slide_number
                .cmp(&b.location.slide_number)
                .then_with(|| a.severity.cmp(&b.severity))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });

        let mut by_slide: BTreeMap<u32, Vec<Violation>> = BTreeMap::new();
        let mut by_module: BTreeMap<String, Vec<Violation>> = BTreeMap::new();
        for violation in &violations {
            by_slide
                .entry(violation.location.slide_number)
                .or_default()
                .push(violation.clone());
            by_module
                .entry(violation.module.to_string())
                .or_default()
                .push(violation.clone());
        }

        let slides_with_violations = by_slide.keys().filter(|n| **n > 0).count();
        let compliance_score = if self.total_slides > 0 {
            (self.total_slides.saturating_sub(slides_with_violations)) as f64
                / self.total_slides as f64
        } else {
            1.0
        };

        Report {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            document_fingerprint: fingerprint,
            compliance_score,
            severity_counts: SeverityCounts::count(&violations),
            violations,
            by_slide,
            by_module,
            filtered_out,
            modules,
            context_stats,
        }
    }
}
