/*!
 * Run orchestration.
 *
 * One document per run: build the document context, execute the eight check
 * modules concurrently over a bounded worker pool, merge their candidate
 * violations, filter, and aggregate into the report. A structural document
 * failure aborts before any module starts; a module-level failure is caught,
 * logged, and reflected in the report metadata while the run completes with
 * the remaining modules.
 */

use futures::stream::{self, StreamExt};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::analyzer::SemanticAnalyzer;
use crate::checks::{
    CheckContext, CheckModule, CheckOptions, DisclaimersCheck, EsgCheck, GeneralRulesCheck,
    ModuleOutcome, PerformanceCheck, ProspectusAlignmentCheck, RegistrationCheck, SecuritiesCheck,
    StructureCheck,
};
use crate::classifier::EntityClassifier;
use crate::document::context::DocumentContext;
use crate::document::model::{Document, MetadataOverrides};
use crate::errors::EngineError;
use crate::reference::ReferenceStore;
use crate::violation::Violation;

use super::filter::ViolationFilter;
use super::report::{ModuleRecord, ModuleStatus, Report, ReportAggregator};

/// The evaluation engine
pub struct Engine {
    analyzer: Arc<dyn SemanticAnalyzer>,
    options: CheckOptions,
    filter: ViolationFilter,
}

impl Engine {
    /// Engine over the given analyzer with default options
    pub fn new(analyzer: Arc<dyn SemanticAnalyzer>) -> Self {
        Self { analyzer, options: CheckOptions::default(), filter: ViolationFilter::default() }
    }

    /// Set the check thresholds
    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the violation filter
    pub fn with_filter(mut self, filter: ViolationFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The eight modules in canonical order
    fn modules() -> Vec<Box<dyn CheckModule>> {
        vec![
            Box::new(StructureCheck),
            Box::new(RegistrationCheck),
            Box::new(DisclaimersCheck),
            Box::new(GeneralRulesCheck),
            Box::new(SecuritiesCheck),
            Box::new(EsgCheck),
            Box::new(PerformanceCheck),
            Box::new(ProspectusAlignmentCheck),
        ]
    }

    /// Evaluate a document
    pub async fn run(
        &self,
        document: &Document,
        overrides: Option<&MetadataOverrides>,
        references: &ReferenceStore,
    ) -> Result<Report, EngineError> {
        self.run_with_progress(document, overrides, references, |_, _| {}).await
    }

    /// Evaluate a document, reporting module completion progress
    pub async fn run_with_progress(
        &self,
        document: &Document,
        overrides: Option<&MetadataOverrides>,
        references: &ReferenceStore,
        progress_callback: impl Fn(usize, usize) + Send + Sync,
    ) -> Result<Report, EngineError> {
        // Structural failure aborts before any module starts
        let ctx = DocumentContext::build(document, overrides)?;

        let classifier = EntityClassifier::new(Arc::clone(&self.analyzer)).with_exclusions(
            [
                ctx.metadata.fund_name.clone(),
                ctx.metadata.management_company.clone(),
            ]
            .into_iter()
            .filter(|n| !n.trim().is_empty()),
        );

        let modules = Self::modules();
        let total_modules = modules.len();

        // Bounded worker pool sized to module count; the modules are
        // read-only against the document and rules, so they run concurrently
        let semaphore = Arc::new(Semaphore::new(total_modules));
        let progress_callback = &progress_callback;
        let completed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let cx = CheckContext {
            document,
            ctx: &ctx,
            references,
            classifier: &classifier,
            analyzer: self.analyzer.as_ref(),
            options: &self.options,
        };
        let cx = &cx;

        let mut results: Vec<(usize, crate::violation::ModuleId, Result<ModuleOutcome, EngineError>)> =
            stream::iter(modules.iter().enumerate())
                .map(|(index, module)| {
                    let semaphore = Arc::clone(&semaphore);
                    let completed = Arc::clone(&completed);
                    async move {
                        let _permit = semaphore.acquire().await.expect("semaphore closed");
                        let id = module.id();
                        let result = module.run(cx).await;
                        let done =
                            completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                        progress_callback(done, total_modules);
                        (index, id, result)
                    }
                })
                .buffer_unordered(total_modules)
                .collect()
                .await;

        // Restore canonical module order for a deterministic report
        results.sort_by_key(|(index, _, _)| *index);

        let mut candidates: Vec<Violation> = Vec::new();
        let mut records: Vec<ModuleRecord> = Vec::new();

        for (_, module_id, result) in results {
            match result {
                Ok(outcome) => {
                    info!(
                        "Module {} produced {} candidate violation(s)",
                        module_id,
                        outcome.violations.len()
                    );
                    let status = match outcome.degraded_reason {
                        Some(reason) => ModuleStatus::Degraded { reason },
                        None => ModuleStatus::Ran,
                    };
                    records.push(ModuleRecord {
                        module: module_id,
                        status,
                        violation_count: outcome.violations.len(),
                        skipped_checks: outcome.skipped,
                    });
                    candidates.extend(outcome.violations);
                }
                Err(e) => {
                    // Module-local failure: the run completes without it
                    error!("Module {} failed: {}", module_id, e);
                    records.push(ModuleRecord {
                        module: module_id,
                        status: ModuleStatus::Skipped { reason: e.to_string() },
                        violation_count: 0,
                        skipped_checks: Vec::new(),
                    });
                }
            }
        }

        let filter_outcome = self.filter.filter(candidates);

        // Reflect post-filter counts in the module records
        for record in &mut records {
            record.violation_count = filter_outcome
                .kept
                .iter()
                .filter(|v| v.module == record.module)
                .count();
        }

        let report = ReportAggregator::new(document.slide_count()).aggregate(
            filter_outcome.kept,
            filter_outcome.filtered_out,
            records,
            ctx.fingerprint.clone(),
            ctx.stats(),
        );
        info!("Run {} complete: {}", report.run_id, report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{ScriptedAnalyzer, StructuredAnswer};
    use crate::document::model::Slide;
    use crate::reference::{Rule, RuleSet, RuleValidation};
    use crate::violation::{ModuleId, Severity};
    use std::collections::HashMap;

    fn document() -> Document {
        Document {
            body_slides: vec![
                Slide {
                    slide_number: 1,
                    title: "Overview".to_string(),
                    text: vec!["A diversified strategy.".to_string()],
                    ..Default::default()
                },
                Slide {
                    slide_number: 2,
                    title: "Terms".to_string(),
                    text: vec!["Guaranteed returns for everyone.".to_string()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn references() -> ReferenceStore {
        ReferenceStore::from_parts(
            HashMap::from([(
                ModuleId::GeneralRules,
                RuleSet {
                    category: "general_rules".to_string(),
                    rules: vec![Rule {
                        rule_id: "GEN-002".to_string(),
                        severity: Severity::Critical,
                        validation: RuleValidation::Absence {
                            forbidden_terms: vec!["guaranteed".to_string()],
                        },
                        keywords: vec![],
                        applies_if: None,
                        description: String::new(),
                        suggested_fix: String::new(),
                    }],
                },
            )]),
            None,
            None,
            None,
        )
    }

    fn analyzer() -> Arc<ScriptedAnalyzer> {
        Arc::new(
            ScriptedAnalyzer::new()
                .on_question("about the fund itself", StructuredAnswer::text("none", 90))
                .with_default(StructuredAnswer::yes_no(false, 90)),
        )
    }

    #[tokio::test]
    async fn test_run_structuralFailure_shouldAbortWithoutReport() {
        let engine = Engine::new(analyzer());
        let result = engine.run(&Document::default(), None, &references()).await;
        assert!(matches!(result, Err(EngineError::Structural(_))));
    }

    #[tokio::test]
    async fn test_run_shouldRecordAllEightModules() {
        let engine = Engine::new(analyzer());
        let report = engine.run(&document(), None, &references()).await.unwrap();
        assert_eq!(report.modules.len(), 8);
        assert!(report.modules_skipped().is_empty());
    }

    #[tokio::test]
    async fn test_run_forbiddenTerm_shouldSurviveFilterAndScore() {
        let engine = Engine::new(analyzer());
        let report = engine.run(&document(), None, &references()).await.unwrap();

        assert!(report.violations.iter().any(|v| v.rule_id == "GEN-002"));
        // Slide 1 is clean, slide 2 is not
        assert!((report.compliance_score - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_run_missingRuleFiles_shouldDegradeModules() {
        let engine = Engine::new(analyzer());
        let report = engine.run(&document(), None, &references()).await.unwrap();

        let degraded: Vec<_> = report
            .modules
            .iter()
            .filter(|r| matches!(r.status, ModuleStatus::Degraded { .. }))
            .collect();
        // Seven modules had no rule file in this store
        assert_eq!(degraded.len(), 7);
    }

    #[tokio::test]
    async fn test_run_progressCallback_shouldReachTotal() {
        let engine = Engine::new(analyzer());
        let max_seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let max_clone = Arc::clone(&max_seen);

        engine
            .run_with_progress(&document(), None, &references(), move |done, _| {
                max_clone.fetch_max(done, std::sync::atomic::Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert_eq!(max_seen.load(std::sync::atomic::Ordering::SeqCst), 8);
    }
}
