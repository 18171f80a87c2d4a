/*!
 * Tests for the violation filter contract
 */

use promolint::engine::{FalsePositivePattern, FilterReason, ViolationFilter};
use promolint::violation::{DetectionMethod, Location, ModuleId, Severity, Violation};

fn violation(rule_id: &str, module: ModuleId, severity: Severity, confidence: u8, evidence: &str) -> Violation {
    Violation::builder(rule_id, module, severity)
        .location(Location::slide(1))
        .evidence(evidence)
        .confidence(confidence)
        .detection_method(DetectionMethod::Semantic)
        .build()
}

#[test]
fn test_filter_defaultThreshold_shouldBe75() {
    let filter = ViolationFilter::new();
    let outcome = filter.filter(vec![
        violation("R-1", ModuleId::Esg, Severity::Major, 75, "a"),
        violation("R-2", ModuleId::Esg, Severity::Major, 74, "b"),
    ]);
    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.kept[0].rule_id, "R-1");
}

#[test]
fn test_filter_criticalBypassesThreshold_butNotPatterns() {
    let filter = ViolationFilter::new().with_patterns(vec![FalsePositivePattern {
        rule_id: "R-1".to_string(),
        evidence_contains: "benign".to_string(),
        note: "historical false positive".to_string(),
    }]);

    let outcome = filter.filter(vec![
        violation("R-1", ModuleId::Structure, Severity::Critical, 5, "genuine finding"),
        violation("R-1", ModuleId::Structure, Severity::Critical, 100, "a benign mention"),
    ]);

    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.kept[0].evidence, "genuine finding");
    assert_eq!(outcome.filtered_out.len(), 1);
    assert_eq!(outcome.filtered_out[0].reason, FilterReason::FalsePositivePattern);
}

#[test]
fn test_filter_perModuleThreshold_shouldApplyOnlyToThatModule() {
    let filter = ViolationFilter::new().with_module_threshold(ModuleId::Esg, 50);
    let outcome = filter.filter(vec![
        violation("R-1", ModuleId::Esg, Severity::Major, 60, "a"),
        violation("R-2", ModuleId::Performance, Severity::Major, 60, "b"),
    ]);

    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.kept[0].module, ModuleId::Esg);
}

#[test]
fn test_filter_droppedCandidates_shouldBeRetainedForAudit() {
    let filter = ViolationFilter::new();
    let outcome = filter.filter(vec![
        violation("R-1", ModuleId::Esg, Severity::Warning, 10, "a"),
        violation("R-2", ModuleId::Esg, Severity::Major, 95, "b"),
    ]);

    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.filtered_out.len(), 1);
    assert_eq!(outcome.filtered_out[0].violation.rule_id, "R-1");
}

#[test]
fn test_filter_emptyInput_shouldProduceEmptyOutcome() {
    let outcome = ViolationFilter::new().filter(vec![]);
    assert!(outcome.kept.is_empty());
    assert!(outcome.filtered_out.is_empty());
}
