/*!
 * Run-level invariants: idempotence across runs, the one-external-call-per-key
 * cache guarantee, and the confidence filter contract.
 */

use std::sync::Arc;

use promolint::analyzer::{ScriptedAnalyzer, StructuredAnswer};
use promolint::engine::{Engine, Report, ViolationFilter};
use promolint::violation::Severity;

use crate::common;

/// Order-independent fingerprint of a violation set (ids and timestamps vary
/// between runs by construction)
fn violation_set(report: &Report) -> Vec<(String, String, u32, String)> {
    let mut set: Vec<_> = report
        .violations
        .iter()
        .map(|v| {
            (
                v.rule_id.clone(),
                v.module.to_string(),
                v.location.slide_number,
                v.evidence.clone(),
            )
        })
        .collect();
    set.sort();
    set
}

#[tokio::test]
async fn test_identicalInputs_shouldProduceIdenticalViolationSets() {
    let mut document = common::sample_document();
    document.body_slides[0]
        .text
        .push("Returns are guaranteed by our robust process.".to_string());
    document
        .cover_page
        .content
        .insert("promotional_document_mention".to_string(), serde_json::json!(""));

    // Fresh engine and analyzer per run: caches start cleared
    let first = Engine::new(common::compliant_analyzer())
        .run(&document, None, &common::full_reference_store())
        .await
        .unwrap();
    let second = Engine::new(common::compliant_analyzer())
        .run(&document, None, &common::full_reference_store())
        .await
        .unwrap();

    assert!(!first.violations.is_empty());
    assert_eq!(violation_set(&first), violation_set(&second));
    assert_eq!(first.document_fingerprint, second.document_fingerprint);
}

#[tokio::test]
async fn test_termMentionedManyTimes_shouldClassifyExactlyOnce() {
    let mut document = common::sample_document();
    // "Nvidia" appears on every body slide, well above the repetition
    // threshold
    for slide in &mut document.body_slides {
        slide.text.push("Nvidia contributed to returns.".to_string());
        slide.text.push("Nvidia remains a large position.".to_string());
    }

    let analyzer = Arc::new(
        ScriptedAnalyzer::new()
            .on_question("tradable security", StructuredAnswer::text("security", 95))
            .on_question(
                "distribution-authorization",
                StructuredAnswer::list(vec!["France".to_string()], 100),
            )
            .on_question("about the fund itself", StructuredAnswer::text("market", 92))
            .on_question("primarily about ESG", StructuredAnswer::yes_no(false, 90))
            .on_question("recommend buying", StructuredAnswer::yes_no(false, 92))
            .on_question("elaboration or a contradiction", StructuredAnswer::text("elaboration", 90))
            .with_default(StructuredAnswer::yes_no(false, 85)),
    );

    let report = Engine::new(analyzer.clone())
        .run(&document, None, &common::full_reference_store())
        .await
        .unwrap();

    // Six mentions, one external classification call
    assert_eq!(analyzer.calls_matching("tradable security"), 1);
    assert!(report.violations.iter().any(|v| v.rule_id == "SEC-001"));
}

#[tokio::test]
async fn test_reportedViolations_shouldRespectConfidenceContract() {
    // Low-confidence answers everywhere: only critical findings and findings
    // at or above the threshold may survive
    let analyzer = Arc::new(
        ScriptedAnalyzer::new()
            .on_question(
                "distribution-authorization",
                StructuredAnswer::list(
                    vec!["France".to_string(), "Ireland".to_string()],
                    40,
                ),
            )
            .on_question("about the fund itself", StructuredAnswer::text("market", 40))
            .on_question("primarily about ESG", StructuredAnswer::yes_no(true, 40))
            .on_question("recommend buying", StructuredAnswer::yes_no(false, 40))
            .on_question("tradable security", StructuredAnswer::text("concept", 40))
            .on_question("elaboration or a contradiction", StructuredAnswer::text("elaboration", 40))
            .with_default(StructuredAnswer::yes_no(false, 40)),
    );

    let report = Engine::new(analyzer)
        .run(&common::sample_document(), None, &common::full_reference_store())
        .await
        .unwrap();

    let threshold = promolint::engine::DEFAULT_CONFIDENCE_THRESHOLD;
    for violation in &report.violations {
        assert!(
            violation.severity == Severity::Critical || violation.confidence >= threshold,
            "non-critical violation below threshold survived: {:?}",
            violation
        );
    }

    // The low-confidence Ireland finding is critical, so it must be retained
    assert!(report
        .violations
        .iter()
        .any(|v| v.evidence == "Ireland" && v.confidence == 40));

    // Nothing dropped by the filter is lost: the audit list holds them
    for dropped in &report.filtered_out {
        assert!(dropped.violation.severity != Severity::Critical);
    }
}

#[tokio::test]
async fn test_slideSubject_shouldResolveOncePerSlide() {
    let analyzer = common::compliant_analyzer();
    let document = common::sample_document();

    let report = Engine::new(analyzer.clone())
        .run(&document, None, &common::full_reference_store())
        .await
        .unwrap();

    // One subject call per body slide, no more
    assert_eq!(analyzer.calls_matching("about the fund itself"), document.body_slides.len());
    assert_eq!(report.context_stats.subject.misses, document.body_slides.len());
}

#[tokio::test]
async fn test_filterAudit_keptPlusDropped_shouldAccountForAllCandidates() {
    let mut document = common::sample_document();
    document.body_slides[0]
        .text
        .push("Returns are guaranteed by our robust process.".to_string());

    let filter = ViolationFilter::new().with_default_threshold(100);
    let report = Engine::new(common::compliant_analyzer())
        .with_filter(filter)
        .run(&document, None, &common::full_reference_store())
        .await
        .unwrap();

    // The critical forbidden-term finding survives even a maximal threshold
    assert!(report.violations.iter().any(|v| v.rule_id == "GEN-002"));
}
