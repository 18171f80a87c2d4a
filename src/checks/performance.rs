/*!
 * Performance checks.
 *
 * For every slide, one cached semantic call resolves whether performance
 * figures are about the fund itself, the broader market, or absent. Only
 * fund-subject slides trigger the performance rule set (track record length,
 * benchmark presence, past-performance disclaimer adjacency, forbidden
 * phrasing). Market commentary is recorded but never flagged. The subject
 * cache lives in the document context; a slide is resolved at most once per
 * run.
 */

use async_trait::async_trait;
use regex::Regex;

use crate::analyzer::{AnalyzerRequest, AnswerSchema, SemanticAnalyzer};
use crate::document::context::{DocumentContext, SlideSubject, SubjectResolution};
use crate::document::model::Slide;
use crate::errors::EngineError;
use crate::reference::RuleValidation;
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{CheckContext, CheckModule, ModuleOutcome, gate_rule, manual_review_violation, require_rules};

/// The performance check module
#[derive(Debug, Default)]
pub struct PerformanceCheck;

impl PerformanceCheck {
    /// Resolve the performance subject of a slide through the shared cache.
    ///
    /// At most one external call per slide number per run; concurrent misses
    /// coalesce on the in-flight call.
    pub async fn resolve_subject(
        ctx: &DocumentContext,
        analyzer: &dyn SemanticAnalyzer,
        slide: &Slide,
    ) -> SubjectResolution {
        let text = slide.all_text();
        let synopsis = ctx.summary(slide.slide_number).unwrap_or_default().to_string();

        ctx.subject_cache
            .get_or_compute(slide.slide_number, || async move {
                ctx.record_semantic_call();
                let request = AnalyzerRequest::new(
                    "Are the performance figures or performance statements on this slide \
                     about the fund itself, about the broader market, or is there no \
                     performance content? Earlier context of the deck may help disambiguate.",
                    format!("{}\n\nDeck context: {}", text, synopsis),
                    AnswerSchema::Choice {
                        options: vec![
                            "fund".to_string(),
                            "market".to_string(),
                            "none".to_string(),
                        ],
                    },
                );
                match analyzer.ask(request).await {
                    Ok(answer) => {
                        let subject = match answer.value.as_text() {
                            Some("fund") => SlideSubject::Fund,
                            Some("market") => SlideSubject::Market,
                            _ => SlideSubject::None,
                        };
                        SubjectResolution { subject, confidence: answer.confidence }
                    }
                    Err(_) => SubjectResolution { subject: SlideSubject::None, confidence: 0 },
                }
            })
            .await
    }
}

#[async_trait]
impl CheckModule for PerformanceCheck {
    fn id(&self) -> ModuleId {
        ModuleId::Performance
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        for slide in &cx.document.body_slides {
            if slide.all_text().trim().is_empty() {
                continue;
            }

            let resolution = Self::resolve_subject(cx.ctx, cx.analyzer, slide).await;
            if resolution.confidence == 0 {
                outcome.violations.push(manual_review_violation(
                    "performance-subject",
                    self.id(),
                    Location::slide(slide.slide_number),
                    "slide subject could not be resolved",
                ));
                continue;
            }
            if resolution.subject != SlideSubject::Fund {
                // Market commentary and non-performance slides are out of scope
                continue;
            }

            let text = slide.all_text();
            for rule in &rules.rules {
                if !gate_rule(rule, cx, &mut outcome) {
                    continue;
                }

                match &rule.validation {
                    // A fund-performance slide must carry the referenced
                    // content (benchmark figure, past-performance warning)
                    RuleValidation::Format { pattern, .. } => {
                        let Ok(regex) = Regex::new(pattern) else {
                            continue;
                        };
                        if !regex.is_match(&text) {
                            outcome.violations.push(
                                Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                    .location(Location::slide(slide.slide_number))
                                    .detection_method(DetectionMethod::FieldCheck)
                                    .evidence(slide.title.clone())
                                    .explanation(if rule.description.is_empty() {
                                        "Fund performance slide lacks required accompanying content"
                                            .to_string()
                                    } else {
                                        rule.description.clone()
                                    })
                                    .suggested_fix(rule.suggested_fix.clone())
                                    .confidence(resolution.confidence)
                                    .build(),
                            );
                        }
                    }

                    RuleValidation::Absence { forbidden_terms } => {
                        let lowered = text.to_lowercase();
                        for term in forbidden_terms {
                            if lowered.contains(&term.to_lowercase()) {
                                outcome.violations.push(
                                    Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                        .location(Location::slide(slide.slide_number))
                                        .detection_method(DetectionMethod::KeywordMatch)
                                        .evidence(term.clone())
                                        .explanation(if rule.description.is_empty() {
                                            format!(
                                                "Forbidden performance phrasing '{}' on a fund \
                                                 performance slide",
                                                term
                                            )
                                        } else {
                                            rule.description.clone()
                                        })
                                        .suggested_fix(rule.suggested_fix.clone())
                                        .confidence(100)
                                        .build(),
                                );
                            }
                        }
                    }

                    // Per-slide semantic judgments (track record length,
                    // simulated-performance labeling, ...)
                    RuleValidation::Semantic { question } => {
                        cx.ctx.record_semantic_call();
                        let request = AnalyzerRequest::new(
                            question.clone(),
                            text.clone(),
                            AnswerSchema::YesNo,
                        );
                        match cx.analyzer.ask(request).await {
                            Ok(answer) => {
                                if answer.value.as_bool() == Some(true) {
                                    outcome.violations.push(
                                        Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                            .location(Location::slide(slide.slide_number))
                                            .detection_method(DetectionMethod::Semantic)
                                            .evidence(slide.title.clone())
                                            .explanation(if rule.description.is_empty() {
                                                question.clone()
                                            } else {
                                                rule.description.clone()
                                            })
                                            .suggested_fix(rule.suggested_fix.clone())
                                            .confidence(answer.confidence)
                                            .build(),
                                    );
                                }
                            }
                            Err(e) => {
                                outcome.violations.push(manual_review_violation(
                                    &rule.rule_id,
                                    self.id(),
                                    Location::slide(slide.slide_number),
                                    &e.to_string(),
                                ));
                            }
                        }
                    }

                    RuleValidation::Presence { .. } | RuleValidation::ExternalReference { .. } => {}
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{ScriptedAnalyzer, StructuredAnswer};
    use crate::classifier::EntityClassifier;
    use crate::document::model::Document;
    use crate::reference::{ReferenceStore, Rule, RuleSet};
    use crate::violation::Severity;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn rules() -> RuleSet {
        RuleSet {
            category: "performance".to_string(),
            rules: vec![
                Rule {
                    rule_id: "PERF-002".to_string(),
                    severity: Severity::Major,
                    validation: RuleValidation::Format {
                        field: String::new(),
                        section: "body".to_string(),
                        pattern: r"(?i)benchmark|index".to_string(),
                    },
                    keywords: vec![],
                    applies_if: None,
                    description: "Fund performance must be shown against its benchmark".to_string(),
                    suggested_fix: String::new(),
                },
                Rule {
                    rule_id: "PERF-003".to_string(),
                    severity: Severity::Critical,
                    validation: RuleValidation::Format {
                        field: String::new(),
                        section: "body".to_string(),
                        pattern: r"(?i)past performance".to_string(),
                    },
                    keywords: vec![],
                    applies_if: None,
                    description: "Fund performance requires the past-performance warning nearby"
                        .to_string(),
                    suggested_fix: String::new(),
                },
                Rule {
                    rule_id: "PERF-001".to_string(),
                    severity: Severity::Critical,
                    validation: RuleValidation::Semantic {
                        question: "Does this slide show fund performance for a track record \
                                   shorter than one full year?"
                            .to_string(),
                    },
                    keywords: vec![],
                    applies_if: None,
                    description: String::new(),
                    suggested_fix: String::new(),
                },
            ],
        }
    }

    fn document(lines: Vec<&str>) -> Document {
        Document {
            body_slides: vec![Slide {
                slide_number: 1,
                text: lines.into_iter().map(String::from).collect(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    async fn run_check(
        document: &Document,
        analyzer: Arc<ScriptedAnalyzer>,
    ) -> (ModuleOutcome, DocumentContext) {
        let store = ReferenceStore::from_parts(
            HashMap::from([(ModuleId::Performance, rules())]),
            None,
            None,
            None,
        );
        let ctx = DocumentContext::build(document, None).unwrap();
        let classifier =
            EntityClassifier::new(analyzer.clone() as Arc<dyn SemanticAnalyzer>);
        let options = super::super::CheckOptions::default();
        let outcome = {
            let cx = CheckContext {
                document,
                ctx: &ctx,
                references: &store,
                classifier: &classifier,
                analyzer: analyzer.as_ref(),
                options: &options,
            };
            PerformanceCheck.run(&cx).await.unwrap()
        };
        (outcome, ctx)
    }

    #[tokio::test]
    async fn test_run_marketCommentary_shouldRecordSubjectAndStaySilent() {
        let doc = document(vec!["The US market has historically been attractive."]);
        let analyzer = Arc::new(
            ScriptedAnalyzer::new()
                .on_question("about the fund itself", StructuredAnswer::text("market", 92)),
        );

        let (outcome, ctx) = run_check(&doc, analyzer).await;
        assert!(outcome.violations.is_empty());
        assert_eq!(ctx.subject_cache.get(&1).unwrap().subject, SlideSubject::Market);
    }

    #[tokio::test]
    async fn test_run_fundPerformanceWithoutBenchmark_shouldFlag() {
        let doc = document(vec![
            "The fund returned 12.4% in 2024.",
            "Past performance is not a reliable indicator of future results.",
        ]);
        let analyzer = Arc::new(
            ScriptedAnalyzer::new()
                .on_question("about the fund itself", StructuredAnswer::text("fund", 95))
                .on_question("shorter than one full year", StructuredAnswer::yes_no(false, 90)),
        );

        let (outcome, _) = run_check(&doc, analyzer).await;
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].rule_id, "PERF-002");
    }

    #[tokio::test]
    async fn test_run_compliantFundSlide_shouldPass() {
        let doc = document(vec![
            "The fund returned 12.4% in 2024 versus 10.1% for its benchmark index.",
            "Past performance is not a reliable indicator of future results.",
        ]);
        let analyzer = Arc::new(
            ScriptedAnalyzer::new()
                .on_question("about the fund itself", StructuredAnswer::text("fund", 95))
                .on_question("shorter than one full year", StructuredAnswer::yes_no(false, 90)),
        );

        let (outcome, _) = run_check(&doc, analyzer).await;
        assert!(outcome.violations.is_empty());
    }

    #[tokio::test]
    async fn test_run_shortTrackRecord_shouldFlagSemanticRule() {
        let doc = document(vec![
            "Since inception (3 months ago) the fund gained 4% against its benchmark index.",
            "Past performance is not a reliable indicator of future results.",
        ]);
        let analyzer = Arc::new(
            ScriptedAnalyzer::new()
                .on_question("about the fund itself", StructuredAnswer::text("fund", 95))
                .on_question("shorter than one full year", StructuredAnswer::yes_no(true, 88)),
        );

        let (outcome, _) = run_check(&doc, analyzer).await;
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].rule_id, "PERF-001");
        assert_eq!(outcome.violations[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_run_subjectResolutionFailure_shouldBecomeManualReview() {
        let doc = document(vec!["Returns were strong."]);
        let analyzer = Arc::new(ScriptedAnalyzer::new()); // errors on every call

        let (outcome, _) = run_check(&doc, analyzer).await;
        assert_eq!(outcome.violations.len(), 1);
        assert!(outcome.violations[0].needs_manual_review);
    }

    #[tokio::test]
    async fn test_resolveSubject_repeatedCalls_shouldHitCache() {
        let doc = document(vec!["The fund returned 12.4% in 2024."]);
        let ctx = DocumentContext::build(&doc, None).unwrap();
        let analyzer = Arc::new(
            ScriptedAnalyzer::new()
                .on_question("about the fund itself", StructuredAnswer::text("fund", 95)),
        );

        for _ in 0..3 {
            let resolution =
                PerformanceCheck::resolve_subject(&ctx, analyzer.as_ref(), &doc.body_slides[0])
                    .await;
            assert_eq!(resolution.subject, SlideSubject::Fund);
        }
        assert_eq!(analyzer.call_count(), 1);
    }
}
