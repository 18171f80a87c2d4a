/*!
 * General rules checks.
 *
 * A flat set of independent rules with no shared state beyond the classifier
 * cache: forbidden-term scans (internal limits, ETF-liquidity claims, ...),
 * per-slide format requirements scoped by keywords (source-and-date
 * citations), and document-level semantic judgments (attenuation of opinion
 * language, anglicism glossary requirement). Each rule is evaluated on its
 * own; one failing rule never affects another.
 */

use async_trait::async_trait;
use regex::Regex;

use crate::analyzer::{AnalyzerRequest, AnswerSchema};
use crate::errors::EngineError;
use crate::reference::RuleValidation;
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{CheckContext, CheckModule, ModuleOutcome, gate_rule, manual_review_violation, require_rules};

/// The general rules check module
#[derive(Debug, Default)]
pub struct GeneralRulesCheck;

impl GeneralRulesCheck {
    /// First line of `text` containing `term`, case-insensitive
    fn find_line<'t>(text: &'t str, term: &str) -> Option<&'t str> {
        let term_lower = term.to_lowercase();
        text.lines().find(|line| line.to_lowercase().contains(&term_lower))
    }

    fn slide_matches_keywords(slide_text: &str, keywords: &[String]) -> bool {
        if keywords.is_empty() {
            return true;
        }
        let lowered = slide_text.to_lowercase();
        keywords.iter().any(|k| lowered.contains(&k.to_lowercase()))
    }
}

#[async_trait]
impl CheckModule for GeneralRulesCheck {
    fn id(&self) -> ModuleId {
        ModuleId::GeneralRules
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        for rule in &rules.rules {
            if !gate_rule(rule, cx, &mut outcome) {
                continue;
            }

            match &rule.validation {
                RuleValidation::Absence { forbidden_terms } => {
                    for slide in &cx.document.body_slides {
                        let text = slide.all_text();
                        for term in forbidden_terms {
                            let Some(line) = Self::find_line(&text, term) else {
                                continue;
                            };
                            outcome.violations.push(
                                Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                    .location(Location::slide(slide.slide_number))
                                    .detection_method(DetectionMethod::KeywordMatch)
                                    .evidence(line.trim().to_string())
                                    .explanation(if rule.description.is_empty() {
                                        format!("Forbidden term '{}' appears on the slide", term)
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

                RuleValidation::Format { pattern, .. } => {
                    let Ok(regex) = Regex::new(pattern) else {
                        continue;
                    };
                    // Each slide in scope (per keywords) must match the pattern
                    for slide in &cx.document.body_slides {
                        let text = slide.all_text();
                        if !Self::slide_matches_keywords(&text, &rule.keywords) {
                            continue;
                        }
                        if !regex.is_match(&text) {
                            outcome.violations.push(
                                Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                    .location(Location::slide(slide.slide_number))
                                    .detection_method(DetectionMethod::KeywordMatch)
                                    .evidence(slide.title.clone())
                                    .explanation(if rule.description.is_empty() {
                                        "Slide lacks the required citation format".to_string()
                                    } else {
                                        rule.description.clone()
                                    })
                                    .suggested_fix(rule.suggested_fix.clone())
                                    .confidence(90)
                                    .build(),
                            );
                        }
                    }
                }

                RuleValidation::Semantic { question } => {
                    // Keyword pre-filter keeps the call count bounded
                    let full_text = cx.document.full_text();
                    if !Self::slide_matches_keywords(&full_text, &rule.keywords) {
                        continue;
                    }
                    cx.ctx.record_semantic_call();
                    let request = AnalyzerRequest::new(
                        question.clone(),
                        full_text,
                        AnswerSchema::YesNo,
                    );
                    match cx.analyzer.ask(request).await {
                        Ok(answer) => {
                            if answer.value.as_bool() == Some(true) {
                                outcome.violations.push(
                                    Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                        .location(Location::document())
                                        .detection_method(DetectionMethod::Semantic)
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
                                Location::document(),
                                &e.to_string(),
                            ));
                        }
                    }
                }

                // Presence and external-reference rules belong to other modules
                RuleValidation::Presence { .. } | RuleValidation::ExternalReference { .. } => {}
            }
        }

        Ok(outcome)
    }
}
