/*!
 * Securities/values checks.
 *
 * Two concerns: repeated mentions of the same security (a marketing document
 * may name a holding, not dwell on it) and investment-advice language. A
 * mention only counts once classified as a security by the entity
 * classifier, so service providers and concepts never trip the repetition
 * rule. Advice detection asks one semantic question per slide, phrased to
 * distinguish fund self-promotion (allowed) from stock-level recommendation
 * (prohibited).
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::analyzer::{AnalyzerRequest, AnswerSchema};
use crate::errors::EngineError;
use crate::reference::{Rule, RuleValidation};
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{CheckContext, CheckModule, ModuleOutcome, gate_rule, manual_review_violation, require_rules};

/// Capitalized word sequences, the candidate entity mentions
static TERM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Za-z0-9&'.-]+(?:\s+[A-Z][A-Za-z0-9&'.-]+){0,2})\b").unwrap());

/// The securities check module
#[derive(Debug, Default)]
pub struct SecuritiesCheck;

/// Occurrences of one candidate term
struct TermMentions {
    /// Original surface form of the first occurrence
    surface: String,
    /// Slide of the first occurrence
    first_slide: u32,
    /// Line of the first occurrence
    first_line: String,
    /// Total occurrence count
    count: usize,
}

impl SecuritiesCheck {
    /// Collect candidate terms and their mention counts across body slides
    fn collect_mentions(cx: &CheckContext<'_>) -> Vec<(String, TermMentions)> {
        let mut mentions: HashMap<String, TermMentions> = HashMap::new();

        for slide in &cx.document.body_slides {
            for line in slide.all_text().lines() {
                for capture in TERM_PATTERN.captures_iter(line) {
                    let surface = capture[1].trim().to_string();
                    let normalized = crate::text_utils::normalize_term(&surface);
                    if normalized.len() < 3 {
                        continue;
                    }
                    mentions
                        .entry(normalized)
                        .and_modify(|m| m.count += 1)
                        .or_insert_with(|| TermMentions {
                            surface,
                            first_slide: slide.slide_number,
                            first_line: line.trim().to_string(),
                            count: 1,
                        });
                }
            }
        }

        let mut sorted: Vec<(String, TermMentions)> = mentions.into_iter().collect();
        sorted.sort_by(|(_, a), (_, b)| {
            a.first_slide.cmp(&b.first_slide).then_with(|| a.surface.cmp(&b.surface))
        });
        sorted
    }

    fn repetition_rule(rules: &[Rule]) -> Option<&Rule> {
        rules.iter().find(|r| matches!(r.validation, RuleValidation::Absence { .. }))
    }

    fn advice_rule(rules: &[Rule]) -> Option<&Rule> {
        rules.iter().find(|r| matches!(r.validation, RuleValidation::Semantic { .. }))
    }
}

#[async_trait]
impl CheckModule for SecuritiesCheck {
    fn id(&self) -> ModuleId {
        ModuleId::Securities
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        // Repeated security mentions
        if let Some(rule) = Self::repetition_rule(&rules.rules) {
            if gate_rule(rule, cx, &mut outcome) {
                for (_, mention) in Self::collect_mentions(cx) {
                    if mention.count <= cx.options.repetition_threshold {
                        continue;
                    }
                    let classification =
                        cx.classifier.classify(cx.ctx, &mention.surface, &mention.first_line).await;
                    if !classification.is_security {
                        continue;
                    }
                    outcome.violations.push(
                        Violation::builder(&rule.rule_id, self.id(), rule.severity)
                            .location(Location::slide(mention.first_slide))
                            .detection_method(DetectionMethod::Semantic)
                            .evidence(mention.first_line.clone())
                            .explanation(format!(
                                "'{}' is mentioned {} times (threshold {}), giving the security \
                                 undue prominence",
                                mention.surface, mention.count, cx.options.repetition_threshold
                            ))
                            .suggested_fix(format!(
                                "Reduce the number of references to '{}'",
                                mention.surface
                            ))
                            .confidence(classification.confidence)
                            .needs_manual_review(classification.confidence < 50)
                            .build(),
                    );
                }
            }
        }

        // Investment-advice language, one question per slide
        if let Some(rule) = Self::advice_rule(&rules.rules) {
            if gate_rule(rule, cx, &mut outcome) {
                let RuleValidation::Semantic { question } = &rule.validation else {
                    unreachable!("advice_rule only returns semantic rules");
                };
                for slide in &cx.document.body_slides {
                    let text = slide.all_text();
                    if text.trim().is_empty() {
                        continue;
                    }
                    cx.ctx.record_semantic_call();
                    let request =
                        AnalyzerRequest::new(question.clone(), text, AnswerSchema::YesNo);
                    match cx.analyzer.ask(request).await {
                        Ok(answer) => {
                            if answer.value.as_bool() == Some(true) {
                                outcome.violations.push(
                                    Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                        .location(Location::slide(slide.slide_number))
                                        .detection_method(DetectionMethod::Semantic)
                                        .evidence(slide.title.clone())
                                        .explanation(
                                            "The slide reads as a stock-level investment \
                                             recommendation rather than fund promotion"
                                                .to_string(),
                                        )
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
            }
        }

        Ok(outcome)
    }
}
