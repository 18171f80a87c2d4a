/*!
 * Disclaimer checks.
 *
 * Fuzzy-matches the required disclaimer templates - selected from the
 * glossary by (language, client type, management company) - against the
 * document's disclaimer content. At or above the similarity threshold the
 * disclaimer counts as present; a non-trivial partial match is "present but
 * incomplete"; no match at all is "missing". A missing glossary entry is
 * reported as unavailable reference data, never as a missing disclaimer.
 */

use async_trait::async_trait;

use crate::document::model::ClientType;
use crate::errors::EngineError;
use crate::reference::{DisclaimerTemplate, Rule, RuleValidation};
use crate::text_utils::similarity;
use crate::violation::{DetectionMethod, Location, ModuleId, Severity, Violation};

use super::{
    CheckContext, CheckModule, ModuleOutcome, SkippedCheck, gate_rule, require_rules,
    unverifiable_rule_advisory,
};

/// The disclaimers check module
#[derive(Debug, Default)]
pub struct DisclaimersCheck;

/// How well a template is covered by the document
#[derive(Debug, Clone, Copy, PartialEq)]
enum MatchLevel {
    Present,
    Incomplete(f32),
    Missing(f32),
}

impl DisclaimersCheck {
    /// Best similarity between the template and any block of the disclaimer
    /// content (whole text, then paragraph by paragraph).
    fn best_similarity(template: &DisclaimerTemplate, disclaimer_text: &str) -> f32 {
        let mut best = similarity(&template.text, disclaimer_text);
        for block in disclaimer_text.split("\n\n") {
            best = best.max(similarity(&template.text, block));
        }
        for line in disclaimer_text.lines() {
            best = best.max(similarity(&template.text, line));
        }
        best
    }

    fn match_level(cx: &CheckContext<'_>, score: f32) -> MatchLevel {
        if score >= cx.options.disclaimer_similarity {
            MatchLevel::Present
        } else if score >= cx.options.partial_similarity {
            MatchLevel::Incomplete(score)
        } else {
            MatchLevel::Missing(score)
        }
    }
}

#[async_trait]
impl CheckModule for DisclaimersCheck {
    fn id(&self) -> ModuleId {
        ModuleId::Disclaimers
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        let glossary_rules: Vec<&Rule> = rules
            .rules
            .iter()
            .filter(|r| {
                matches!(&r.validation, RuleValidation::ExternalReference { dataset }
                    if dataset == "disclaimer_glossary")
            })
            .collect();
        if glossary_rules.is_empty() {
            return Ok(outcome);
        }

        let Some(glossary) = cx.references.disclaimers.as_ref() else {
            for rule in &glossary_rules {
                if gate_rule(rule, cx, &mut outcome) {
                    outcome
                        .violations
                        .push(unverifiable_rule_advisory(rule, self.id(), "disclaimer_glossary"));
                }
            }
            outcome.degraded_reason = Some("disclaimer glossary unavailable".to_string());
            return Ok(outcome);
        };

        let metadata = &cx.ctx.metadata;
        if metadata.client_type == ClientType::Unknown {
            for rule in &glossary_rules {
                outcome.skipped.push(SkippedCheck {
                    rule_id: rule.rule_id.clone(),
                    reason: "skipped_insufficient_metadata".to_string(),
                });
            }
            return Ok(outcome);
        }

        let templates = glossary.lookup(
            &metadata.language,
            metadata.client_type,
            &metadata.management_company,
        );

        let disclaimer_text = [
            cx.document.disclaimer_slide.all_text(),
            cx.document.closing_page.all_text(),
        ]
        .join("\n\n");

        for rule in glossary_rules {
            if !gate_rule(rule, cx, &mut outcome) {
                continue;
            }

            if templates.is_empty() {
                // Scenario: no glossary entry for this key - advisory, not a
                // false "missing disclaimer" critical
                outcome.violations.push(
                    Violation::builder(&rule.rule_id, self.id(), Severity::Warning)
                        .location(Location::section(0, "disclaimer_slide"))
                        .detection_method(DetectionMethod::CrossReference)
                        .explanation(format!(
                            "No disclaimer template for (language={}, client_type={}, company={}) \
                             - disclaimer completeness not verified",
                            metadata.language, metadata.client_type, metadata.management_company
                        ))
                        .suggested_fix("Add the missing glossary entry and re-run".to_string())
                        .confidence(100)
                        .needs_manual_review(true)
                        .build(),
                );
                continue;
            }

            for template in &templates {
                if !template.required {
                    continue;
                }
                let score = Self::best_similarity(template, &disclaimer_text);
                match Self::match_level(cx, score) {
                    MatchLevel::Present => {}
                    MatchLevel::Incomplete(score) => {
                        outcome.violations.push(
                            Violation::builder(&rule.rule_id, self.id(), Severity::Major)
                                .location(Location::section(0, "disclaimer_slide"))
                                .detection_method(DetectionMethod::CrossReference)
                                .evidence(template.text.clone())
                                .explanation(format!(
                                    "Disclaimer '{}' is present but incomplete ({:.0}% similar \
                                     to the canonical text)",
                                    template.template_id,
                                    score * 100.0
                                ))
                                .suggested_fix(
                                    "Replace the partial text with the canonical disclaimer"
                                        .to_string(),
                                )
                                .confidence((score * 100.0) as u8)
                                .build(),
                        );
                    }
                    MatchLevel::Missing(_) => {
                        outcome.violations.push(
                            Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                .location(Location::section(0, "disclaimer_slide"))
                                .detection_method(DetectionMethod::CrossReference)
                                .evidence(template.text.clone())
                                .explanation(format!(
                                    "Required disclaimer '{}' is missing",
                                    template.template_id
                                ))
                                .suggested_fix(
                                    "Add the canonical disclaimer text to the disclaimer slide"
                                        .to_string(),
                                )
                                .confidence(95)
                                .build(),
                        );
                    }
                }
            }
        }

        Ok(outcome)
    }
}
