/*!
 * ESG checks.
 *
 * Measures how much of the document is ESG-related content - one semantic
 * classification per slide, weighted by slide character count - and compares
 * the fraction against thresholds that depend on the fund's declared ESG
 * classification tier. A fund without an ESG mandate must not lead with ESG
 * content; an Article 9 fund is expected to talk about its objective.
 */

use async_trait::async_trait;
use log::debug;

use crate::analyzer::{AnalyzerRequest, AnswerSchema};
use crate::document::model::EsgTier;
use crate::errors::EngineError;
use crate::reference::RuleValidation;
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{CheckContext, CheckModule, ModuleOutcome, gate_rule, manual_review_violation, require_rules};

/// The ESG check module
#[derive(Debug, Default)]
pub struct EsgCheck;

impl EsgCheck {
    /// Fraction of document characters sitting on ESG-classified slides.
    ///
    /// Returns the fraction and the number of slides whose classification
    /// failed (those count as non-ESG).
    async fn esg_fraction(cx: &CheckContext<'_>, question: &str) -> (f64, usize) {
        let mut esg_chars = 0usize;
        let mut total_chars = 0usize;
        let mut failures = 0usize;

        for slide in &cx.document.body_slides {
            let text = slide.all_text();
            let chars = text.chars().count();
            if chars == 0 {
                continue;
            }
            total_chars += chars;

            cx.ctx.record_semantic_call();
            let request = AnalyzerRequest::new(question.to_string(), text, AnswerSchema::YesNo);
            match cx.analyzer.ask(request).await {
                Ok(answer) if answer.value.as_bool() == Some(true) => esg_chars += chars,
                Ok(_) => {}
                Err(_) => failures += 1,
            }
        }

        let fraction = if total_chars > 0 {
            esg_chars as f64 / total_chars as f64
        } else {
            0.0
        };
        (fraction, failures)
    }
}

#[async_trait]
impl CheckModule for EsgCheck {
    fn id(&self) -> ModuleId {
        ModuleId::Esg
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        let Some(rule) = rules
            .rules
            .iter()
            .find(|r| matches!(r.validation, RuleValidation::Semantic { .. }))
        else {
            return Ok(outcome);
        };
        if !gate_rule(rule, cx, &mut outcome) {
            return Ok(outcome);
        }
        let RuleValidation::Semantic { question } = &rule.validation else {
            unreachable!("filtered to semantic rules above");
        };

        let (fraction, failures) = Self::esg_fraction(cx, question).await;
        let tier = cx.ctx.metadata.esg_tier();
        debug!("ESG content fraction {:.2} for tier {:?}", fraction, tier);

        if failures > 0 {
            outcome.violations.push(manual_review_violation(
                &rule.rule_id,
                self.id(),
                Location::document(),
                &format!("{} slide classification(s) unavailable", failures),
            ));
        }

        match tier {
            EsgTier::Article6 | EsgTier::Undeclared => {
                if fraction > cx.options.esg_fraction_article6 {
                    outcome.violations.push(
                        Violation::builder(&rule.rule_id, self.id(), rule.severity)
                            .location(Location::document())
                            .detection_method(DetectionMethod::Semantic)
                            .evidence(format!("{:.0}% of content is ESG-related", fraction * 100.0))
                            .explanation(format!(
                                "The fund declares no ESG mandate (tier {:?}) but {:.0}% of the \
                                 document is ESG content (limit {:.0}%)",
                                tier,
                                fraction * 100.0,
                                cx.options.esg_fraction_article6 * 100.0
                            ))
                            .suggested_fix(
                                "Reduce ESG prominence or align the fund's ESG classification"
                                    .to_string(),
                            )
                            .confidence(85)
                            .build(),
                    );
                }
            }
            EsgTier::Article9 => {
                if fraction < cx.options.esg_fraction_article9 {
                    outcome.violations.push(
                        Violation::builder(&rule.rule_id, self.id(), rule.severity)
                            .location(Location::document())
                            .detection_method(DetectionMethod::Semantic)
                            .evidence(format!("{:.0}% of content is ESG-related", fraction * 100.0))
                            .explanation(format!(
                                "An Article 9 fund is expected to present its sustainable \
                                 objective, but only {:.0}% of the document is ESG content",
                                fraction * 100.0
                            ))
                            .suggested_fix(
                                "Present the fund's sustainable investment objective".to_string(),
                            )
                            .confidence(80)
                            .build(),
                    );
                }
            }
            EsgTier::Article8 => {}
        }

        Ok(outcome)
    }
}
