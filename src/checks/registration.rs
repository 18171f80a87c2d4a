/*!
 * Registration checks.
 *
 * Verifies the document's explicit distribution-authorization statement
 * against the fund registration table. One semantic call per document - the
 * analyzer returns the list of countries named in the explicit statement,
 * excluding countries mentioned only as investment universe or domicile -
 * instead of one call per country. Both sides are normalized before the set
 * difference.
 */

use async_trait::async_trait;
use log::debug;

use crate::analyzer::{AnalyzerRequest, AnswerSchema};
use crate::errors::EngineError;
use crate::reference::{Rule, RuleValidation};
use crate::text_utils::normalize_entity_name;
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{
    CheckContext, CheckModule, ModuleOutcome, SkippedCheck, gate_rule, manual_review_violation,
    require_rules, unverifiable_rule_advisory,
};

/// The registration check module
#[derive(Debug, Default)]
pub struct RegistrationCheck;

impl RegistrationCheck {
    /// The text spans where the authorization statement lives: the fixed
    /// pages first, the body as fallback.
    fn statement_text(cx: &CheckContext<'_>) -> String {
        let fixed = [
            cx.document.cover_page.all_text(),
            cx.document.disclaimer_slide.all_text(),
            cx.document.closing_page.all_text(),
        ]
        .join("\n");
        if fixed.trim().is_empty() { cx.document.full_text() } else { fixed }
    }
}

#[async_trait]
impl CheckModule for RegistrationCheck {
    fn id(&self) -> ModuleId {
        ModuleId::Registration
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        let registration_rules: Vec<&Rule> = rules
            .rules
            .iter()
            .filter(|r| {
                matches!(&r.validation, RuleValidation::ExternalReference { dataset }
                    if dataset == "registration_table")
            })
            .collect();
        if registration_rules.is_empty() {
            return Ok(outcome);
        }

        let Some(table) = cx.references.registration.as_ref() else {
            for rule in &registration_rules {
                if gate_rule(rule, cx, &mut outcome) {
                    outcome
                        .violations
                        .push(unverifiable_rule_advisory(rule, self.id(), "registration_table"));
                }
            }
            outcome.degraded_reason = Some("registration table unavailable".to_string());
            return Ok(outcome);
        };

        let fund_isin = cx.ctx.metadata.fund_isin.trim().to_string();
        if fund_isin.is_empty() {
            for rule in &registration_rules {
                outcome.skipped.push(SkippedCheck {
                    rule_id: rule.rule_id.clone(),
                    reason: "skipped_insufficient_metadata".to_string(),
                });
            }
            return Ok(outcome);
        }

        // One call per document, not per country
        let request = AnalyzerRequest::new(
            "List the countries named in this document's explicit distribution-authorization \
             statement (where the fund is said to be registered or authorized for sale). \
             Exclude countries mentioned only as investment universe, index composition, \
             or fund domicile.",
            Self::statement_text(cx),
            AnswerSchema::List,
        );
        cx.ctx.record_semantic_call();
        let answer = match cx.analyzer.ask(request).await {
            Ok(answer) => answer,
            Err(e) => {
                for rule in &registration_rules {
                    if gate_rule(rule, cx, &mut outcome) {
                        outcome.violations.push(manual_review_violation(
                            &rule.rule_id,
                            self.id(),
                            Location::document(),
                            &e.to_string(),
                        ));
                    }
                }
                return Ok(outcome);
            }
        };

        let declared: Vec<String> =
            answer.value.as_list().map(<[String]>::to_vec).unwrap_or_default();
        debug!("Authorization statement names {} countries", declared.len());

        for rule in registration_rules {
            if !gate_rule(rule, cx, &mut outcome) {
                continue;
            }
            for country in &declared {
                let normalized = normalize_entity_name(country);
                if normalized.is_empty() {
                    continue;
                }
                if !table.is_country_authorized(&fund_isin, country) {
                    outcome.violations.push(
                        Violation::builder(&rule.rule_id, self.id(), rule.severity)
                            .location(Location::document())
                            .detection_method(DetectionMethod::CrossReference)
                            .evidence(country.clone())
                            .explanation(format!(
                                "The document claims distribution authorization in '{}', but the \
                                 registration table has no authorization for fund {}",
                                country, fund_isin
                            ))
                            .suggested_fix(format!(
                                "Remove '{}' from the distribution statement or register the fund there",
                                country
                            ))
                            .confidence(answer.confidence)
                            .build(),
                    );
                }
            }
        }

        Ok(outcome)
    }
}
