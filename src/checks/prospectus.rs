/*!
 * Prospectus-alignment checks.
 *
 * Marketing material is expected to add detail to the prospectus; only a
 * genuine factual contradiction is a violation. Deterministic comparison
 * handles the clear cases (an exactly matching value, a number outside a
 * stated bound); everything in between goes to the analyzer as an
 * "elaboration or contradiction" judgment, one call per compared fact.
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyzer::{AnalyzerRequest, AnswerSchema};
use crate::errors::EngineError;
use crate::reference::{ProspectusFacts, Rule, RuleValidation};
use crate::text_utils::normalize_entity_name;
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{
    CheckContext, CheckModule, ModuleOutcome, gate_rule, manual_review_violation, require_rules,
    unverifiable_rule_advisory,
};

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*%").unwrap());

/// The prospectus-alignment check module
#[derive(Debug, Default)]
pub struct ProspectusAlignmentCheck;

/// A fact statement found in the document
#[derive(Debug, Clone)]
struct FoundStatement {
    slide_number: u32,
    line: String,
    value: String,
}

impl ProspectusAlignmentCheck {
    /// Find the first line in the body mentioning one of the labels, and the
    /// value that follows it (after a colon, or the rest of the line).
    fn find_labeled_value(cx: &CheckContext<'_>, labels: &[&str]) -> Option<FoundStatement> {
        for slide in &cx.document.body_slides {
            for line in slide.all_text().lines() {
                let lowered = line.to_lowercase();
                for label in labels {
                    let Some(pos) = lowered.find(label) else {
                        continue;
                    };
                    let after = &line[pos + label.len()..];
                    let value = after.trim_start_matches([':', ' ', '\t']).trim().to_string();
                    return Some(FoundStatement {
                        slide_number: slide.slide_number,
                        line: line.trim().to_string(),
                        value: if value.is_empty() { line.trim().to_string() } else { value },
                    });
                }
            }
        }
        None
    }

    /// Ask the analyzer whether the document statement elaborates on or
    /// contradicts the prospectus fact.
    async fn is_contradiction(
        cx: &CheckContext<'_>,
        fact_name: &str,
        prospectus_value: &str,
        document_value: &str,
    ) -> Result<(bool, u8), crate::errors::AnalyzerError> {
        cx.ctx.record_semantic_call();
        let request = AnalyzerRequest::new(
            format!(
                "The prospectus states the {} as '{}'. The marketing document states '{}'. \
                 Marketing material may add detail to the prospectus. Is the document's \
                 statement an elaboration or a contradiction?",
                fact_name, prospectus_value, document_value
            ),
            String::new(),
            AnswerSchema::Choice {
                options: vec!["elaboration".to_string(), "contradiction".to_string()],
            },
        );
        let answer = cx.analyzer.ask(request).await?;
        Ok((answer.value.as_text() == Some("contradiction"), answer.confidence))
    }

    fn contradiction_violation(
        rule: &Rule,
        fact_name: &str,
        prospectus_value: &str,
        statement: &FoundStatement,
        confidence: u8,
    ) -> Violation {
        Violation::builder(&rule.rule_id, ModuleId::ProspectusAlignment, rule.severity)
            .location(Location::slide(statement.slide_number))
            .detection_method(DetectionMethod::CrossReference)
            .evidence(format!(
                "prospectus: '{}' / document: '{}'",
                prospectus_value, statement.value
            ))
            .explanation(format!(
                "The document's {} contradicts the prospectus",
                fact_name
            ))
            .suggested_fix(format!(
                "Align the {} with the prospectus value '{}'",
                fact_name, prospectus_value
            ))
            .confidence(confidence)
            .build()
    }

    async fn check_minimum_investment(
        &self,
        cx: &CheckContext<'_>,
        rule: &Rule,
        facts: &ProspectusFacts,
        outcome: &mut ModuleOutcome,
    ) {
        let Some(prospectus_value) = facts.minimum_investment.as_deref() else {
            return;
        };
        let Some(statement) = Self::find_labeled_value(
            cx,
            &["minimum investment", "minimum subscription", "min. investment"],
        ) else {
            return;
        };

        // Exact or normalized equality is always an elaboration
        if normalize_entity_name(&statement.value) == normalize_entity_name(prospectus_value) {
            return;
        }

        match Self::is_contradiction(cx, "minimum investment", prospectus_value, &statement.value)
            .await
        {
            Ok((true, confidence)) => {
                outcome.violations.push(Self::contradiction_violation(
                    rule,
                    "minimum investment",
                    prospectus_value,
                    &statement,
                    confidence,
                ));
            }
            Ok((false, _)) => {}
            Err(e) => {
                outcome.violations.push(manual_review_violation(
                    &rule.rule_id,
                    ModuleId::ProspectusAlignment,
                    Location::slide(statement.slide_number),
                    &e.to_string(),
                ));
            }
        }
    }

    async fn check_benchmark(
        &self,
        cx: &CheckContext<'_>,
        rule: &Rule,
        facts: &ProspectusFacts,
        outcome: &mut ModuleOutcome,
    ) {
        let Some(benchmark_name) = facts.benchmark_name.as_deref() else {
            return;
        };
        let Some(statement) =
            Self::find_labeled_value(cx, &["benchmark", "reference index", "reference indicator"])
        else {
            return;
        };

        // The prospectus benchmark appearing verbatim in the statement is
        // consistent regardless of added specification detail
        let normalized_line = normalize_entity_name(&statement.line);
        if normalized_line.contains(&normalize_entity_name(benchmark_name)) {
            return;
        }

        let prospectus_value = match facts.benchmark_specification.as_deref() {
            Some(spec) => format!("{} ({})", benchmark_name, spec),
            None => benchmark_name.to_string(),
        };
        match Self::is_contradiction(cx, "benchmark", &prospectus_value, &statement.value).await {
            Ok((true, confidence)) => {
                outcome.violations.push(Self::contradiction_violation(
                    rule,
                    "benchmark",
                    &prospectus_value,
                    &statement,
                    confidence,
                ));
            }
            Ok((false, _)) => {}
            Err(e) => {
                outcome.violations.push(manual_review_violation(
                    &rule.rule_id,
                    ModuleId::ProspectusAlignment,
                    Location::slide(statement.slide_number),
                    &e.to_string(),
                ));
            }
        }
    }

    /// Numeric bounds are checked deterministically: a stated percentage
    /// outside the prospectus bound is a contradiction, no judgment needed.
    fn check_allocation_thresholds(
        &self,
        cx: &CheckContext<'_>,
        rule: &Rule,
        facts: &ProspectusFacts,
        outcome: &mut ModuleOutcome,
    ) {
        for threshold in &facts.asset_allocation_thresholds {
            let label = threshold.label.to_lowercase();
            for slide in &cx.document.body_slides {
                for line in slide.all_text().lines() {
                    if !line.to_lowercase().contains(&label) {
                        continue;
                    }
                    for capture in PERCENT.captures_iter(line) {
                        let Ok(value) = capture[1].replace(',', ".").parse::<f64>() else {
                            continue;
                        };
                        let below = threshold.min_pct.is_some_and(|min| value < min);
                        let above = threshold.max_pct.is_some_and(|max| value > max);
                        if below || above {
                            let statement = FoundStatement {
                                slide_number: slide.slide_number,
                                line: line.trim().to_string(),
                                value: format!("{}%", &capture[1]),
                            };
                            let bound = format!(
                                "{} between {}% and {}%",
                                threshold.label,
                                threshold.min_pct.map_or("-".to_string(), |v| v.to_string()),
                                threshold.max_pct.map_or("-".to_string(), |v| v.to_string()),
                            );
                            outcome.violations.push(Self::contradiction_violation(
                                rule,
                                "asset allocation",
                                &bound,
                                &statement,
                                100,
                            ));
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl CheckModule for ProspectusAlignmentCheck {
    fn id(&self) -> ModuleId {
        ModuleId::ProspectusAlignment
    }

    async fn run(&self, cx: &CheckContext<'_>) -> Result<ModuleOutcome, EngineError> {
        let rules = match require_rules(cx, self.id()) {
            Ok(rules) => rules,
            Err(outcome) => return Ok(*outcome),
        };

        let mut outcome = ModuleOutcome::default();

        let alignment_rules: Vec<&Rule> = rules
            .rules
            .iter()
            .filter(|r| {
                matches!(&r.validation, RuleValidation::ExternalReference { dataset }
                    if dataset == "prospectus_facts")
            })
            .collect();
        if alignment_rules.is_empty() {
            return Ok(outcome);
        }

        let Some(facts) = cx.references.prospectus.as_ref() else {
            for rule in &alignment_rules {
                if gate_rule(rule, cx, &mut outcome) {
                    outcome
                        .violations
                        .push(unverifiable_rule_advisory(rule, self.id(), "prospectus_facts"));
                }
            }
            outcome.degraded_reason = Some("prospectus facts unavailable".to_string());
            return Ok(outcome);
        };

        for rule in alignment_rules {
            if !gate_rule(rule, cx, &mut outcome) {
                continue;
            }
            self.check_minimum_investment(cx, rule, facts, &mut outcome).await;
            self.check_benchmark(cx, rule, facts, &mut outcome).await;
            self.check_allocation_thresholds(cx, rule, facts, &mut outcome);
        }

        Ok(outcome)
    }
}
