/*!
 * Structure checks.
 *
 * Field-presence and format checks against the fixed pages of the document
 * (cover page, disclaimer slide, closing page): promotional-document marker,
 * target-audience marker, full risk list, and whatever else the rule file
 * requires. Pure presence/absence logic, no semantic calls.
 */

use async_trait::async_trait;
use regex::Regex;

use crate::document::model::PageContent;
use crate::errors::EngineError;
use crate::reference::RuleValidation;
use crate::violation::{DetectionMethod, Location, ModuleId, Violation};

use super::{CheckContext, CheckModule, ModuleOutcome, gate_rule, require_rules};

/// The structure check module
#[derive(Debug, Default)]
pub struct StructureCheck;

impl StructureCheck {
    fn page<'a>(cx: &'a CheckContext<'_>, section: &str) -> Option<&'a PageContent> {
        match section {
            "cover_page" => Some(&cx.document.cover_page),
            "disclaimer_slide" => Some(&cx.document.disclaimer_slide),
            "closing_page" => Some(&cx.document.closing_page),
            _ => None,
        }
    }
}

#[async_trait]
impl CheckModule for StructureCheck {
    fn id(&self) -> ModuleId {
        ModuleId::Structure
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
                RuleValidation::Presence { field, section, label } => {
                    let Some(page) = Self::page(cx, section) else {
                        continue;
                    };
                    let label = if label.is_empty() { field } else { label };
                    match cx.document.resolve_field(page, field, label) {
                        Some(_) => {}
                        None => {
                            outcome.violations.push(
                                Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                    .location(Location::section(0, section))
                                    .detection_method(DetectionMethod::FieldCheck)
                                    .evidence(format!("field '{}' is empty or absent", field))
                                    .explanation(if rule.description.is_empty() {
                                        format!(
                                            "Required field '{}' on {} is missing",
                                            field, section
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

                RuleValidation::Format { field, section, pattern } => {
                    let Some(page) = Self::page(cx, section) else {
                        continue;
                    };
                    let Some((value, confidence)) = cx.document.resolve_field(page, field, field)
                    else {
                        // Presence is a separate rule's concern
                        continue;
                    };
                    let Ok(regex) = Regex::new(pattern) else {
                        continue;
                    };
                    if !regex.is_match(&value) {
                        outcome.violations.push(
                            Violation::builder(&rule.rule_id, self.id(), rule.severity)
                                .location(Location::section(0, section))
                                .detection_method(DetectionMethod::FieldCheck)
                                .evidence(value)
                                .explanation(format!(
                                    "Field '{}' does not match the required format",
                                    field
                                ))
                                .suggested_fix(rule.suggested_fix.clone())
                                .confidence(confidence)
                                .build(),
                        );
                    }
                }

                // Other validation kinds are not structure concerns
                RuleValidation::Absence { .. }
                | RuleValidation::ExternalReference { .. }
                | RuleValidation::Semantic { .. } => {}
            }
        }

        Ok(outcome)
    }
}
