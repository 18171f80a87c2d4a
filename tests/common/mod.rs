/*!
 * Common test utilities for the promolint test suite
 */

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use promolint::analyzer::{ScriptedAnalyzer, StructuredAnswer};
use promolint::document::model::{ClientType, Document, DocumentMetadata, Slide};
use promolint::reference::{
    AllocationThreshold, DisclaimerGlossary, DisclaimerTemplate, FundRegistration,
    ProspectusFacts, ReferenceStore, RegistrationTable, Rule, RuleSet, RuleValidation,
};
use promolint::violation::{ModuleId, Severity};

pub const FUND_ISIN: &str = "LU0123456789";
pub const COMPANY: &str = "Acme AM";
pub const PAST_PERFORMANCE_DISCLAIMER: &str =
    "Past performance is not a reliable indicator of future results.";

/// A realistic retail fund presentation with cover, body, disclaimer and
/// closing pages.
pub fn sample_document() -> Document {
    let mut doc = Document {
        document_metadata: DocumentMetadata {
            client_type: ClientType::Retail,
            fund_isin: FUND_ISIN.to_string(),
            fund_name: "Acme Global Equity Fund".to_string(),
            esg_classification: "Article 8".to_string(),
            document_type: "presentation".to_string(),
            language: "en".to_string(),
            management_company: COMPANY.to_string(),
        },
        body_slides: vec![
            Slide {
                slide_number: 1,
                title: "Fund overview".to_string(),
                text: vec![
                    "Acme Global Equity Fund invests in developed market equities.".to_string(),
                    "Benchmark: MSCI World net total return.".to_string(),
                ],
                ..Default::default()
            },
            Slide {
                slide_number: 2,
                title: "Performance".to_string(),
                text: vec![
                    "The fund returned 12.4% in 2024 versus 10.1% for its benchmark index."
                        .to_string(),
                    PAST_PERFORMANCE_DISCLAIMER.to_string(),
                ],
                ..Default::default()
            },
            Slide {
                slide_number: 3,
                title: "Terms".to_string(),
                text: vec![
                    "Minimum investment: USD 150,000".to_string(),
                    "The fund is authorized for distribution in France, Germany and Luxembourg."
                        .to_string(),
                ],
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    doc.cover_page.content.insert(
        "promotional_document_mention".to_string(),
        serde_json::json!("Promotional document"),
    );
    doc.cover_page
        .content
        .insert("target_audience".to_string(), serde_json::json!("Retail investors"));
    doc.disclaimer_slide
        .content
        .insert("text".to_string(), serde_json::json!(PAST_PERFORMANCE_DISCLAIMER));
    doc
}

/// Rule sets for all eight modules, matching the sample document
pub fn full_rule_sets() -> HashMap<ModuleId, RuleSet> {
    let mut sets = HashMap::new();

    sets.insert(
        ModuleId::Structure,
        RuleSet {
            category: "structure".to_string(),
            rules: vec![Rule {
                rule_id: "STR-001".to_string(),
                severity: Severity::Critical,
                validation: RuleValidation::Presence {
                    field: "promotional_document_mention".to_string(),
                    section: "cover_page".to_string(),
                    label: "Promotional document".to_string(),
                },
                keywords: vec![],
                applies_if: None,
                description: "The cover must carry the promotional-document marker".to_string(),
                suggested_fix: "Add the promotional-document marker to the cover".to_string(),
            }],
        },
    );

    sets.insert(
        ModuleId::Registration,
        RuleSet {
            category: "registration".to_string(),
            rules: vec![Rule {
                rule_id: "REG-001".to_string(),
                severity: Severity::Critical,
                validation: RuleValidation::ExternalReference {
                    dataset: "registration_table".to_string(),
                },
                keywords: vec![],
                applies_if: None,
                description: String::new(),
                suggested_fix: String::new(),
            }],
        },
    );

    sets.insert(
        ModuleId::Disclaimers,
        RuleSet {
            category: "disclaimers".to_string(),
            rules: vec![Rule {
                rule_id: "DISC-001".to_string(),
                severity: Severity::Critical,
                validation: RuleValidation::ExternalReference {
                    dataset: "disclaimer_glossary".to_string(),
                },
                keywords: vec![],
                applies_if: None,
                description: String::new(),
                suggested_fix: String::new(),
            }],
        },
    );

    sets.insert(
        ModuleId::GeneralRules,
        RuleSet {
            category: "general_rules".to_string(),
            rules: vec![Rule {
                rule_id: "GEN-002".to_string(),
                severity: Severity::Critical,
                validation: RuleValidation::Absence {
                    forbidden_terms: vec!["guaranteed".to_string()],
                },
                keywords: vec![],
                applies_if: Some(promolint::reference::AppliesIf {
                    client_type: Some(ClientType::Retail),
                }),
                description: "Return guarantees may not be promised to retail clients"
                    .to_string(),
                suggested_fix: String::new(),
            }],
        },
    );

    sets.insert(
        ModuleId::Securities,
        RuleSet {
            category: "securities".to_string(),
            rules: vec![
                Rule {
                    rule_id: "SEC-001".to_string(),
                    severity: Severity::Major,
                    validation: RuleValidation::Absence { forbidden_terms: vec![] },
                    keywords: vec![],
                    applies_if: None,
                    description: String::new(),
                    suggested_fix: String::new(),
                },
                Rule {
                    rule_id: "SEC-002".to_string(),
                    severity: Severity::Critical,
                    validation: RuleValidation::Semantic {
                        question: "Does this slide recommend buying or selling a specific \
                                   security, rather than promoting the fund itself?"
                            .to_string(),
                    },
                    keywords: vec![],
                    applies_if: None,
                    description: String::new(),
                    suggested_fix: String::new(),
                },
            ],
        },
    );

    sets.insert(
        ModuleId::Esg,
        RuleSet {
            category: "esg".to_string(),
            rules: vec![Rule {
                rule_id: "ESG-001".to_string(),
                severity: Severity::Major,
                validation: RuleValidation::Semantic {
                    question: "Is this slide's content primarily about ESG or sustainability?"
                        .to_string(),
                },
                keywords: vec![],
                applies_if: None,
                description: String::new(),
                suggested_fix: String::new(),
            }],
        },
    );

    sets.insert(
        ModuleId::Performance,
        RuleSet {
            category: "performance".to_string(),
            rules: vec![Rule {
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
            }],
        },
    );

    sets.insert(
        ModuleId::ProspectusAlignment,
        RuleSet {
            category: "prospectus_alignment".to_string(),
            rules: vec![Rule {
                rule_id: "PROS-001".to_string(),
                severity: Severity::Major,
                validation: RuleValidation::ExternalReference {
                    dataset: "prospectus_facts".to_string(),
                },
                keywords: vec![],
                applies_if: None,
                description: String::new(),
                suggested_fix: String::new(),
            }],
        },
    );

    sets
}

/// Registration table authorizing the sample fund in three countries
pub fn sample_registration() -> RegistrationTable {
    RegistrationTable {
        funds: vec![FundRegistration {
            fund_isin: FUND_ISIN.to_string(),
            share_class: "A".to_string(),
            countries: BTreeMap::from([
                ("France".to_string(), "A".to_string()),
                ("Germany".to_string(), "A".to_string()),
                ("Luxembourg".to_string(), "A".to_string()),
            ]),
        }],
    }
}

/// Glossary with the English retail past-performance disclaimer
pub fn sample_glossary() -> DisclaimerGlossary {
    DisclaimerGlossary {
        templates: vec![DisclaimerTemplate {
            template_id: "past_performance".to_string(),
            language: "en".to_string(),
            client_type: ClientType::Retail,
            management_company: COMPANY.to_string(),
            text: PAST_PERFORMANCE_DISCLAIMER.to_string(),
            required: true,
        }],
    }
}

/// Prospectus facts matching the sample document
pub fn sample_prospectus() -> ProspectusFacts {
    ProspectusFacts {
        benchmark_name: Some("MSCI World".to_string()),
        benchmark_specification: Some("net total return".to_string()),
        minimum_investment: Some("USD 150,000".to_string()),
        asset_allocation_thresholds: vec![AllocationThreshold {
            label: "high yield".to_string(),
            min_pct: None,
            max_pct: Some(20.0),
        }],
        risk_list: vec!["Equity risk".to_string(), "Currency risk".to_string()],
        management_fee: Some("1.5% p.a.".to_string()),
    }
}

/// Reference store with every dataset present
pub fn full_reference_store() -> ReferenceStore {
    ReferenceStore::from_parts(
        full_rule_sets(),
        Some(sample_registration()),
        Some(sample_glossary()),
        Some(sample_prospectus()),
    )
}

/// Scripted analyzer answering every question the engine asks about the
/// sample document the "compliant" way.
pub fn compliant_analyzer() -> Arc<ScriptedAnalyzer> {
    Arc::new(
        ScriptedAnalyzer::new()
            .on_question(
                "distribution-authorization",
                StructuredAnswer::list(
                    vec!["France".to_string(), "Germany".to_string(), "Luxembourg".to_string()],
                    100,
                ),
            )
            .on_question("about the fund itself", StructuredAnswer::text("market", 92))
            .on_question("primarily about ESG", StructuredAnswer::yes_no(false, 90))
            .on_question("recommend buying", StructuredAnswer::yes_no(false, 92))
            .on_question("tradable security", StructuredAnswer::text("concept", 90))
            .on_question("elaboration or a contradiction", StructuredAnswer::text("elaboration", 90))
            .with_default(StructuredAnswer::yes_no(false, 85)),
    )
}
