/*!
 * Tests for reference data loading and degradation behavior
 */

use std::fs;
use tempfile::tempdir;

use promolint::reference::{ReferenceStore, RuleValidation};
use promolint::violation::ModuleId;

fn write(dir: &std::path::Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_load_fullDirectories_shouldLoadEverything() {
    let rules = tempdir().unwrap();
    let refs = tempdir().unwrap();

    for module in ModuleId::all() {
        write(
            rules.path(),
            &format!("{}.json", module.as_str()),
            &format!(r#"{{"category": "{}", "rules": []}}"#, module.as_str()),
        );
    }
    write(
        refs.path(),
        "registration_table.json",
        r#"{"funds": [{"fund_isin": "LU0123456789", "countries": {"France": "A"}}]}"#,
    );
    write(
        refs.path(),
        "disclaimer_glossary.json",
        r#"{"templates": [{"template_id": "t", "language": "en", "client_type": "retail",
            "management_company": "Acme AM", "text": "Text.", "required": true}]}"#,
    );
    write(refs.path(), "prospectus_facts.json", r#"{"benchmark_name": "MSCI World"}"#);

    let store = ReferenceStore::load(rules.path(), Some(refs.path()));

    for module in ModuleId::all() {
        assert!(store.rule_set(module).is_some(), "missing rules for {}", module);
    }
    assert!(store.registration.is_some());
    assert!(store.disclaimers.is_some());
    assert!(store.prospectus.is_some());
    assert!(store.missing.is_empty());
}

#[test]
fn test_load_partialRuleDirectory_shouldDegradeOnlyAbsentModules() {
    let rules = tempdir().unwrap();
    write(rules.path(), "structure.json", r#"{"category": "structure", "rules": []}"#);

    let store = ReferenceStore::load(rules.path(), None::<&std::path::Path>);

    assert!(store.rule_set(ModuleId::Structure).is_some());
    assert!(store.rule_set(ModuleId::Performance).is_none());
    assert!(store.is_missing("rules/performance"));
    assert!(!store.is_missing("rules/structure"));
}

#[test]
fn test_load_unparseableRuleFile_shouldDegradeNotPanic() {
    let rules = tempdir().unwrap();
    write(rules.path(), "esg.json", "not json at all");

    let store = ReferenceStore::load(rules.path(), None::<&std::path::Path>);
    assert!(store.rule_set(ModuleId::Esg).is_none());
    assert!(store.is_missing("rules/esg"));
}

#[test]
fn test_load_ruleFile_shouldParseTaggedValidations() {
    let rules = tempdir().unwrap();
    write(
        rules.path(),
        "general_rules.json",
        r#"{
            "category": "general_rules",
            "rules": [
                {
                    "rule_id": "GEN-001",
                    "severity": "major",
                    "validation_type": "absence",
                    "forbidden_terms": ["guaranteed", "risk-free"],
                    "applies_if": {"client_type": "retail"}
                },
                {
                    "rule_id": "GEN-002",
                    "severity": "warning",
                    "validation_type": "semantic",
                    "question": "Is opinion language presented without attenuation?",
                    "keywords": ["convinced", "certain"]
                }
            ]
        }"#,
    );

    let store = ReferenceStore::load(rules.path(), None::<&std::path::Path>);
    let set = store.rule_set(ModuleId::GeneralRules).unwrap();

    assert_eq!(set.rules.len(), 2);
    match &set.rules[0].validation {
        RuleValidation::Absence { forbidden_terms } => {
            assert_eq!(forbidden_terms.len(), 2);
        }
        other => panic!("expected absence validation, got {:?}", other),
    }
    assert!(set.rules[0].applies_if.is_some());
    assert_eq!(set.rules[1].keywords, vec!["convinced", "certain"]);
}

#[test]
fn test_registrationTable_statusCodes_shouldGateAuthorization() {
    let refs = tempdir().unwrap();
    write(
        refs.path(),
        "registration_table.json",
        r#"{"funds": [{
            "fund_isin": "LU0123456789",
            "share_class": "A",
            "countries": {"France": "A", "Spain": "pending", "Italy": "withdrawn"}
        }]}"#,
    );
    let rules = tempdir().unwrap();
    let store = ReferenceStore::load(rules.path(), Some(refs.path()));
    let table = store.registration.unwrap();

    assert!(table.is_country_authorized("LU0123456789", "France"));
    assert!(!table.is_country_authorized("LU0123456789", "Spain"));
    assert!(!table.is_country_authorized("LU0123456789", "Italy"));
}
