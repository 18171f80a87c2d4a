/*!
 * Reference data store.
 *
 * Read-only access to rule definitions, the fund registration table, the
 * disclaimer template glossary, and prospectus-derived facts. Every dataset
 * is optional: a missing file degrades the modules that need it but never
 * aborts the run. What is missing is recorded so the report can say which
 * modules ran degraded and why.
 */

pub mod disclaimers;
pub mod prospectus;
pub mod registration;
pub mod rules;

pub use disclaimers::{DisclaimerGlossary, DisclaimerTemplate};
pub use prospectus::{AllocationThreshold, ProspectusFacts};
pub use registration::{FundRegistration, RegistrationTable};
pub use rules::{Applicability, AppliesIf, Rule, RuleSet, RuleValidation};

use log::warn;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::ReferenceError;
use crate::violation::ModuleId;

/// The loaded reference data for one run
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    /// Per-module rule sets; absent entries mean the module runs degraded
    rule_sets: HashMap<ModuleId, RuleSet>,

    /// Registration table, if available
    pub registration: Option<RegistrationTable>,

    /// Disclaimer glossary, if available
    pub disclaimers: Option<DisclaimerGlossary>,

    /// Prospectus facts, if available
    pub prospectus: Option<ProspectusFacts>,

    /// Names of the datasets/files that were absent or unreadable
    pub missing: Vec<String>,
}

impl ReferenceStore {
    /// Load rule files and reference datasets from their directories.
    ///
    /// Each module loads its own file (`<rules_dir>/<module>.json`)
    /// independently; any individual file may be absent. Parse failures are
    /// treated like absence (degraded module), with a warning logged.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        rules_dir: P,
        references_dir: Option<Q>,
    ) -> Self {
        let mut store = Self::default();

        for module in ModuleId::all() {
            let path = rules_dir.as_ref().join(format!("{}.json", module.as_str()));
            match RuleSet::load(&path) {
                Ok(set) => {
                    store.rule_sets.insert(module, set);
                }
                Err(ReferenceError::Missing(path)) => {
                    warn!("Rule file missing for module {}: {}", module, path);
                    store.missing.push(format!("rules/{}", module.as_str()));
                }
                Err(err) => {
                    warn!("Rule file unusable for module {}: {}", module, err);
                    store.missing.push(format!("rules/{}", module.as_str()));
                }
            }
        }

        if let Some(dir) = references_dir {
            let dir = dir.as_ref();
            store.registration =
                Self::load_optional(dir.join("registration_table.json"), &mut store.missing, |p| {
                    RegistrationTable::load(p)
                });
            store.disclaimers = Self::load_optional(
                dir.join("disclaimer_glossary.json"),
                &mut store.missing,
                |p| DisclaimerGlossary::load(p),
            );
            store.prospectus =
                Self::load_optional(dir.join("prospectus_facts.json"), &mut store.missing, |p| {
                    ProspectusFacts::load(p)
                });
        } else {
            store.missing.extend([
                "registration_table".to_string(),
                "disclaimer_glossary".to_string(),
                "prospectus_facts".to_string(),
            ]);
        }

        store
    }

    fn load_optional<T, P, F>(path: P, missing: &mut Vec<String>, load: F) -> Option<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> Result<T, ReferenceError>,
    {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        match load(path) {
            Ok(value) => Some(value),
            Err(ReferenceError::Missing(_)) => {
                missing.push(stem);
                None
            }
            Err(err) => {
                warn!("Reference dataset unusable: {}", err);
                missing.push(stem);
                None
            }
        }
    }

    /// Build a store from already-loaded parts (used by tests)
    pub fn from_parts(
        rule_sets: HashMap<ModuleId, RuleSet>,
        registration: Option<RegistrationTable>,
        disclaimers: Option<DisclaimerGlossary>,
        prospectus: Option<ProspectusFacts>,
    ) -> Self {
        Self { rule_sets, registration, disclaimers, prospectus, missing: Vec::new() }
    }

    /// Rule set for a module, `None` when the module's file was absent
    pub fn rule_set(&self, module: ModuleId) -> Option<&RuleSet> {
        self.rule_sets.get(&module)
    }

    /// Whether the given dataset was absent at load time
    pub fn is_missing(&self, dataset: &str) -> bool {
        self.missing.iter().any(|m| m == dataset)
    }
}
