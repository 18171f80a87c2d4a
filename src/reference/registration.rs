/*!
 * Fund registration table.
 *
 * Maps a fund (ISIN, optionally per share class) to the set of countries
 * where distribution is authorized, each with a status code. Country names
 * are compared in normalized form (case, diacritics, parenthetical suffixes).
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::ReferenceError;
use crate::file_utils::FileManager;
use crate::text_utils::{contains_whole_word, normalize_entity_name};

/// Status codes that mean distribution is authorized
const AUTHORIZED_CODES: &[&str] = &["a", "r", "authorized", "registered", "yes"];

/// Registration record for one fund or share class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRegistration {
    /// Fund ISIN
    pub fund_isin: String,

    /// Share class, when the table is class-specific
    #[serde(default)]
    pub share_class: String,

    /// Country name -> status code
    pub countries: BTreeMap<String, String>,
}

/// The registration table for all funds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationTable {
    /// All registration records
    pub funds: Vec<FundRegistration>,
}

impl RegistrationTable {
    /// Load the table from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        if !FileManager::file_exists(path) {
            return Err(ReferenceError::Missing(path.display().to_string()));
        }
        FileManager::read_json(path).map_err(|e| ReferenceError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Whether the table has any record for the fund
    pub fn knows_fund(&self, fund_isin: &str) -> bool {
        let isin = fund_isin.trim().to_uppercase();
        self.funds.iter().any(|f| f.fund_isin.trim().to_uppercase() == isin)
    }

    /// Normalized names of the countries where the fund is authorized,
    /// merged across its share classes.
    pub fn authorized_countries(&self, fund_isin: &str) -> Vec<String> {
        let isin = fund_isin.trim().to_uppercase();
        let mut countries: Vec<String> = self
            .funds
            .iter()
            .filter(|f| f.fund_isin.trim().to_uppercase() == isin)
            .flat_map(|f| f.countries.iter())
            .filter(|(_, code)| AUTHORIZED_CODES.contains(&code.trim().to_lowercase().as_str()))
            .map(|(country, _)| normalize_entity_name(country))
            .collect();
        countries.sort();
        countries.dedup();
        countries
    }

    /// Whether a country (any formatting) is authorized for the fund.
    ///
    /// A match is an equal normalized form, or the table entry containing the
    /// document's form as a whole word ("luxembourg (grand duchy)" covers
    /// "Luxembourg"). No implicit cross-language aliasing.
    pub fn is_country_authorized(&self, fund_isin: &str, country: &str) -> bool {
        let wanted = normalize_entity_name(country);
        if wanted.is_empty() {
            return false;
        }
        self.authorized_countries(fund_isin).iter().any(|authorized| {
            authorized == &wanted
                || contains_whole_word(authorized, &wanted)
                || contains_whole_word(&wanted, authorized)
        })
    }
}
