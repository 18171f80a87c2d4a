/*!
 * Prospectus-derived key facts.
 *
 * Free-form facts extracted upstream from the fund prospectus. Every field is
 * optional; absence degrades the prospectus-alignment checks but never aborts
 * the run.
 */

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ReferenceError;
use crate::file_utils::FileManager;

/// An asset-allocation bound stated in the prospectus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationThreshold {
    /// What the bound applies to ("equities", "high yield", ...)
    pub label: String,

    /// Lower bound in percent
    #[serde(default)]
    pub min_pct: Option<f64>,

    /// Upper bound in percent
    #[serde(default)]
    pub max_pct: Option<f64>,
}

/// Key facts from the prospectus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProspectusFacts {
    /// Benchmark name
    #[serde(default)]
    pub benchmark_name: Option<String>,

    /// Benchmark specification ("net total return, EUR hedged", ...)
    #[serde(default)]
    pub benchmark_specification: Option<String>,

    /// Asset-allocation bounds
    #[serde(default)]
    pub asset_allocation_thresholds: Vec<AllocationThreshold>,

    /// Minimum investment ("USD 150,000", ...)
    #[serde(default)]
    pub minimum_investment: Option<String>,

    /// Risk factors listed in the prospectus
    #[serde(default)]
    pub risk_list: Vec<String>,

    /// Management fee ("1.5% p.a.", ...)
    #[serde(default)]
    pub management_fee: Option<String>,
}

impl ProspectusFacts {
    /// Load the facts from a JSON file
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
}
