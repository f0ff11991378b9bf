//! Check types for installed policy state
//!
//! Reports whether a package's policy files are present in the shared tree
//! with the content the package ships.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::PolicyKind;

/// Status of the check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Every source has an identical installed copy
    Healthy,
    /// Some installed copies are absent
    Missing,
    /// Some installed copies differ from their source
    Drifted,
}

/// A policy file that is missing or has drifted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftItem {
    pub kind: PolicyKind,
    /// The package-provided file
    pub source: PathBuf,
    /// Where the installed copy should be
    pub target: PathBuf,
    /// Human-readable description of the problem
    pub description: String,
}

/// Report from checking one package against the shared tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub drifted: Vec<DriftItem>,
    pub missing: Vec<DriftItem>,
    /// Number of source files examined
    pub checked: usize,
}

impl Default for CheckReport {
    fn default() -> Self {
        Self::healthy()
    }
}

impl CheckReport {
    pub fn healthy() -> Self {
        Self {
            status: CheckStatus::Healthy,
            drifted: Vec::new(),
            missing: Vec::new(),
            checked: 0,
        }
    }

    pub fn with_missing(missing: Vec<DriftItem>) -> Self {
        Self {
            status: CheckStatus::Missing,
            checked: missing.len(),
            missing,
            ..Self::healthy()
        }
    }

    pub fn with_drifted(drifted: Vec<DriftItem>) -> Self {
        Self {
            status: CheckStatus::Drifted,
            checked: drifted.len(),
            drifted,
            ..Self::healthy()
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }

    /// Merge two check reports, combining their issues
    ///
    /// The resulting status is the "worst" of the two:
    /// Drifted > Missing > Healthy
    pub fn merge(mut self, other: CheckReport) -> Self {
        self.drifted.extend(other.drifted);
        self.missing.extend(other.missing);
        self.checked += other.checked;

        self.status = match (self.status, other.status) {
            (CheckStatus::Drifted, _) | (_, CheckStatus::Drifted) => CheckStatus::Drifted,
            (CheckStatus::Missing, _) | (_, CheckStatus::Missing) => CheckStatus::Missing,
            (CheckStatus::Healthy, CheckStatus::Healthy) => CheckStatus::Healthy,
        };

        self
    }
}
