use serde::{Deserialize, Serialize};

use crate::model::Outcome;

/// Deployment target. Chosen once at process start and injected; nothing in
/// the core branches on ambient globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Development,
}

/// Points awarded when a match is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Showed up as committed.
    pub present: i32,
    /// Committed and did not show.
    pub absent: i32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self { present: 5, absent: -3 }
    }
}

impl ScoringRules {
    /// Point value for one roster entry. `Unset` scores zero and produces no
    /// ledger record.
    pub fn points_for(&self, outcome: Outcome) -> i32 {
        match outcome {
            Outcome::Present => self.present,
            Outcome::Absent => self.absent,
            Outcome::Unset => 0,
        }
    }
}

/// Process-level configuration, built by the host and passed in whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Namespace for the group's data; every collection is keyed under it.
    pub app_id: String,
    pub environment: Environment,
    pub scoring: ScoringRules,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: "matchpoint".to_string(),
            environment: Environment::Development,
            scoring: ScoringRules::default(),
        }
    }
}
