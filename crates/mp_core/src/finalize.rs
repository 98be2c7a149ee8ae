use std::sync::Arc;

use uuid::Uuid;

use crate::config::ScoringRules;
use crate::error::{CoreError, Result};
use crate::model::{Match, PointRecord, UserProfile};
use crate::store::Store;

/// What a finalization committed, reported back for confirmation.
#[derive(Debug, Clone)]
pub struct FinalizationSummary {
    pub finalized: Match,
    pub records_written: usize,
}

/// Transitions a match to its terminal state and converts recorded outcomes
/// into ledger entries.
///
/// The status flip and the record appends commit as one store transaction
/// whose precondition is `status == Open`. That precondition is the whole
/// retry story: a second invocation fails `MatchAlreadyFinished` and writes
/// nothing, so points are never paid twice.
pub struct FinalizationEngine {
    store: Arc<dyn Store>,
    rules: ScoringRules,
}

impl FinalizationEngine {
    pub fn new(store: Arc<dyn Store>, rules: ScoringRules) -> Self {
        Self { store, rules }
    }

    pub fn finalize(&self, match_id: &str, actor: &UserProfile) -> Result<FinalizationSummary> {
        let (finalized, records) = self.store.commit_finalization(match_id, &|m| {
            if m.creator_id != actor.id {
                return Err(CoreError::Unauthorized);
            }
            if !m.is_open() {
                return Err(CoreError::MatchAlreadyFinished);
            }
            Ok((m.clone().into_finished(), self.build_records(m)))
        })?;

        log::info!(
            "match {} finalized by {}: {} players scored",
            match_id,
            actor.display_name,
            records.len()
        );
        Ok(FinalizationSummary { finalized, records_written: records.len() })
    }

    /// One record per roster entry with a nonzero point value. `match_date`
    /// carries the scheduled date; `recorded_at` here is provisional and
    /// replaced by the store's commit time.
    fn build_records(&self, m: &Match) -> Vec<PointRecord> {
        let now = self.store.now();
        m.roster
            .iter()
            .filter_map(|entry| {
                let points = self.rules.points_for(entry.outcome);
                if points == 0 {
                    return None;
                }
                Some(PointRecord {
                    id: Uuid::new_v4().to_string(),
                    user_id: entry.user_id.clone(),
                    display_name: entry.display_name.clone(),
                    match_id: m.id.clone(),
                    points,
                    match_date: m.scheduled_at,
                    recorded_at: now,
                })
            })
            .collect()
    }
}
