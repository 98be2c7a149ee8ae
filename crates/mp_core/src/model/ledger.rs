use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable entry in the point ledger.
///
/// Written exactly once per roster entry whose outcome resolved to a nonzero
/// point value. Nothing updates or deletes a record after the fact;
/// corrections would require a new offsetting record, which the system does
/// not currently support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    pub match_id: String,
    pub points: i32,
    /// The match's scheduled date, not the finalization time. Ranking
    /// windows are cut on this field.
    pub match_date: DateTime<Utc>,
    /// Store-assigned commit time.
    pub recorded_at: DateTime<Utc>,
}
