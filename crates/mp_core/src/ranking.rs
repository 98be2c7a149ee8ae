use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::PointRecord;

/// Time scoping applied when reducing the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingWindow {
    All,
    CurrentMonth,
}

/// One leaderboard line. Derived on every aggregation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRow {
    pub user_id: String,
    pub display_name: String,
    pub total_points: i64,
    pub match_count: u32,
}

/// Reduce ledger records into an ordered leaderboard.
///
/// Pure function, recomputed in full on every input change; the ledger is
/// bounded by the group's history, so there is nothing to maintain
/// incrementally. `CurrentMonth` keeps records whose match date falls in the
/// same calendar month and year as `now`, evaluated in `now`'s timezone.
///
/// Records arrive in arbitrary order. The display name on a row is whichever
/// record for that user was seen last; names are assumed stable per user, so
/// this is a display convenience, not a correctness rule. Ordering is
/// deterministic: total points descending, then display name, then user id.
pub fn aggregate<Tz: TimeZone>(
    records: &[PointRecord],
    window: RankingWindow,
    now: &DateTime<Tz>,
) -> Vec<RankingRow> {
    let mut by_user: HashMap<&str, RankingRow> = HashMap::new();

    for record in records {
        if !in_window(record, window, now) {
            continue;
        }

        let row = by_user.entry(record.user_id.as_str()).or_insert_with(|| RankingRow {
            user_id: record.user_id.clone(),
            display_name: record.display_name.clone(),
            total_points: 0,
            match_count: 0,
        });
        row.total_points += i64::from(record.points);
        row.match_count += 1;
        row.display_name.clone_from(&record.display_name);
    }

    let mut rows: Vec<RankingRow> = by_user.into_values().collect();
    rows.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    rows
}

fn in_window<Tz: TimeZone>(record: &PointRecord, window: RankingWindow, now: &DateTime<Tz>) -> bool {
    match window {
        RankingWindow::All => true,
        RankingWindow::CurrentMonth => {
            let local = record.match_date.with_timezone(&now.timezone());
            local.month() == now.month() && local.year() == now.year()
        }
    }
}
