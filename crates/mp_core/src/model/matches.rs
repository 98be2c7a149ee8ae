use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::user::UserProfile;
use crate::error::{CoreError, Result};

/// Match lifecycle state. The only transition is `Open -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Open,
    Finished,
}

/// Administrator-assigned verdict for one enrolled player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Unset,
    Present,
    Absent,
}

/// One enrollment on a match roster. Unique per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub outcome: Outcome,
}

impl RosterEntry {
    pub fn new(user: &UserProfile) -> Self {
        Self {
            user_id: user.id.clone(),
            display_name: user.display_name.clone(),
            outcome: Outcome::Unset,
        }
    }
}

/// Validated creation payload for a new match.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct MatchDraft {
    #[validate(length(min = 1, message = "location must not be empty"))]
    pub location: String,

    pub scheduled_at: DateTime<Utc>,

    #[validate(range(min = 2, max = 50, message = "capacity must be between 2 and 50"))]
    pub capacity: u32,
}

/// A scheduled session and its roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    pub capacity: u32,
    pub creator_id: String,
    pub creator_name: String,
    pub status: MatchStatus,
    pub roster: Vec<RosterEntry>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Build a new open match from a validated draft.
    pub fn from_draft(
        draft: &MatchDraft,
        creator: &UserProfile,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        draft.validate().map_err(|e| CoreError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            location: draft.location.clone(),
            scheduled_at: draft.scheduled_at,
            capacity: draft.capacity,
            creator_id: creator.id.clone(),
            creator_name: creator.display_name.clone(),
            status: MatchStatus::Open,
            roster: Vec::new(),
            created_at,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == MatchStatus::Open
    }

    pub fn spots_left(&self) -> u32 {
        self.capacity.saturating_sub(self.roster.len() as u32)
    }

    pub fn entry(&self, user_id: &str) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.user_id == user_id)
    }

    pub fn is_enrolled(&self, user_id: &str) -> bool {
        self.entry(user_id).is_some()
    }

    /// Functional update: enroll `user`, preserving insertion order.
    ///
    /// The caller must apply the returned match atomically; evaluating the
    /// capacity check against a stale snapshot reintroduces the
    /// check-then-act race on concurrent joins.
    pub fn with_join(&self, user: &UserProfile) -> Result<Match> {
        if !self.is_open() {
            return Err(CoreError::MatchClosed);
        }
        if self.is_enrolled(&user.id) {
            return Err(CoreError::AlreadyEnrolled(user.display_name.clone()));
        }
        if self.roster.len() as u32 >= self.capacity {
            return Err(CoreError::MatchFull { capacity: self.capacity });
        }

        let mut updated = self.clone();
        updated.roster.push(RosterEntry::new(user));
        Ok(updated)
    }

    /// Functional update: remove `user_id` from the roster.
    pub fn with_leave(&self, user_id: &str) -> Result<Match> {
        if !self.is_open() {
            return Err(CoreError::MatchClosed);
        }
        if !self.is_enrolled(user_id) {
            return Err(CoreError::NotEnrolled(user_id.to_string()));
        }

        let mut updated = self.clone();
        updated.roster.retain(|e| e.user_id != user_id);
        Ok(updated)
    }

    /// Functional update: record an attendance verdict for one entry.
    pub fn with_outcome(&self, user_id: &str, outcome: Outcome) -> Result<Match> {
        if !self.is_open() {
            return Err(CoreError::MatchClosed);
        }

        let mut updated = self.clone();
        let entry = updated
            .roster
            .iter_mut()
            .find(|e| e.user_id == user_id)
            .ok_or_else(|| CoreError::NotEnrolled(user_id.to_string()))?;
        entry.outcome = outcome;
        Ok(updated)
    }

    /// Functional update: close the match. Only the finalization transaction
    /// calls this, after re-checking the `Open` precondition.
    pub(crate) fn into_finished(mut self) -> Match {
        self.status = MatchStatus::Finished;
        self
    }
}
