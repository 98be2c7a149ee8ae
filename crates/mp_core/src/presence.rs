use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::model::{Match, Outcome, UserProfile};
use crate::store::Store;

/// Enforces join/leave/capacity rules against the match store.
///
/// Every mutation routes through [`Store::update_match`], so the roster
/// precondition checks and the write commit inside one critical section.
/// Two racing joins for the last slot cannot both pass the capacity check.
pub struct PresenceManager {
    store: Arc<dyn Store>,
}

impl PresenceManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn join(&self, match_id: &str, user: &UserProfile) -> Result<Match> {
        let updated = self.store.update_match(match_id, &|m| m.with_join(user))?;
        log::info!("{} joined match {}", user.display_name, match_id);
        Ok(updated)
    }

    pub fn leave(&self, match_id: &str, user_id: &str) -> Result<Match> {
        let updated = self.store.update_match(match_id, &|m| m.with_leave(user_id))?;
        log::info!("{} left match {}", user_id, match_id);
        Ok(updated)
    }

    /// Record an attendance verdict. Creator-only, and only while the match
    /// is still open.
    pub fn set_outcome(
        &self,
        match_id: &str,
        actor: &UserProfile,
        user_id: &str,
        outcome: Outcome,
    ) -> Result<Match> {
        self.store.update_match(match_id, &|m| {
            if m.creator_id != actor.id {
                return Err(CoreError::Unauthorized);
            }
            m.with_outcome(user_id, outcome)
        })
    }
}
