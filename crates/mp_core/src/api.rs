//! The surface the presentation layer holds.
//!
//! [`Matchpoint`] wires the identity collaborator, the store and the three
//! engine components together. Every mutating call resolves the acting user
//! from the identity provider at call time; a signed-out caller gets
//! `Unauthorized` before anything touches the store.

use std::sync::Arc;

use chrono::Local;

use crate::config::AppConfig;
use crate::error::{CoreError, Result};
use crate::feed::FeedBoard;
use crate::finalize::{FinalizationEngine, FinalizationSummary};
use crate::identity::IdentityProvider;
use crate::model::{Match, MatchDraft, Outcome, Post, PostKind, UserProfile};
use crate::presence::PresenceManager;
use crate::ranking::{aggregate, RankingRow, RankingWindow};
use crate::store::{MatchObserver, PostObserver, Store, Subscription};

/// Live leaderboard callback; receives the freshly reduced rows on every
/// ledger change.
pub type RankingObserver = Box<dyn Fn(&[RankingRow]) + Send + Sync>;

pub struct Matchpoint {
    config: AppConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn Store>,
    presence: PresenceManager,
    finalization: FinalizationEngine,
    feed: FeedBoard,
}

impl Matchpoint {
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn Store>,
    ) -> Self {
        let presence = PresenceManager::new(store.clone());
        let finalization = FinalizationEngine::new(store.clone(), config.scoring);
        let feed = FeedBoard::new(store.clone());
        log::debug!("core started for app {} ({:?})", config.app_id, config.environment);

        Self { config, identity, store, presence, finalization, feed }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn acting_user(&self) -> Result<UserProfile> {
        self.identity.current_user().ok_or(CoreError::Unauthorized)
    }

    // ---- matches ----

    pub fn create_match(&self, draft: &MatchDraft) -> Result<Match> {
        let creator = self.acting_user()?;
        let m = Match::from_draft(draft, &creator, self.store.now())?;
        self.store.create_match(m)
    }

    pub fn join_match(&self, match_id: &str) -> Result<Match> {
        let user = self.acting_user()?;
        self.presence.join(match_id, &user)
    }

    pub fn leave_match(&self, match_id: &str) -> Result<Match> {
        let user = self.acting_user()?;
        self.presence.leave(match_id, &user.id)
    }

    /// Creator-only, and never on a finalized match (the store refuses to
    /// orphan its ledger records).
    pub fn delete_match(&self, match_id: &str) -> Result<()> {
        let user = self.acting_user()?;
        let m = self.store.get_match(match_id)?;
        if m.creator_id != user.id {
            return Err(CoreError::Unauthorized);
        }
        self.store.delete_match(match_id)
    }

    pub fn set_outcome(&self, match_id: &str, user_id: &str, outcome: Outcome) -> Result<Match> {
        let actor = self.acting_user()?;
        self.presence.set_outcome(match_id, &actor, user_id, outcome)
    }

    pub fn finalize_match(&self, match_id: &str) -> Result<FinalizationSummary> {
        let actor = self.acting_user()?;
        self.finalization.finalize(match_id, &actor)
    }

    /// All matches, scheduled time ascending.
    pub fn matches(&self) -> Result<Vec<Match>> {
        self.store.matches()
    }

    pub fn subscribe_matches(&self, observer: MatchObserver) -> Subscription {
        self.store.subscribe_matches(observer)
    }

    // ---- ranking ----

    /// Current leaderboard, windowed on the local calendar.
    pub fn ranking(&self, window: RankingWindow) -> Result<Vec<RankingRow>> {
        let records = self.store.records()?;
        Ok(aggregate(&records, window, &Local::now()))
    }

    pub fn subscribe_ranking(
        &self,
        window: RankingWindow,
        observer: RankingObserver,
    ) -> Subscription {
        self.store.subscribe_records(Box::new(move |records| {
            let rows = aggregate(records, window, &Local::now());
            observer(&rows);
        }))
    }

    // ---- feed ----

    pub fn post_message(&self, body: &str, kind: PostKind) -> Result<Post> {
        let author = self.acting_user()?;
        self.feed.publish(&author, body, kind)
    }

    /// All posts, newest first.
    pub fn feed(&self) -> Result<Vec<Post>> {
        self.store.posts()
    }

    pub fn subscribe_feed(&self, observer: PostObserver) -> Subscription {
        self.feed.subscribe(observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LocalIdentity;
    use crate::model::MatchStatus;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn harness() -> (Matchpoint, Arc<LocalIdentity>) {
        let identity = Arc::new(LocalIdentity::new());
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let app = Matchpoint::new(AppConfig::default(), identity.clone(), store);
        (app, identity)
    }

    fn draft() -> MatchDraft {
        MatchDraft {
            location: "Ginasio Central".to_string(),
            scheduled_at: Utc.with_ymd_and_hms(2025, 4, 5, 20, 0, 0).unwrap(),
            capacity: 14,
        }
    }

    #[test]
    fn test_signed_out_caller_is_rejected() {
        let (app, _identity) = harness();
        assert_eq!(app.create_match(&draft()).unwrap_err(), CoreError::Unauthorized);
        assert_eq!(app.join_match("m1").unwrap_err(), CoreError::Unauthorized);
        assert_eq!(
            app.post_message("oi", PostKind::Text).unwrap_err(),
            CoreError::Unauthorized
        );
    }

    #[test]
    fn test_full_lifecycle() {
        let (app, identity) = harness();

        identity.sign_in(UserProfile::new("u-admin", "Admin"));
        let m = app.create_match(&draft()).unwrap();
        app.join_match(&m.id).unwrap();

        identity.sign_in(UserProfile::new("u-ana", "Ana"));
        app.join_match(&m.id).unwrap();

        identity.sign_in(UserProfile::new("u-admin", "Admin"));
        app.set_outcome(&m.id, "u-admin", Outcome::Present).unwrap();
        app.set_outcome(&m.id, "u-ana", Outcome::Absent).unwrap();

        let summary = app.finalize_match(&m.id).unwrap();
        assert_eq!(summary.records_written, 2);
        assert_eq!(summary.finalized.status, MatchStatus::Finished);

        let rows = app.ranking(RankingWindow::All).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_name, "Admin");
        assert_eq!(rows[0].total_points, 5);
        assert_eq!(rows[1].display_name, "Ana");
        assert_eq!(rows[1].total_points, -3);
    }

    #[test]
    fn test_delete_is_creator_only() {
        let (app, identity) = harness();

        identity.sign_in(UserProfile::new("u-admin", "Admin"));
        let m = app.create_match(&draft()).unwrap();

        identity.sign_in(UserProfile::new("u-ana", "Ana"));
        assert_eq!(app.delete_match(&m.id).unwrap_err(), CoreError::Unauthorized);

        identity.sign_in(UserProfile::new("u-admin", "Admin"));
        app.delete_match(&m.id).unwrap();
        assert!(app.matches().unwrap().is_empty());
    }

    #[test]
    fn test_delete_finalized_match_refused() {
        let (app, identity) = harness();

        identity.sign_in(UserProfile::new("u-admin", "Admin"));
        let m = app.create_match(&draft()).unwrap();
        app.finalize_match(&m.id).unwrap();

        assert_eq!(app.delete_match(&m.id).unwrap_err(), CoreError::MatchClosed);
    }

    #[test]
    fn test_ranking_subscription_tracks_finalizations() {
        use std::sync::Mutex;

        let (app, identity) = harness();
        identity.sign_in(UserProfile::new("u-admin", "Admin"));

        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let _sub = app.subscribe_ranking(
            RankingWindow::All,
            Box::new(move |rows| seen_cb.lock().unwrap().push(rows.len())),
        );

        let m = app.create_match(&draft()).unwrap();
        app.join_match(&m.id).unwrap();
        app.set_outcome(&m.id, "u-admin", Outcome::Present).unwrap();
        app.finalize_match(&m.id).unwrap();

        let pushes = seen.lock().unwrap().clone();
        assert_eq!(pushes, vec![0, 1], "initial empty push, then one row after finalize");
    }
}
