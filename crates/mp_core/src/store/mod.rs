//! Narrow interface over the document store.
//!
//! The core consumes exactly the capability set a Firestore-class backend
//! offers: document CRUD, ordered live queries that push the full result set
//! on every change, a read-then-conditionally-write transaction across the
//! match and ledger collections, and server-assigned timestamps.
//! [`MemoryStore`] is the shipped implementation; a remote backend would
//! implement the same trait.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Match, PointRecord, Post};

/// Live-query callback. Every invocation carries the full current result
/// set, never a delta; consumers must treat it as a state replace.
pub type MatchObserver = Box<dyn Fn(&[Match]) + Send + Sync>;
pub type RecordObserver = Box<dyn Fn(&[PointRecord]) + Send + Sync>;
pub type PostObserver = Box<dyn Fn(&[Post]) + Send + Sync>;

/// Registration guard for a live query or change stream. Dropping it
/// detaches the observer; `forever()` keeps it attached for the life of the
/// process.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Keep the observer attached for the rest of the process.
    pub fn forever(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

pub trait Store: Send + Sync {
    // ---- matches ----

    fn create_match(&self, m: Match) -> Result<Match>;

    fn get_match(&self, id: &str) -> Result<Match>;

    /// Atomic read-modify-write of one match document. `apply` runs inside
    /// the store's critical section; returning `Err` aborts with nothing
    /// written. All roster mutation goes through here so that precondition
    /// checks and the write cannot interleave with a concurrent writer.
    fn update_match(&self, id: &str, apply: &dyn Fn(&Match) -> Result<Match>) -> Result<Match>;

    /// Remove a match document. Fails `MatchClosed` on a finished match:
    /// its ledger records reference it and must not be orphaned.
    fn delete_match(&self, id: &str) -> Result<()>;

    /// All matches, scheduled time ascending.
    fn matches(&self) -> Result<Vec<Match>>;

    /// Live query over all matches. The observer fires immediately with the
    /// current result set and again after every change. Callbacks must be
    /// cheap and must not register or cancel subscriptions from inside.
    fn subscribe_matches(&self, observer: MatchObserver) -> Subscription;

    // ---- point ledger ----

    /// The full append-only ledger, in insertion order.
    fn records(&self) -> Result<Vec<PointRecord>>;

    fn subscribe_records(&self, observer: RecordObserver) -> Subscription;

    // ---- feed board ----

    fn create_post(&self, post: Post) -> Result<Post>;

    /// All posts, newest first.
    fn posts(&self) -> Result<Vec<Post>>;

    fn subscribe_posts(&self, observer: PostObserver) -> Subscription;

    // ---- transaction ----

    /// Read-then-conditionally-write across the match and ledger
    /// collections. `plan` sees the current document; on `Ok` the returned
    /// match replaces it and the records are appended, all-or-nothing. The
    /// store stamps each appended record's `recorded_at` with the commit
    /// time (any value the planner set is provisional).
    fn commit_finalization(
        &self,
        id: &str,
        plan: &dyn Fn(&Match) -> Result<(Match, Vec<PointRecord>)>,
    ) -> Result<(Match, Vec<PointRecord>)>;

    /// Server-assigned timestamp source.
    fn now(&self) -> DateTime<Utc>;
}
