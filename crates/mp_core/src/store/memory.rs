use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};

use super::{MatchObserver, PostObserver, RecordObserver, Store, Subscription};
use crate::error::{CoreError, Result};
use crate::model::{Match, MatchStatus, PointRecord, Post};
use crate::snapshot::{StoreSnapshot, SNAPSHOT_VERSION};

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct Collections {
    matches: Vec<Match>,
    records: Vec<PointRecord>,
    posts: Vec<Post>,
}

impl Collections {
    fn match_index(&self, id: &str) -> Result<usize> {
        self.matches
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Matches ordered by scheduled time ascending (stable for ties).
    fn matches_view(&self) -> Vec<Match> {
        let mut view = self.matches.clone();
        view.sort_by_key(|m| m.scheduled_at);
        view
    }

    fn records_view(&self) -> Vec<PointRecord> {
        self.records.clone()
    }

    /// Posts newest first (stable for ties).
    fn posts_view(&self) -> Vec<Post> {
        let mut view = self.posts.clone();
        view.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        view
    }
}

struct Observers<T> {
    entries: Mutex<Vec<(u64, Box<dyn Fn(&[T]) + Send + Sync>)>>,
}

impl<T> Observers<T> {
    fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    fn add(&self, id: u64, observer: Box<dyn Fn(&[T]) + Send + Sync>) {
        self.entries.lock().expect("observer lock poisoned").push((id, observer));
    }

    fn remove(&self, id: u64) {
        self.entries.lock().expect("observer lock poisoned").retain(|(oid, _)| *oid != id);
    }

    fn notify(&self, view: &[T]) {
        for (_, observer) in self.entries.lock().expect("observer lock poisoned").iter() {
            observer(view);
        }
    }
}

struct Inner {
    data: Mutex<Collections>,
    match_observers: Observers<Match>,
    record_observers: Observers<PointRecord>,
    post_observers: Observers<Post>,
    next_observer_id: AtomicU64,
    clock: Clock,
}

/// In-memory document store with live queries.
///
/// One mutex guards all three collections, so every mutation (and the
/// finalization transaction in particular) is serialized against every
/// other writer. Observer dispatch happens after the data lock is released;
/// observers receive a cloned snapshot of the full result set.
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(Utc::now))
    }

    /// Inject a deterministic clock (tests pin timestamps with this).
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: Mutex::new(Collections::default()),
                match_observers: Observers::new(),
                record_observers: Observers::new(),
                post_observers: Observers::new(),
                next_observer_id: AtomicU64::new(1),
                clock,
            }),
        }
    }

    /// Restore a store from a persisted snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut data = store.inner.data.lock().expect("store lock poisoned");
            data.matches = snapshot.matches;
            data.records = snapshot.records;
            data.posts = snapshot.posts;
        }
        store
    }

    /// Capture the current collections for persistence.
    pub fn to_snapshot(&self) -> StoreSnapshot {
        let data = self.inner.data.lock().expect("store lock poisoned");
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: (self.inner.clock)(),
            matches: data.matches.clone(),
            records: data.records.clone(),
            posts: data.posts.clone(),
        }
    }

    fn subscription(&self, unregister: impl Fn(&Inner) + Send + 'static) -> Subscription {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                unregister(&inner);
            }
        })
    }

    fn next_id(&self) -> u64 {
        self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Store for MemoryStore {
    fn create_match(&self, m: Match) -> Result<Match> {
        let view = {
            let mut data = self.inner.data.lock().expect("store lock poisoned");
            if data.matches.iter().any(|existing| existing.id == m.id) {
                return Err(CoreError::InvalidParameter(format!("duplicate match id {}", m.id)));
            }
            data.matches.push(m.clone());
            data.matches_view()
        };
        log::debug!("match {} created at {}", m.id, m.location);
        self.inner.match_observers.notify(&view);
        Ok(m)
    }

    fn get_match(&self, id: &str) -> Result<Match> {
        let data = self.inner.data.lock().expect("store lock poisoned");
        let idx = data.match_index(id)?;
        Ok(data.matches[idx].clone())
    }

    fn update_match(&self, id: &str, apply: &dyn Fn(&Match) -> Result<Match>) -> Result<Match> {
        let (updated, view) = {
            let mut data = self.inner.data.lock().expect("store lock poisoned");
            let idx = data.match_index(id)?;
            let updated = apply(&data.matches[idx])?;
            data.matches[idx] = updated.clone();
            (updated, data.matches_view())
        };
        self.inner.match_observers.notify(&view);
        Ok(updated)
    }

    fn delete_match(&self, id: &str) -> Result<()> {
        let view = {
            let mut data = self.inner.data.lock().expect("store lock poisoned");
            let idx = data.match_index(id)?;
            if data.matches[idx].status == MatchStatus::Finished {
                return Err(CoreError::MatchClosed);
            }
            data.matches.remove(idx);
            data.matches_view()
        };
        log::debug!("match {} deleted", id);
        self.inner.match_observers.notify(&view);
        Ok(())
    }

    fn matches(&self) -> Result<Vec<Match>> {
        Ok(self.inner.data.lock().expect("store lock poisoned").matches_view())
    }

    fn subscribe_matches(&self, observer: MatchObserver) -> Subscription {
        let id = self.next_id();
        let initial = self.inner.data.lock().expect("store lock poisoned").matches_view();
        observer(&initial);
        self.inner.match_observers.add(id, observer);
        self.subscription(move |inner| inner.match_observers.remove(id))
    }

    fn records(&self) -> Result<Vec<PointRecord>> {
        Ok(self.inner.data.lock().expect("store lock poisoned").records_view())
    }

    fn subscribe_records(&self, observer: RecordObserver) -> Subscription {
        let id = self.next_id();
        let initial = self.inner.data.lock().expect("store lock poisoned").records_view();
        observer(&initial);
        self.inner.record_observers.add(id, observer);
        self.subscription(move |inner| inner.record_observers.remove(id))
    }

    fn create_post(&self, post: Post) -> Result<Post> {
        let view = {
            let mut data = self.inner.data.lock().expect("store lock poisoned");
            data.posts.push(post.clone());
            data.posts_view()
        };
        self.inner.post_observers.notify(&view);
        Ok(post)
    }

    fn posts(&self) -> Result<Vec<Post>> {
        Ok(self.inner.data.lock().expect("store lock poisoned").posts_view())
    }

    fn subscribe_posts(&self, observer: PostObserver) -> Subscription {
        let id = self.next_id();
        let initial = self.inner.data.lock().expect("store lock poisoned").posts_view();
        observer(&initial);
        self.inner.post_observers.add(id, observer);
        self.subscription(move |inner| inner.post_observers.remove(id))
    }

    fn commit_finalization(
        &self,
        id: &str,
        plan: &dyn Fn(&Match) -> Result<(Match, Vec<PointRecord>)>,
    ) -> Result<(Match, Vec<PointRecord>)> {
        let (updated, committed, match_view, record_view) = {
            let mut data = self.inner.data.lock().expect("store lock poisoned");
            let idx = data.match_index(id)?;
            let (updated, mut records) = plan(&data.matches[idx])?;

            let commit_time = (self.inner.clock)();
            for record in &mut records {
                record.recorded_at = commit_time;
            }

            data.matches[idx] = updated.clone();
            data.records.extend(records.iter().cloned());
            (updated, records, data.matches_view(), data.records_view())
        };
        log::info!("match {} finalized with {} ledger records", id, committed.len());
        self.inner.match_observers.notify(&match_view);
        self.inner.record_observers.notify(&record_view);
        Ok((updated, committed))
    }

    fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchDraft, UserProfile};
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    fn fixed_clock() -> Clock {
        Box::new(|| Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap())
    }

    fn seeded(capacity: u32) -> (MemoryStore, Match) {
        let store = MemoryStore::with_clock(fixed_clock());
        let draft = MatchDraft {
            location: "Quadra 1".to_string(),
            scheduled_at: Utc.with_ymd_and_hms(2025, 4, 5, 20, 0, 0).unwrap(),
            capacity,
        };
        let m = Match::from_draft(&draft, &UserProfile::new("u-creator", "Creator"), store.now())
            .unwrap();
        let m = store.create_match(m).unwrap();
        (store, m)
    }

    #[test]
    fn test_get_missing_match() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_match("nope"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_matches_ordered_by_schedule() {
        let store = MemoryStore::with_clock(fixed_clock());
        for (id_suffix, day) in [("late", 20), ("early", 2), ("mid", 11)] {
            let draft = MatchDraft {
                location: format!("court-{}", id_suffix),
                scheduled_at: Utc.with_ymd_and_hms(2025, 4, day, 20, 0, 0).unwrap(),
                capacity: 10,
            };
            let m =
                Match::from_draft(&draft, &UserProfile::new("u", "U"), store.now()).unwrap();
            store.create_match(m).unwrap();
        }

        let locations: Vec<_> =
            store.matches().unwrap().into_iter().map(|m| m.location).collect();
        assert_eq!(locations, ["court-early", "court-mid", "court-late"]);
    }

    #[test]
    fn test_update_match_aborts_without_write() {
        let (store, m) = seeded(5);
        let err = store
            .update_match(&m.id, &|_| Err(CoreError::MatchClosed))
            .unwrap_err();
        assert_eq!(err, CoreError::MatchClosed);
        assert_eq!(store.get_match(&m.id).unwrap().roster.len(), 0);
    }

    #[test]
    fn test_subscription_pushes_initial_and_updates() {
        let (store, m) = seeded(5);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = seen.clone();

        let sub = store.subscribe_matches(Box::new(move |all| {
            assert_eq!(all.len(), 1);
            seen_cb.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(seen.load(Ordering::SeqCst), 1, "initial snapshot expected");

        store
            .update_match(&m.id, &|cur| cur.with_join(&UserProfile::new("u1", "Ana")))
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        drop(sub);
        store
            .update_match(&m.id, &|cur| cur.with_join(&UserProfile::new("u2", "Bia")))
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2, "dropped subscription must not fire");
    }

    #[test]
    fn test_delete_finished_match_is_refused() {
        let (store, m) = seeded(5);
        store
            .commit_finalization(&m.id, &|cur| Ok((cur.clone().into_finished(), Vec::new())))
            .unwrap();

        assert_eq!(store.delete_match(&m.id).unwrap_err(), CoreError::MatchClosed);
        assert!(store.get_match(&m.id).is_ok());
    }

    #[test]
    fn test_finalization_stamps_recorded_at() {
        let (store, m) = seeded(5);
        store
            .update_match(&m.id, &|cur| cur.with_join(&UserProfile::new("u1", "Ana")))
            .unwrap();

        let (_, committed) = store
            .commit_finalization(&m.id, &|cur| {
                let records = vec![PointRecord {
                    id: "r1".to_string(),
                    user_id: "u1".to_string(),
                    display_name: "Ana".to_string(),
                    match_id: cur.id.clone(),
                    points: 5,
                    match_date: cur.scheduled_at,
                    // Provisional; the store overwrites with commit time.
                    recorded_at: Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap(),
                }];
                Ok((cur.clone().into_finished(), records))
            })
            .unwrap();

        assert_eq!(committed[0].recorded_at, store.now());
        assert_eq!(store.records().unwrap(), committed);
    }

    #[test]
    fn test_aborted_finalization_writes_nothing() {
        let (store, m) = seeded(5);
        let err = store
            .commit_finalization(&m.id, &|_| Err(CoreError::MatchAlreadyFinished))
            .unwrap_err();
        assert_eq!(err, CoreError::MatchAlreadyFinished);
        assert!(store.records().unwrap().is_empty());
        assert_eq!(store.get_match(&m.id).unwrap().status, MatchStatus::Open);
    }

    #[test]
    fn test_concurrent_joins_respect_capacity() {
        let (store, m) = seeded(3);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let match_id = m.id.clone();
                std::thread::spawn(move || {
                    let user = UserProfile::new(format!("u{}", i), format!("User {}", i));
                    store.update_match(&match_id, &|cur| cur.with_join(&user)).is_ok()
                })
            })
            .collect();

        let joined = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        let roster = store.get_match(&m.id).unwrap().roster;

        assert_eq!(joined, 3);
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_posts_newest_first() {
        let store = MemoryStore::new();
        for (i, hour) in [(1, 8), (2, 12), (3, 10)] {
            store
                .create_post(Post {
                    id: format!("p{}", i),
                    author_id: "u".to_string(),
                    author_name: "U".to_string(),
                    body: format!("post {}", i),
                    kind: crate::model::PostKind::Text,
                    created_at: Utc.with_ymd_and_hms(2025, 4, 1, hour, 0, 0).unwrap(),
                })
                .unwrap();
        }

        let ids: Vec<_> = store.posts().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["p2", "p3", "p1"]);
    }
}
