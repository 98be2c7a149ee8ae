use std::sync::Arc;

use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::model::{Post, PostKind, UserProfile};
use crate::store::{PostObserver, Store, Subscription};

/// The group message board. Posts never interact with the match lifecycle
/// or the ledger.
pub struct FeedBoard {
    store: Arc<dyn Store>,
}

impl FeedBoard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn publish(&self, author: &UserProfile, body: &str, kind: PostKind) -> Result<Post> {
        if body.trim().is_empty() {
            return Err(CoreError::InvalidParameter("post body must not be empty".to_string()));
        }

        let post = Post {
            id: Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            body: body.to_string(),
            kind,
            created_at: self.store.now(),
        };
        self.store.create_post(post)
    }

    /// Live query, newest first.
    pub fn subscribe(&self, observer: PostObserver) -> Subscription {
        self.store.subscribe_posts(observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_publish_and_read_back() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let board = FeedBoard::new(store.clone());
        let ana = UserProfile::new("u1", "Ana");

        board.publish(&ana, "bora jogar sábado?", PostKind::Text).unwrap();
        board.publish(&ana, "https://example.com/foto.jpg", PostKind::Image).unwrap();

        let posts = store.posts().unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.author_id == "u1"));
    }

    #[test]
    fn test_blank_post_rejected() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let board = FeedBoard::new(store);
        let err = board
            .publish(&UserProfile::new("u1", "Ana"), "   ", PostKind::Text)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter(_)));
    }
}
