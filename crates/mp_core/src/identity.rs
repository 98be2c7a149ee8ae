use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::model::UserProfile;
use crate::store::Subscription;

/// Change-stream callback for sign-in/sign-out transitions. `None` means
/// signed out.
pub type AuthObserver = Box<dyn Fn(Option<&UserProfile>) + Send + Sync>;

/// What the core needs from the identity collaborator: who is signed in
/// right now, and a stream of auth transitions.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserProfile>;

    /// The observer fires immediately with the current auth state and again
    /// on every transition.
    fn subscribe(&self, observer: AuthObserver) -> Subscription;
}

struct LocalIdentityInner {
    user: Mutex<Option<UserProfile>>,
    observers: Mutex<Vec<(u64, AuthObserver)>>,
    next_observer_id: AtomicU64,
}

/// In-process identity provider for the CLI and for tests. A hosted
/// deployment would adapt its auth SDK to [`IdentityProvider`] instead.
pub struct LocalIdentity {
    inner: Arc<LocalIdentityInner>,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LocalIdentityInner {
                user: Mutex::new(None),
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn signed_in(user: UserProfile) -> Self {
        let identity = Self::new();
        identity.sign_in(user);
        identity
    }

    pub fn sign_in(&self, user: UserProfile) {
        log::info!("{} signed in", user.display_name);
        *self.inner.user.lock().expect("identity lock poisoned") = Some(user);
        self.notify();
    }

    pub fn sign_out(&self) {
        *self.inner.user.lock().expect("identity lock poisoned") = None;
        self.notify();
    }

    fn notify(&self) {
        let current = self.inner.user.lock().expect("identity lock poisoned").clone();
        for (_, observer) in
            self.inner.observers.lock().expect("identity lock poisoned").iter()
        {
            observer(current.as_ref());
        }
    }
}

impl IdentityProvider for LocalIdentity {
    fn current_user(&self) -> Option<UserProfile> {
        self.inner.user.lock().expect("identity lock poisoned").clone()
    }

    fn subscribe(&self, observer: AuthObserver) -> Subscription {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        observer(self.current_user().as_ref());
        self.inner.observers.lock().expect("identity lock poisoned").push((id, observer));

        let weak: Weak<LocalIdentityInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .observers
                    .lock()
                    .expect("identity lock poisoned")
                    .retain(|(oid, _)| *oid != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_sign_in_and_out() {
        let identity = LocalIdentity::new();
        assert!(identity.current_user().is_none());

        identity.sign_in(UserProfile::new("u1", "Ana"));
        assert_eq!(identity.current_user().unwrap().display_name, "Ana");

        identity.sign_out();
        assert!(identity.current_user().is_none());
    }

    #[test]
    fn test_auth_transitions_are_observed() {
        let identity = LocalIdentity::new();
        let transitions = Arc::new(AtomicUsize::new(0));
        let transitions_cb = transitions.clone();

        let sub = identity.subscribe(Box::new(move |_| {
            transitions_cb.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(transitions.load(Ordering::SeqCst), 1, "initial state expected");

        identity.sign_in(UserProfile::new("u1", "Ana"));
        identity.sign_out();
        assert_eq!(transitions.load(Ordering::SeqCst), 3);

        drop(sub);
        identity.sign_in(UserProfile::new("u2", "Bia"));
        assert_eq!(transitions.load(Ordering::SeqCst), 3);
    }
}
