//! # mp_core - Match Lifecycle and Scoring Engine
//!
//! This library organizes recurring sport sessions for a small group:
//! scheduling matches, tracking attendance commitments, converting outcomes
//! into an append-only point ledger, and deriving a ranking from it.
//!
//! ## Shape
//! - Roster rules live on the model types; the store applies them atomically
//! - Finalization commits the status flip and the ledger writes in one
//!   transaction, so a retry can never double-award points
//! - Rankings are a pure reduction over the ledger, recomputed in full
//! - Identity and storage are collaborators behind narrow traits, with
//!   in-process implementations shipped for the CLI and for tests

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod finalize;
pub mod identity;
pub mod model;
pub mod presence;
pub mod ranking;
pub mod snapshot;
pub mod store;

pub use api::{Matchpoint, RankingObserver};
pub use config::{AppConfig, Environment, ScoringRules};
pub use error::{CoreError, Result};
pub use feed::FeedBoard;
pub use finalize::{FinalizationEngine, FinalizationSummary};
pub use identity::{IdentityProvider, LocalIdentity};
pub use model::{
    Match, MatchDraft, MatchStatus, Outcome, PointRecord, Post, PostKind, RosterEntry,
    UserProfile,
};
pub use presence::PresenceManager;
pub use ranking::{aggregate, RankingRow, RankingWindow};
pub use snapshot::{snapshot_to_json, SnapshotError, SnapshotFile, StoreSnapshot, SNAPSHOT_VERSION};
pub use store::{MemoryStore, Store, Subscription};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
