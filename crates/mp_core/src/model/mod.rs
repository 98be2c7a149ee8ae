pub mod feed;
pub mod ledger;
pub mod matches;
pub mod user;

pub use feed::{Post, PostKind};
pub use ledger::PointRecord;
pub use matches::{Match, MatchDraft, MatchStatus, Outcome, RosterEntry};
pub use user::UserProfile;
