use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::IdStrategy;

macro_rules! string_id {
    ($($(#[$meta:meta])* $name:ident;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub String);

            impl $name {
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<String> for $name {
                fn from(id: String) -> Self {
                    Self(id)
                }
            }

            impl From<&str> for $name {
                fn from(id: &str) -> Self {
                    Self(id.to_string())
                }
            }
        )+
    };
}

string_id! {
    /// Identity (user profile) id.
    UserId;
    /// Profile post id.
    PostId;
    /// Community feed post id.
    FeedPostId;
    CompetitionId;
    ParticipantId;
    StreamId;
    /// Shared by competition and live-stream comments (and reactions).
    CommentId;
    DonationId;
    RecordingId;
}

/// Produces fresh, unique entity ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDs; unique even for back-to-back calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Ids;

impl IdGenerator for UuidV7Ids {
    fn next_id(&self) -> String {
        uuid::Uuid::now_v7().to_string()
    }
}

/// Monotonic counter ids (`<prefix>-1`, `<prefix>-2`, ...). The prefix keeps
/// them apart from the plain numeric ids used by seed data.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::with_prefix("seq")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Id generator and clock bundled together, shared by every store so that
/// all entities created in one process draw from the same sequence.
#[derive(Clone)]
pub struct Minter {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Minter {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(UuidV7Ids), Arc::new(SystemClock))
    }

    pub fn from_strategy(strategy: IdStrategy) -> Self {
        let ids: Arc<dyn IdGenerator> = match strategy {
            IdStrategy::UuidV7 => Arc::new(UuidV7Ids),
            IdStrategy::Sequential => Arc::new(SequentialIds::default()),
        };
        Self::new(ids, Arc::new(SystemClock))
    }

    pub fn mint<T: From<String>>(&self) -> T {
        T::from(self.ids.next_id())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl fmt::Debug for Minter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Minter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_unique_back_to_back() {
        let ids = UuidV7Ids;
        let seen: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::with_prefix("post");
        assert_eq!(ids.next_id(), "post-1");
        assert_eq!(ids.next_id(), "post-2");
        assert_eq!(ids.next_id(), "post-3");
    }

    #[test]
    fn minter_mints_typed_ids() {
        let minter = Minter::new(Arc::new(SequentialIds::default()), Arc::new(SystemClock));
        let a: PostId = minter.mint();
        let b: DonationId = minter.mint();
        assert_eq!(a.as_str(), "seq-1");
        assert_eq!(b.as_str(), "seq-2");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = UserId::new("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        let back: UserId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn from_strategy_picks_generator() {
        let minter = Minter::from_strategy(IdStrategy::Sequential);
        let id: StreamId = minter.mint();
        assert!(id.as_str().starts_with("seq-"));

        let minter = Minter::from_strategy(IdStrategy::UuidV7);
        let id: StreamId = minter.mint();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }
}
