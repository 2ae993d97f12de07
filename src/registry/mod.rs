pub mod community;
pub mod competitions;
pub mod donations;
pub mod live;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::ids::{CommentId, Minter, UserId};

pub use community::CommunityStore;
pub use competitions::CompetitionStore;
pub use donations::DonationLedger;
pub use live::LiveStore;

/// Chat line on a competition or live stream. A comment with an empty
/// message and an emoji is a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub emoji: Option<String>,
}

impl Comment {
    pub fn is_reaction(&self) -> bool {
        self.message.is_empty() && self.emoji.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub emoji: Option<String>,
}

impl NewComment {
    pub fn text(user_id: UserId, username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            message: message.into(),
            emoji: None,
        }
    }

    pub fn reaction(user_id: UserId, username: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            message: String::new(),
            emoji: Some(emoji.into()),
        }
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Stamp id and time. Rejects a comment that says nothing at all.
    pub(crate) fn into_comment(self, minter: &Minter) -> AppResult<Comment> {
        if self.message.trim().is_empty() && self.emoji.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::Validation("comment has neither text nor emoji".into()));
        }
        Ok(Comment {
            id: minter.mint(),
            user_id: self.user_id,
            username: self.username,
            message: self.message,
            sent_at: minter.now(),
            emoji: self.emoji,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_has_no_message() {
        let minter = Minter::system();
        let c = NewComment::reaction(UserId::new("1"), "fan", "🔥")
            .into_comment(&minter)
            .unwrap();
        assert!(c.is_reaction());

        let c = NewComment::text(UserId::new("1"), "fan", "wow")
            .with_emoji("🎤")
            .into_comment(&minter)
            .unwrap();
        assert!(!c.is_reaction());
    }

    #[test]
    fn empty_comment_is_rejected() {
        let minter = Minter::system();
        let err = NewComment::text(UserId::new("1"), "fan", "  ")
            .into_comment(&minter)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = NewComment::reaction(UserId::new("1"), "fan", "")
            .into_comment(&minter)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
