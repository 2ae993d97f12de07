use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PostId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub followers: u64,
    pub following: u64,
}

/// Profile fields plus secret, as submitted on the sign-up form.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub secret: String,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            name: name.into(),
            avatar: None,
            bio: None,
            secret: secret.into(),
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// What a profile post points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostMedia {
    Image { url: String },
    Video { url: String },
    Link { url: String },
}

impl PostMedia {
    pub fn url(&self) -> &str {
        match self {
            Self::Image { url } | Self::Video { url } | Self::Link { url } => url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Link { .. } => "link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePost {
    pub id: PostId,
    pub user_id: UserId,
    pub media: PostMedia,
    pub title: String,
    pub description: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Caller-supplied part of a profile post; id, owner, counters and
/// timestamp are stamped by the session store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub media: PostMedia,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}
