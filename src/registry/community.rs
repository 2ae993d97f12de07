use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::ids::{FeedPostId, Minter, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    /// `@handle`
    pub username: String,
    /// Initials shown in place of a picture
    pub avatar: String,
    pub verified: bool,
    pub followers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedContent {
    Music {
        text: String,
        audio_title: Option<String>,
        duration: Option<String>,
        genre: String,
    },
    Video {
        text: String,
        video_title: String,
        duration: Option<String>,
        genre: String,
    },
    Competition {
        text: String,
        battle_title: String,
        rank: String,
        genre: String,
    },
}

impl FeedContent {
    pub fn text(&self) -> &str {
        match self {
            Self::Music { text, .. } | Self::Video { text, .. } | Self::Competition { text, .. } => {
                text
            }
        }
    }

    pub fn genre(&self) -> &str {
        match self {
            Self::Music { genre, .. }
            | Self::Video { genre, .. }
            | Self::Competition { genre, .. } => genre,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStats {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: FeedPostId,
    pub author: Author,
    pub content: FeedContent,
    pub stats: PostStats,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub name: String,
    pub posts: u64,
}

/// A suggested artist as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedArtist {
    pub artist: Author,
    pub is_following: bool,
}

/// "12.5K"-style rendering of a follower or post count.
pub fn format_compact(n: u64) -> String {
    fn scaled(n: u64, unit: u64, suffix: &str) -> String {
        let tenths = n / (unit / 10);
        if tenths % 10 == 0 {
            format!("{}{}", tenths / 10, suffix)
        } else {
            format!("{}.{}{}", tenths / 10, tenths % 10, suffix)
        }
    }

    match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => scaled(n, 1_000, "K"),
        _ => scaled(n, 1_000_000, "M"),
    }
}

/// Feed posts, trending topics, suggested artists and who follows whom.
pub struct CommunityStore {
    posts: Vec<FeedPost>,
    trending: Vec<TrendingTopic>,
    suggested: Vec<Author>,
    follows: HashSet<(UserId, UserId)>,
    minter: Minter,
    revision: u64,
}

impl CommunityStore {
    pub fn new(minter: Minter) -> Self {
        Self {
            posts: Vec::new(),
            trending: Vec::new(),
            suggested: Vec::new(),
            follows: HashSet::new(),
            minter,
            revision: 0,
        }
    }

    pub fn seeded(minter: Minter) -> Self {
        let now = minter.now();
        let mut store = Self::new(minter);

        let author = |id: &str, name: &str, handle: &str, avatar: &str, verified, followers| Author {
            id: UserId::new(id),
            name: name.into(),
            username: handle.into(),
            avatar: avatar.into(),
            verified,
            followers,
        };

        store.posts = vec![
            FeedPost {
                id: FeedPostId::new("1"),
                author: author("artist-1", "María González", "@mariasings", "MG", true, 12_500),
                content: FeedContent::Music {
                    text: "Nueva canción que escribí anoche 🎵 ¿Qué opinan?".into(),
                    audio_title: Some("Corazón de Fuego".into()),
                    duration: Some("3:42".into()),
                    genre: "Pop Latino".into(),
                },
                stats: PostStats {
                    likes: 1847,
                    comments: 234,
                    shares: 89,
                    is_liked: false,
                },
                created_at: now - Duration::hours(2),
            },
            FeedPost {
                id: FeedPostId::new("2"),
                author: author("artist-2", "DJ Carlos Beat", "@carlosbeat", "CB", true, 25_800),
                content: FeedContent::Video {
                    text: "Live remix session desde mi estudio 🔥".into(),
                    video_title: "Electronic Fusion Live".into(),
                    duration: Some("15:32".into()),
                    genre: "Electronic".into(),
                },
                stats: PostStats {
                    likes: 3241,
                    comments: 567,
                    shares: 156,
                    is_liked: false,
                },
                created_at: now - Duration::hours(4),
            },
            FeedPost {
                id: FeedPostId::new("3"),
                author: author("artist-3", "Ana Vocalist", "@anavocals", "AV", false, 8_200),
                content: FeedContent::Competition {
                    text: "¡Acabo de ganar la batalla de R&B! 🏆 Gracias por votar".into(),
                    battle_title: "R&B Vocal Battle #145".into(),
                    rank: "1er Lugar".into(),
                    genre: "R&B".into(),
                },
                stats: PostStats {
                    likes: 892,
                    comments: 134,
                    shares: 45,
                    is_liked: false,
                },
                created_at: now - Duration::hours(6),
            },
        ];

        store.trending = [
            ("#FreestyleFriday", 2_300),
            ("#AcousticChallenge", 1_800),
            ("#LatinVibes", 1_500),
            ("#ElectronicNights", 1_200),
            ("#VocalPower", 890),
        ]
        .into_iter()
        .map(|(name, posts)| TrendingTopic {
            name: name.into(),
            posts,
        })
        .collect();

        store.suggested = vec![
            author("artist-4", "Luis Rapper", "@luisrap", "LR", false, 18_500),
            author("artist-5", "Sofia Jazz", "@sofiajazz", "SJ", true, 15_200),
            author("artist-6", "Rock Band XYZ", "@rockxyz", "RB", true, 22_100),
        ];

        store
    }

    fn find_mut(&mut self, id: &FeedPostId) -> AppResult<&mut FeedPost> {
        self.posts
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| AppError::not_found("feed post", id))
    }

    /// Flip the like flag, moving the counter with it.
    pub fn like_post(&mut self, id: &FeedPostId) -> AppResult<FeedPost> {
        let post = self.find_mut(id)?;
        if post.stats.is_liked {
            post.stats.likes = post.stats.likes.saturating_sub(1);
            post.stats.is_liked = false;
        } else {
            post.stats.likes += 1;
            post.stats.is_liked = true;
        }
        let snapshot = post.clone();
        self.revision += 1;
        Ok(snapshot)
    }

    pub fn share_post(&mut self, id: &FeedPostId) -> AppResult<FeedPost> {
        let post = self.find_mut(id)?;
        post.stats.shares += 1;
        let snapshot = post.clone();
        self.revision += 1;
        Ok(snapshot)
    }

    /// Count a comment. Comment bodies are not kept for feed posts.
    pub fn comment_on_post(&mut self, id: &FeedPostId) -> AppResult<FeedPost> {
        let post = self.find_mut(id)?;
        post.stats.comments += 1;
        let snapshot = post.clone();
        self.revision += 1;
        Ok(snapshot)
    }

    /// Publish a music post at the top of the feed.
    pub fn create_post(&mut self, author_id: UserId, name: &str, text: &str) -> AppResult<FeedPost> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("post text is empty".into()));
        }

        let post = FeedPost {
            id: self.minter.mint(),
            author: Author {
                id: author_id,
                name: name.to_string(),
                username: format!("@{}", name.to_lowercase()),
                avatar: name.chars().take(2).collect::<String>().to_uppercase(),
                verified: false,
                followers: 0,
            },
            content: FeedContent::Music {
                text: text.to_string(),
                audio_title: None,
                duration: None,
                genre: "General".into(),
            },
            stats: PostStats::default(),
            created_at: self.minter.now(),
        };

        self.posts.insert(0, post.clone());
        self.revision += 1;
        tracing::info!("Feed post {} by {}", post.id, post.author.username);
        Ok(post)
    }

    fn is_known_artist(&self, id: &UserId) -> bool {
        self.posts.iter().any(|p| &p.author.id == id) || self.suggested.iter().any(|a| &a.id == id)
    }

    /// Follow or unfollow `artist` on behalf of `viewer`. Returns whether
    /// `viewer` now follows `artist`.
    pub fn toggle_follow(&mut self, viewer: &UserId, artist: &UserId) -> AppResult<bool> {
        if viewer == artist {
            return Err(AppError::Validation("cannot follow yourself".into()));
        }
        if !self.is_known_artist(artist) {
            return Err(AppError::not_found("artist", artist));
        }

        let pair = (viewer.clone(), artist.clone());
        let following = if self.follows.remove(&pair) {
            false
        } else {
            self.follows.insert(pair);
            true
        };

        self.revision += 1;
        tracing::debug!("{} follows {}: {}", viewer, artist, following);
        Ok(following)
    }

    pub fn is_following(&self, viewer: &UserId, artist: &UserId) -> bool {
        self.follows.contains(&(viewer.clone(), artist.clone()))
    }

    pub fn suggested_artists(&self, viewer: Option<&UserId>) -> Vec<SuggestedArtist> {
        self.suggested
            .iter()
            .map(|artist| SuggestedArtist {
                artist: artist.clone(),
                is_following: viewer.is_some_and(|v| self.is_following(v, &artist.id)),
            })
            .collect()
    }

    pub fn get(&self, id: &FeedPostId) -> Option<&FeedPost> {
        self.posts.iter().find(|p| &p.id == id)
    }

    /// Newest first
    pub fn posts(&self) -> &[FeedPost] {
        &self.posts
    }

    pub fn trending_topics(&self) -> &[TrendingTopic] {
        &self.trending
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
