use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::ids::{CommentId, Minter, RecordingId, StreamId, UserId};
use crate::registry::{Comment, NewComment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStream {
    pub id: StreamId,
    pub title: String,
    pub description: String,
    pub user_id: UserId,
    pub username: String,
    pub genre: String,
    pub is_live: bool,
    pub started_at: DateTime<Utc>,
    pub viewers: u64,
    pub comments: Vec<Comment>,
    pub audio_url: Option<String>,
    pub recording_id: Option<RecordingId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStream {
    pub title: String,
    pub description: String,
    pub user_id: UserId,
    pub username: String,
    pub genre: String,
    pub audio_url: Option<String>,
    pub recording_id: Option<RecordingId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub audio_url: Option<String>,
    pub duration_secs: u32,
    pub recorded_at: DateTime<Utc>,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecording {
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub audio_url: Option<String>,
    pub duration_secs: u32,
    pub is_public: bool,
}

/// Live streams and saved recordings.
pub struct LiveStore {
    streams: Vec<LiveStream>,
    recordings: Vec<Recording>,
    minter: Minter,
    revision: u64,
}

impl LiveStore {
    pub fn new(minter: Minter) -> Self {
        Self {
            streams: Vec::new(),
            recordings: Vec::new(),
            minter,
            revision: 0,
        }
    }

    pub fn seeded(minter: Minter) -> Self {
        let now = minter.now();
        let mut store = Self::new(minter);

        let chat = |id: &str, user: &str, username: &str, message: &str, ago, emoji: Option<&str>| {
            Comment {
                id: CommentId::new(id),
                user_id: UserId::new(user),
                username: username.into(),
                message: message.into(),
                sent_at: now - Duration::seconds(ago),
                emoji: emoji.map(String::from),
            }
        };

        store.streams.push(LiveStream {
            id: StreamId::new("1"),
            title: "Acoustic Session Live".into(),
            description: "Tocando mis canciones favoritas en vivo".into(),
            user_id: UserId::new("artist-7"),
            username: "AcousticSam".into(),
            genre: "Acoustic".into(),
            is_live: true,
            started_at: now - Duration::hours(1),
            viewers: 245,
            comments: vec![
                chat("1", "fan-2", "MusicFan", "¡Suena increíble!", 1, Some("🎵")),
                chat("2", "fan-3", "GuitarLover", "Que técnica tan buena", 2, None),
                chat("3", "fan-4", "NewFan", "Primera vez aquí, me encanta", 3, Some("❤️")),
            ],
            audio_url: None,
            recording_id: None,
        });

        store
    }

    fn find_mut(&mut self, id: &StreamId) -> AppResult<&mut LiveStream> {
        self.streams
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| AppError::not_found("stream", id))
    }

    /// Go live now with no viewers and an empty chat
    pub fn create_stream(&mut self, stream: NewStream) -> AppResult<LiveStream> {
        if stream.title.trim().is_empty() {
            return Err(AppError::Validation("stream title is empty".into()));
        }

        let stream = LiveStream {
            id: self.minter.mint(),
            title: stream.title,
            description: stream.description,
            user_id: stream.user_id,
            username: stream.username,
            genre: stream.genre,
            is_live: true,
            started_at: self.minter.now(),
            viewers: 0,
            comments: Vec::new(),
            audio_url: stream.audio_url,
            recording_id: stream.recording_id,
        };

        self.streams.push(stream.clone());
        self.revision += 1;
        tracing::info!("{} went live: {} ({})", stream.username, stream.title, stream.id);
        Ok(stream)
    }

    pub fn end_stream(&mut self, id: &StreamId) -> AppResult<LiveStream> {
        let stream = self.find_mut(id)?;
        stream.is_live = false;
        let snapshot = stream.clone();
        self.revision += 1;
        tracing::info!("Stream {} ended with {} viewers", id, snapshot.viewers);
        Ok(snapshot)
    }

    pub fn add_comment(&mut self, id: &StreamId, comment: NewComment) -> AppResult<Comment> {
        let comment = comment.into_comment(&self.minter)?;
        self.find_mut(id)?.comments.push(comment.clone());
        self.revision += 1;
        Ok(comment)
    }

    pub fn add_reaction(
        &mut self,
        id: &StreamId,
        user_id: UserId,
        username: &str,
        emoji: &str,
    ) -> AppResult<Comment> {
        self.add_comment(id, NewComment::reaction(user_id, username, emoji))
    }

    /// Returns the new viewer count
    pub fn increment_viewers(&mut self, id: &StreamId) -> AppResult<u64> {
        let stream = self.find_mut(id)?;
        stream.viewers += 1;
        let viewers = stream.viewers;
        self.revision += 1;
        Ok(viewers)
    }

    /// Returns the new viewer count; never goes below zero
    pub fn decrement_viewers(&mut self, id: &StreamId) -> AppResult<u64> {
        let stream = self.find_mut(id)?;
        if stream.viewers == 0 {
            return Ok(0);
        }
        stream.viewers -= 1;
        let viewers = stream.viewers;
        self.revision += 1;
        Ok(viewers)
    }

    pub fn save_recording(&mut self, recording: NewRecording) -> AppResult<Recording> {
        let recording = Recording {
            id: self.minter.mint(),
            user_id: recording.user_id,
            title: recording.title,
            description: recording.description,
            audio_url: recording.audio_url,
            duration_secs: recording.duration_secs,
            recorded_at: self.minter.now(),
            is_public: recording.is_public,
        };
        self.recordings.push(recording.clone());
        self.revision += 1;
        tracing::info!("Saved recording {} for {}", recording.id, recording.user_id);
        Ok(recording)
    }

    pub fn user_recordings(&self, user_id: &UserId) -> Vec<Recording> {
        self.recordings
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn public_recordings(&self) -> Vec<Recording> {
        self.recordings.iter().filter(|r| r.is_public).cloned().collect()
    }

    pub fn recording(&self, id: &RecordingId) -> Option<&Recording> {
        self.recordings.iter().find(|r| &r.id == id)
    }

    pub fn get(&self, id: &StreamId) -> Option<&LiveStream> {
        self.streams.iter().find(|s| &s.id == id)
    }

    pub fn streams(&self) -> &[LiveStream] {
        &self.streams
    }

    pub fn live_streams(&self) -> Vec<&LiveStream> {
        self.streams.iter().filter(|s| s.is_live).collect()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LiveStore {
        LiveStore::seeded(Minter::system())
    }

    fn new_stream(user: &str) -> NewStream {
        NewStream {
            title: "Late night jam".into(),
            description: "Improvisando".into(),
            user_id: UserId::new(user),
            username: "jammer".into(),
            genre: "Jazz".into(),
            audio_url: None,
            recording_id: None,
        }
    }

    fn new_recording(user: &str, public: bool) -> NewRecording {
        NewRecording {
            user_id: UserId::new(user),
            title: "Demo".into(),
            description: String::new(),
            audio_url: Some("blob:demo".into()),
            duration_secs: 95,
            is_public: public,
        }
    }

    #[test]
    fn seed_has_one_live_stream() {
        let store = store();
        assert_eq!(store.live_streams().len(), 1);
        let seeded = store.get(&StreamId::new("1")).unwrap();
        assert_eq!(seeded.comments.len(), 3);
        assert_eq!(seeded.user_id, UserId::new("artist-7"));
    }

    #[test]
    fn create_then_end_stream() {
        let mut store = store();
        let stream = store.create_stream(new_stream("9")).unwrap();
        assert!(stream.is_live);
        assert_eq!(stream.viewers, 0);
        assert!(stream.comments.is_empty());
        assert_eq!(store.live_streams().len(), 2);

        let ended = store.end_stream(&stream.id).unwrap();
        assert!(!ended.is_live);
        assert_eq!(store.live_streams().len(), 1);
        assert_eq!(store.streams().len(), 2);
    }

    #[test]
    fn untitled_stream_is_rejected() {
        let mut store = store();
        let mut stream = new_stream("9");
        stream.title = " ".into();
        assert!(matches!(
            store.create_stream(stream),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn end_unknown_stream_fails() {
        let mut store = store();
        assert!(matches!(
            store.end_stream(&StreamId::new("x")),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn viewers_never_go_negative() {
        let mut store = store();
        let stream = store.create_stream(new_stream("9")).unwrap();
        assert_eq!(store.decrement_viewers(&stream.id).unwrap(), 0);
        assert_eq!(store.increment_viewers(&stream.id).unwrap(), 1);
        assert_eq!(store.increment_viewers(&stream.id).unwrap(), 2);
        assert_eq!(store.decrement_viewers(&stream.id).unwrap(), 1);
        assert_eq!(store.decrement_viewers(&stream.id).unwrap(), 0);
        assert_eq!(store.decrement_viewers(&stream.id).unwrap(), 0);
    }

    #[test]
    fn viewer_change_on_unknown_stream_fails() {
        let mut store = store();
        assert!(store.increment_viewers(&StreamId::new("x")).is_err());
        assert!(store.decrement_viewers(&StreamId::new("x")).is_err());
    }

    #[test]
    fn chat_and_reactions() {
        let mut store = store();
        let id = StreamId::new("1");
        let c = store
            .add_comment(&id, NewComment::text(UserId::new("5"), "fan", "otra!"))
            .unwrap();
        assert!(!c.is_reaction());
        let r = store.add_reaction(&id, UserId::new("5"), "fan", "🎸").unwrap();
        assert!(r.is_reaction());
        assert_eq!(store.get(&id).unwrap().comments.len(), 5);
    }

    #[test]
    fn recordings_filter_by_owner_and_visibility() {
        let mut store = store();
        store.save_recording(new_recording("1", true)).unwrap();
        store.save_recording(new_recording("1", false)).unwrap();
        let other = store.save_recording(new_recording("2", true)).unwrap();

        assert_eq!(store.user_recordings(&UserId::new("1")).len(), 2);
        assert_eq!(store.public_recordings().len(), 2);
        assert_eq!(store.recording(&other.id).unwrap().user_id, UserId::new("2"));
    }
}
