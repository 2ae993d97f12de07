use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::ids::{CommentId, CompetitionId, Minter, ParticipantId, UserId};
use crate::registry::{Comment, NewComment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Live,
    Voting,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub username: String,
    pub avatar: String,
    pub votes: u64,
    pub is_live: bool,
    pub stream_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipant {
    pub id: ParticipantId,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub status: CompetitionStatus,
    pub participants: Vec<Participant>,
    pub max_participants: usize,
    pub time_left: String,
    pub prize: String,
    pub current_round: String,
    pub viewers: u64,
    pub comments: Vec<Comment>,
    pub start_time: Option<DateTime<Utc>>,
    pub requirements: Option<String>,
}

impl Competition {
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    fn participant_mut(&mut self, id: &ParticipantId) -> AppResult<&mut Participant> {
        let competition = self.id.clone();
        self.participants
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| {
                AppError::NotFound(format!("participant {} in competition {}", id, competition))
            })
    }
}

pub struct CompetitionStore {
    competitions: Vec<Competition>,
    minter: Minter,
    revision: u64,
}

impl CompetitionStore {
    pub fn new(minter: Minter) -> Self {
        Self {
            competitions: Vec::new(),
            minter,
            revision: 0,
        }
    }

    pub fn seeded(minter: Minter) -> Self {
        let now = minter.now();
        let mut store = Self::new(minter);

        let participant = |id: &str, username: &str, avatar: &str, votes, stream: Option<&str>| {
            Participant {
                id: ParticipantId::new(id),
                username: username.into(),
                avatar: avatar.into(),
                votes,
                is_live: stream.is_some(),
                stream_handle: stream.map(String::from),
            }
        };
        let comment = |id: &str, user: &str, username: &str, message: &str, ago, emoji: Option<&str>| {
            Comment {
                id: CommentId::new(id),
                user_id: UserId::new(user),
                username: username.into(),
                message: message.into(),
                sent_at: now - Duration::seconds(ago),
                emoji: emoji.map(String::from),
            }
        };

        store.competitions = vec![
            Competition {
                id: CompetitionId::new("1"),
                title: "Freestyle Friday Battle".into(),
                description: "Batalla de freestyle en español con temática libre".into(),
                genre: "Hip Hop".into(),
                status: CompetitionStatus::Live,
                participants: vec![
                    participant("p-1", "MC Flow", "MF", 340, Some("stream1")),
                    participant("p-2", "Rima Real", "RR", 287, Some("stream2")),
                    participant("p-3", "Beat Master", "BM", 156, None),
                    participant("p-4", "Verso Libre", "VL", 98, None),
                ],
                max_participants: 8,
                time_left: "05:23".into(),
                prize: "$500".into(),
                current_round: "Semifinal".into(),
                viewers: 2847,
                comments: vec![
                    comment("1", "fan-1", "FanMusic", "¡Increíble batalla!", 1, Some("🔥")),
                    comment("2", "fan-2", "HipHopLover", "MC Flow está dominando", 2, None),
                    comment("3", "fan-3", "BeatFan", "Que nivel tan alto", 3, Some("🎤")),
                ],
                start_time: None,
                requirements: None,
            },
            Competition {
                id: CompetitionId::new("2"),
                title: "Acoustic Guitar Showcase".into(),
                description: "Muestra tu técnica con guitarra acústica".into(),
                genre: "Acoustic".into(),
                status: CompetitionStatus::Voting,
                participants: vec![
                    participant("p-5", "Guitar Hero", "GH", 523, None),
                    participant("p-6", "String Magic", "SM", 445, None),
                    participant("p-7", "Chord Master", "CM", 398, None),
                    participant("p-8", "Melody Maker", "MM", 287, None),
                ],
                max_participants: 15,
                time_left: "12:45".into(),
                prize: "$300".into(),
                current_round: "Fase de Votación".into(),
                viewers: 1523,
                comments: Vec::new(),
                start_time: None,
                requirements: None,
            },
        ];

        store
    }

    /// Add a competition as-is. Ids must be unique.
    pub fn insert(&mut self, competition: Competition) -> AppResult<()> {
        if self.get(&competition.id).is_some() {
            return Err(AppError::Conflict(format!(
                "competition {} already exists",
                competition.id
            )));
        }
        self.competitions.push(competition);
        self.revision += 1;
        Ok(())
    }

    fn find_mut(&mut self, id: &CompetitionId) -> AppResult<&mut Competition> {
        self.competitions
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| AppError::not_found("competition", id))
    }

    pub fn add_comment(&mut self, id: &CompetitionId, comment: NewComment) -> AppResult<Comment> {
        let comment = comment.into_comment(&self.minter)?;
        self.find_mut(id)?.comments.push(comment.clone());
        self.revision += 1;
        Ok(comment)
    }

    pub fn add_reaction(
        &mut self,
        id: &CompetitionId,
        user_id: UserId,
        username: &str,
        emoji: &str,
    ) -> AppResult<Comment> {
        self.add_comment(id, NewComment::reaction(user_id, username, emoji))
    }

    /// Enter a participant with no votes, offline. Fails once the
    /// competition is at capacity or when the id is already entered.
    pub fn join(&mut self, id: &CompetitionId, entrant: NewParticipant) -> AppResult<Competition> {
        let competition = self.find_mut(id)?;

        if competition.is_full() {
            tracing::warn!("{} tried to join full competition {}", entrant.username, id);
            return Err(AppError::CapacityReached {
                competition: id.to_string(),
                max: competition.max_participants,
            });
        }
        if competition.participant(&entrant.id).is_some() {
            return Err(AppError::Conflict(format!(
                "participant {} already in competition {}",
                entrant.id, id
            )));
        }

        competition.participants.push(Participant {
            id: entrant.id,
            username: entrant.username,
            avatar: entrant.avatar,
            votes: 0,
            is_live: false,
            stream_handle: None,
        });
        let snapshot = competition.clone();
        self.revision += 1;
        tracing::info!(
            "Competition {} now has {}/{} participants",
            id,
            snapshot.participants.len(),
            snapshot.max_participants
        );
        Ok(snapshot)
    }

    /// One more vote for one participant
    pub fn vote(&mut self, id: &CompetitionId, participant: &ParticipantId) -> AppResult<Participant> {
        let participant = self.find_mut(id)?.participant_mut(participant)?;
        participant.votes += 1;
        let snapshot = participant.clone();
        self.revision += 1;
        Ok(snapshot)
    }

    pub fn start_stream(
        &mut self,
        id: &CompetitionId,
        participant: &ParticipantId,
        stream_handle: &str,
    ) -> AppResult<Participant> {
        let participant = self.find_mut(id)?.participant_mut(participant)?;
        participant.is_live = true;
        participant.stream_handle = Some(stream_handle.to_string());
        let snapshot = participant.clone();
        self.revision += 1;
        tracing::info!("{} is streaming in competition {}", snapshot.username, id);
        Ok(snapshot)
    }

    pub fn stop_stream(&mut self, id: &CompetitionId, participant: &ParticipantId) -> AppResult<Participant> {
        let participant = self.find_mut(id)?.participant_mut(participant)?;
        participant.is_live = false;
        participant.stream_handle = None;
        let snapshot = participant.clone();
        self.revision += 1;
        tracing::info!("{} stopped streaming in competition {}", snapshot.username, id);
        Ok(snapshot)
    }

    /// Participants by votes, most first; ties keep entry order
    pub fn leaderboard(&self, id: &CompetitionId) -> AppResult<Vec<Participant>> {
        let competition = self
            .get(id)
            .ok_or_else(|| AppError::not_found("competition", id))?;
        let mut ranked = competition.participants.clone();
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        Ok(ranked)
    }

    pub fn get(&self, id: &CompetitionId) -> Option<&Competition> {
        self.competitions.iter().find(|c| &c.id == id)
    }

    pub fn list(&self) -> &[Competition] {
        &self.competitions
    }

    pub fn by_status(&self, status: CompetitionStatus) -> Vec<&Competition> {
        self.competitions
            .iter()
            .filter(|c| c.status == status)
            .collect()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
