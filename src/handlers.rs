//! User intents. Each handler runs one store operation, then tells the user
//! how it went and moves them to the next screen.

use crate::capabilities::{MediaKind, Notice, Route, StreamHandle};
use crate::error::{AppError, AppResult};
use crate::ids::{CompetitionId, ParticipantId, RecordingId, StreamId, UserId};
use crate::models::{Identity, NewPost, PostMedia, ProfilePost, Registration};
use crate::registry::community::FeedPost;
use crate::registry::competitions::{Competition, NewParticipant, Participant};
use crate::registry::donations::{Amount, Donation, DonationKind, Party};
use crate::registry::live::{LiveStream, NewStream};
use crate::registry::Comment;
use crate::state::AppState;

// -- Helpers --

fn notify(state: &AppState, notice: Notice) {
    state.collaborators.notifier.notify(notice);
}

fn navigate(state: &AppState, route: Route) {
    state.collaborators.navigator.navigate(route);
}

/// Current identity, or a notice plus `Unauthorized`
fn require_identity(state: &AppState, action: &str) -> AppResult<Identity> {
    match state.session.current() {
        Some(identity) => Ok(identity.clone()),
        None => {
            notify(
                state,
                Notice::destructive("Login required", format!("Log in to {}.", action)),
            );
            Err(AppError::Unauthorized)
        }
    }
}

fn party(identity: &Identity) -> Party {
    Party::new(identity.id.clone(), identity.username.clone())
}

/// An identity competes under its own user id
fn as_participant(identity: &Identity) -> ParticipantId {
    ParticipantId::new(identity.id.as_str())
}

fn initials(name: &str) -> String {
    name.chars().take(2).collect::<String>().to_uppercase()
}

/// Split a comma list into trimmed, non-empty tags
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

// -- Session --

pub fn login(state: &mut AppState, email: &str, secret: &str) -> AppResult<Identity> {
    match state.session.login(email, secret) {
        Ok(identity) => {
            notify(
                state,
                Notice::success("Welcome back!", format!("Logged in as {}.", identity.name)),
            );
            navigate(state, Route::Home);
            Ok(identity)
        }
        Err(e) => {
            let description = match &e {
                AppError::InvalidCredentials => "Invalid email or password.".to_string(),
                other => other.to_string(),
            };
            notify(state, Notice::destructive("Login failed", description));
            Err(e)
        }
    }
}

pub fn register(state: &mut AppState, registration: Registration) -> AppResult<Identity> {
    match state.session.register(registration) {
        Ok(identity) => {
            notify(
                state,
                Notice::success(
                    "Account created",
                    format!("Welcome to MusicalArt, {}!", identity.name),
                ),
            );
            navigate(state, Route::Home);
            Ok(identity)
        }
        Err(e) => {
            let description = match &e {
                AppError::Conflict(_) => "That email is already registered.".to_string(),
                other => other.to_string(),
            };
            notify(state, Notice::destructive("Registration failed", description));
            Err(e)
        }
    }
}

pub fn logout(state: &mut AppState) -> AppResult<()> {
    state.session.logout()?;
    navigate(state, Route::Home);
    Ok(())
}

// -- Posts --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Image,
    Video,
    Link,
}

/// Raw input from the create-post form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub kind: PostKind,
    pub title: String,
    pub description: String,
    /// Image/video source or link target
    pub content: String,
    /// Comma separated
    pub tags: String,
}

pub fn create_post(state: &mut AppState, form: PostForm) -> AppResult<ProfilePost> {
    require_identity(state, "publish a post")?;

    let title = form.title.trim();
    let content = form.content.trim();
    if title.is_empty() || content.is_empty() {
        notify(
            state,
            Notice::destructive("Missing fields", "A post needs a title and content."),
        );
        return Err(AppError::Validation("post title and content are required".into()));
    }

    let url = content.to_string();
    let media = match form.kind {
        PostKind::Image => PostMedia::Image { url },
        PostKind::Video => PostMedia::Video { url },
        PostKind::Link => PostMedia::Link { url },
    };
    let description = Some(form.description.trim())
        .filter(|d| !d.is_empty())
        .map(String::from);

    let post = state.session.create_post(NewPost {
        media,
        title: title.to_string(),
        description,
        tags: parse_tags(&form.tags),
    })?;

    notify(
        state,
        Notice::success("Post published", format!("\"{}\" is on your profile.", post.title)),
    );
    navigate(state, Route::Profile);
    Ok(post)
}

/// Share a text post to the community feed as the current identity
pub fn post_to_feed(state: &mut AppState, text: &str) -> AppResult<FeedPost> {
    let identity = require_identity(state, "post to the community")?;
    let post = state
        .community
        .create_post(identity.id.clone(), &identity.name, text)?;
    notify(state, Notice::success("Posted", "Your post is live in the community."));
    Ok(post)
}

pub fn follow_artist(state: &mut AppState, artist: &UserId) -> AppResult<bool> {
    let identity = require_identity(state, "follow artists")?;
    state.community.toggle_follow(&identity.id, artist)
}

// -- Live --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamForm {
    pub title: String,
    pub description: String,
    pub genre: String,
}

/// Open the microphone and start a stream. Nothing is created when the
/// microphone is refused.
pub async fn go_live(
    state: &mut AppState,
    form: StreamForm,
) -> AppResult<(LiveStream, StreamHandle)> {
    let identity = require_identity(state, "go live")?;

    if form.title.trim().is_empty() {
        notify(state, Notice::destructive("Missing title", "Give your stream a title."));
        return Err(AppError::Validation("stream title is empty".into()));
    }

    let capture = state.collaborators.capture.clone();
    let handle = match capture.start(MediaKind::Audio).await {
        Ok(handle) => handle,
        Err(e) => {
            let description = match &e {
                AppError::PermissionDenied(_) => {
                    "Allow microphone access to go live.".to_string()
                }
                other => other.to_string(),
            };
            notify(state, Notice::destructive("Microphone unavailable", description));
            return Err(e);
        }
    };

    let created = state.live.create_stream(NewStream {
        title: form.title,
        description: form.description,
        user_id: identity.id,
        username: identity.username,
        genre: form.genre,
        audio_url: None,
        recording_id: None,
    });

    match created {
        Ok(stream) => {
            notify(
                state,
                Notice::success("You're live!", format!("\"{}\" has started.", stream.title)),
            );
            Ok((stream, handle))
        }
        Err(e) => {
            capture.stop(&handle).await?;
            Err(e)
        }
    }
}

/// End one of the current identity's streams and release its capture
pub async fn end_live(
    state: &mut AppState,
    stream_id: &StreamId,
    handle: &StreamHandle,
) -> AppResult<LiveStream> {
    let identity = require_identity(state, "end a stream")?;

    let owner = state
        .live
        .get(stream_id)
        .map(|s| s.user_id.clone())
        .ok_or_else(|| AppError::not_found("stream", stream_id))?;
    if owner != identity.id {
        return Err(AppError::PermissionDenied(format!(
            "stream {} belongs to another user",
            stream_id
        )));
    }

    // Release the microphone first so a failed release leaves the stream live
    let capture = state.collaborators.capture.clone();
    if let Err(e) = capture.stop(handle).await {
        notify(state, Notice::destructive("Microphone still on", e.to_string()));
        return Err(e);
    }

    let stream = state.live.end_stream(stream_id)?;
    notify(
        state,
        Notice::success("Stream ended", format!("{} viewers tuned in.", stream.viewers)),
    );
    Ok(stream)
}

pub async fn play_recording(state: &AppState, recording_id: &RecordingId) -> AppResult<()> {
    let recording = state
        .live
        .recording(recording_id)
        .ok_or_else(|| AppError::not_found("recording", recording_id))?;
    let url = recording
        .audio_url
        .clone()
        .ok_or_else(|| AppError::Validation(format!("recording {} has no audio", recording_id)))?;

    let playback = state.collaborators.playback.clone();
    if let Err(e) = playback.play(&url).await {
        notify(state, Notice::destructive("Playback failed", e.to_string()));
        return Err(e);
    }
    Ok(())
}

// -- Competitions --

/// Enter the current identity into a competition
pub fn join_competition(state: &mut AppState, id: &CompetitionId) -> AppResult<Competition> {
    let identity = require_identity(state, "join a competition")?;
    let entrant = NewParticipant {
        id: as_participant(&identity),
        username: identity.username.clone(),
        avatar: initials(&identity.name),
    };

    match state.competitions.join(id, entrant) {
        Ok(competition) => {
            notify(
                state,
                Notice::success("You're in!", format!("Joined {}.", competition.title)),
            );
            Ok(competition)
        }
        Err(e) => {
            let description = match &e {
                AppError::CapacityReached { max, .. } => {
                    format!("This competition is full ({} participants).", max)
                }
                AppError::Conflict(_) => "You already joined this competition.".to_string(),
                other => other.to_string(),
            };
            notify(state, Notice::destructive("Could not join", description));
            Err(e)
        }
    }
}

/// Open the camera and mark the current identity as live in a competition
pub async fn stream_in_competition(
    state: &mut AppState,
    id: &CompetitionId,
) -> AppResult<(Participant, StreamHandle)> {
    let identity = require_identity(state, "stream in a competition")?;
    let participant_id = as_participant(&identity);

    let competition = state
        .competitions
        .get(id)
        .ok_or_else(|| AppError::not_found("competition", id))?;
    if competition.participant(&participant_id).is_none() {
        notify(
            state,
            Notice::destructive("Not a participant", "Join the competition before streaming."),
        );
        return Err(AppError::PermissionDenied(format!(
            "{} is not competing in {}",
            identity.username, id
        )));
    }

    let capture = state.collaborators.capture.clone();
    let handle = match capture.start(MediaKind::Video).await {
        Ok(handle) => handle,
        Err(e) => {
            notify(state, Notice::destructive("Camera unavailable", e.to_string()));
            return Err(e);
        }
    };

    let participant = state
        .competitions
        .start_stream(id, &participant_id, &handle.id)?;
    notify(state, Notice::success("Streaming", "You're live in the competition."));
    Ok((participant, handle))
}

pub async fn leave_competition_stream(
    state: &mut AppState,
    id: &CompetitionId,
    handle: &StreamHandle,
) -> AppResult<Participant> {
    let identity = require_identity(state, "stop streaming")?;
    let participant_id = as_participant(&identity);
    if state
        .competitions
        .get(id)
        .and_then(|c| c.participant(&participant_id))
        .is_none()
    {
        return Err(AppError::not_found("participant", &participant_id));
    }

    let capture = state.collaborators.capture.clone();
    if let Err(e) = capture.stop(handle).await {
        notify(state, Notice::destructive("Camera still on", e.to_string()));
        return Err(e);
    }
    state.competitions.stop_stream(id, &participant_id)
}

// -- Donations --

pub fn donate(
    state: &mut AppState,
    to: Party,
    amount: Amount,
    message: &str,
) -> AppResult<Donation> {
    let identity = require_identity(state, "send a donation")?;

    match state
        .donations
        .create_donation(party(&identity), to, amount, message, DonationKind::Donation)
    {
        Ok(donation) => {
            notify(
                state,
                Notice::success(
                    "Donation sent!",
                    format!("You sent {} to {}.", donation.amount, donation.to.username),
                ),
            );
            Ok(donation)
        }
        Err(e) => {
            notify(state, Notice::destructive("Donation failed", e.to_string()));
            Err(e)
        }
    }
}

/// Post an emoji on a stream and tip the streamer the reaction amount
pub fn react_to_stream(
    state: &mut AppState,
    stream_id: &StreamId,
    emoji: &str,
) -> AppResult<(Comment, Donation)> {
    let identity = require_identity(state, "react")?;

    let streamer = state
        .live
        .get(stream_id)
        .map(|s| Party::new(s.user_id.clone(), s.username.clone()))
        .ok_or_else(|| AppError::not_found("stream", stream_id))?;

    let comment =
        state
            .live
            .add_reaction(stream_id, identity.id.clone(), &identity.username, emoji)?;
    let donation = state
        .donations
        .simulate_reaction(party(&identity), streamer, emoji)?;

    notify(
        state,
        Notice::success("Reaction sent", format!("{} {}", emoji, donation.amount)),
    );
    Ok((comment, donation))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::capabilities::{
        MediaCapture, MediaPlayback, NavigationLog, NoticeLevel, NoticeLog,
    };
    use crate::config::{Config, IdStrategy};
    use crate::registry::live::NewRecording;
    use crate::state::Collaborators;
    use crate::storage::MemoryStorage;

    #[derive(Default)]
    struct FakeCapture {
        started: Mutex<Vec<MediaKind>>,
        stopped: Mutex<Vec<String>>,
        deny: bool,
        fail_stop: bool,
    }

    #[async_trait]
    impl MediaCapture for FakeCapture {
        async fn start(&self, kind: MediaKind) -> AppResult<StreamHandle> {
            if self.deny {
                return Err(AppError::PermissionDenied("denied".into()));
            }
            let mut started = self.started.lock().unwrap();
            started.push(kind);
            Ok(StreamHandle {
                id: format!("handle-{}", started.len()),
                kind,
            })
        }

        async fn stop(&self, handle: &StreamHandle) -> AppResult<()> {
            if self.fail_stop {
                return Err(AppError::Internal("device busy".into()));
            }
            self.stopped.lock().unwrap().push(handle.id.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePlayback {
        played: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaPlayback for FakePlayback {
        async fn play(&self, url: &str) -> AppResult<()> {
            self.played.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct Harness {
        state: AppState,
        notices: Arc<NoticeLog>,
        routes: Arc<NavigationLog>,
        capture: Arc<FakeCapture>,
        playback: Arc<FakePlayback>,
    }

    fn harness_with(capture: FakeCapture) -> Harness {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config.ids.strategy = IdStrategy::Sequential;

        let notices = Arc::new(NoticeLog::new());
        let routes = Arc::new(NavigationLog::new());
        let capture = Arc::new(capture);
        let playback = Arc::new(FakePlayback::default());
        let collaborators = Collaborators {
            notifier: notices.clone(),
            navigator: routes.clone(),
            capture: capture.clone(),
            playback: playback.clone(),
        };
        let state =
            AppState::seeded(config, Arc::new(MemoryStorage::new()), collaborators).unwrap();

        Harness {
            state,
            notices,
            routes,
            capture,
            playback,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeCapture::default())
    }

    fn logged_in() -> Harness {
        let mut h = harness();
        login(&mut h.state, "musico@test.com", "test123").unwrap();
        h
    }

    fn form(title: &str, content: &str, tags: &str) -> PostForm {
        PostForm {
            kind: PostKind::Link,
            title: title.into(),
            description: String::new(),
            content: content.into(),
            tags: tags.into(),
        }
    }

    #[test]
    fn parse_tags_trims_and_drops_empties() {
        assert_eq!(parse_tags(" rock, , indie ,"), vec!["rock", "indie"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn login_success_welcomes_and_goes_home() {
        let mut h = harness();
        login(&mut h.state, "musico@test.com", "test123").unwrap();

        let notice = h.notices.last().unwrap();
        assert_eq!(notice.title, "Welcome back!");
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(h.routes.routes(), vec![Route::Home]);
    }

    #[test]
    fn login_failure_stays_put() {
        let mut h = harness();
        let err = login(&mut h.state, "musico@test.com", "nope").unwrap_err();

        assert!(matches!(err, AppError::InvalidCredentials));
        assert_eq!(h.notices.last().unwrap().level, NoticeLevel::Destructive);
        assert!(h.routes.routes().is_empty());
        assert!(h.state.session.current().is_none());
    }

    #[test]
    fn register_conflict_is_reported() {
        let mut h = harness();
        let dup = Registration::new("otro", "musico@test.com", "Otro", "pw");
        assert!(matches!(
            register(&mut h.state, dup),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(h.notices.last().unwrap().title, "Registration failed");
        assert!(h.routes.routes().is_empty());

        let fresh = Registration::new("nuevo", "nuevo@test.com", "Nuevo", "pw");
        register(&mut h.state, fresh).unwrap();
        assert_eq!(h.routes.routes(), vec![Route::Home]);
    }

    #[test]
    fn logout_goes_home() {
        let mut h = logged_in();
        logout(&mut h.state).unwrap();
        assert!(!h.state.session.is_authenticated());
        assert_eq!(h.routes.routes(), vec![Route::Home, Route::Home]);
    }

    #[test]
    fn create_post_requires_identity() {
        let mut h = harness();
        let before = h.state.session.posts().len();
        assert!(matches!(
            create_post(&mut h.state, form("t", "https://x", "")),
            Err(AppError::Unauthorized)
        ));
        assert_eq!(h.state.session.posts().len(), before);
        assert_eq!(h.notices.last().unwrap().level, NoticeLevel::Destructive);
    }

    #[test]
    fn create_post_requires_title_and_content() {
        let mut h = logged_in();
        assert!(matches!(
            create_post(&mut h.state, form("  ", "https://x", "")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_post(&mut h.state, form("t", "", "")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn create_post_publishes_and_goes_to_profile() {
        let mut h = logged_in();
        let post = create_post(
            &mut h.state,
            form("Nuevo single", "https://open.spotify.com/x", "pop, latin ,"),
        )
        .unwrap();

        assert_eq!(post.tags, vec!["pop", "latin"]);
        assert_eq!(post.media.kind(), "link");
        assert!(post.description.is_none());
        assert_eq!(h.state.session.posts()[0].id, post.id);
        assert_eq!(h.routes.routes().last(), Some(&Route::Profile));
    }

    #[test]
    fn feed_post_uses_current_identity() {
        let mut h = logged_in();
        let post = post_to_feed(&mut h.state, "Nuevo ensayo hoy").unwrap();
        assert_eq!(post.author.id, UserId::new("1"));
        assert_eq!(h.state.community.posts()[0].id, post.id);
    }

    #[tokio::test]
    async fn go_live_creates_stream_with_audio_capture() {
        let mut h = logged_in();
        let live_before = h.state.live.live_streams().len();

        let (stream, handle) = go_live(
            &mut h.state,
            StreamForm {
                title: "Ensayo abierto".into(),
                description: String::new(),
                genre: "Rock".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(handle.kind, MediaKind::Audio);
        assert_eq!(stream.user_id, UserId::new("1"));
        assert_eq!(h.state.live.live_streams().len(), live_before + 1);

        let ended = end_live(&mut h.state, &stream.id, &handle).await.unwrap();
        assert!(!ended.is_live);
        assert_eq!(*h.capture.stopped.lock().unwrap(), vec![handle.id.clone()]);
    }

    #[tokio::test]
    async fn denied_microphone_creates_nothing() {
        let mut h = harness_with(FakeCapture {
            deny: true,
            ..FakeCapture::default()
        });
        login(&mut h.state, "musico@test.com", "test123").unwrap();
        let streams_before = h.state.live.streams().len();

        let err = go_live(
            &mut h.state,
            StreamForm {
                title: "Ensayo".into(),
                description: String::new(),
                genre: "Rock".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert_eq!(h.state.live.streams().len(), streams_before);
        assert_eq!(h.notices.last().unwrap().title, "Microphone unavailable");
    }

    #[tokio::test]
    async fn cannot_end_someone_elses_stream() {
        // musico is user "1"; the seeded stream "1" belongs to AcousticSam
        let mut h = logged_in();
        let handle = StreamHandle {
            id: "h".into(),
            kind: MediaKind::Audio,
        };
        assert!(matches!(
            end_live(&mut h.state, &StreamId::new("1"), &handle).await,
            Err(AppError::PermissionDenied(_))
        ));
        assert!(h.state.live.get(&StreamId::new("1")).unwrap().is_live);
        assert!(h.capture.stopped.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_release_keeps_the_stream_live() {
        let mut h = harness_with(FakeCapture {
            fail_stop: true,
            ..FakeCapture::default()
        });
        login(&mut h.state, "musico@test.com", "test123").unwrap();
        let (stream, handle) = go_live(
            &mut h.state,
            StreamForm {
                title: "Ensayo".into(),
                description: String::new(),
                genre: "Rock".into(),
            },
        )
        .await
        .unwrap();

        assert!(end_live(&mut h.state, &stream.id, &handle).await.is_err());
        assert!(h.state.live.get(&stream.id).unwrap().is_live);
        assert_eq!(h.notices.last().unwrap().title, "Microphone still on");
    }

    #[tokio::test]
    async fn competition_stream_round_trip() {
        let mut h = harness();
        let identity = register(
            &mut h.state,
            Registration::new("nuevo", "nuevo@test.com", "Nuevo", "pw"),
        )
        .unwrap();
        let id = CompetitionId::new("1");
        join_competition(&mut h.state, &id).unwrap();

        let (participant, handle) = stream_in_competition(&mut h.state, &id).await.unwrap();
        assert_eq!(participant.id.as_str(), identity.id.as_str());
        assert_eq!(participant.username, "nuevo");
        assert!(participant.is_live);
        assert_eq!(participant.stream_handle.as_deref(), Some(handle.id.as_str()));
        assert_eq!(handle.kind, MediaKind::Video);

        let participant = leave_competition_stream(&mut h.state, &id, &handle)
            .await
            .unwrap();
        assert!(!participant.is_live);
        assert!(participant.stream_handle.is_none());
        assert_eq!(*h.capture.stopped.lock().unwrap(), vec![handle.id.clone()]);

        // Seeded participants are untouched
        let competition = h.state.competitions.get(&id).unwrap();
        assert_eq!(competition.participants.iter().filter(|p| p.is_live).count(), 2);
    }

    #[tokio::test]
    async fn seeded_user_is_not_a_seeded_participant() {
        let mut h = logged_in();
        let id = CompetitionId::new("1");

        let err = stream_in_competition(&mut h.state, &id).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(h.capture.started.lock().unwrap().is_empty());
        let mc_flow = h.state.competitions.get(&id).unwrap().participants[0].clone();
        assert_eq!(mc_flow.username, "MC Flow");
        assert_eq!(mc_flow.stream_handle.as_deref(), Some("stream1"));

        let joined = join_competition(&mut h.state, &id).unwrap();
        assert_eq!(joined.participants.len(), 5);
        assert_eq!(joined.participants[4].username, "musico_test");
    }

    #[test]
    fn seeded_user_can_follow_seeded_artists() {
        let mut h = logged_in();
        let maria = h.state.community.posts()[0].author.id.clone();
        assert!(follow_artist(&mut h.state, &maria).unwrap());
        assert!(h.state.community.is_following(&UserId::new("1"), &maria));
    }

    #[tokio::test]
    async fn outsiders_cannot_stream_in_a_competition() {
        let mut h = harness();
        register(
            &mut h.state,
            Registration::new("nuevo", "nuevo@test.com", "Nuevo", "pw"),
        )
        .unwrap();

        let err = stream_in_competition(&mut h.state, &CompetitionId::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(h.capture.started.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn play_recording_hands_audio_to_playback() {
        let mut h = logged_in();
        let recording = h
            .state
            .live
            .save_recording(NewRecording {
                user_id: UserId::new("1"),
                title: "Demo".into(),
                description: String::new(),
                audio_url: Some("blob:demo".into()),
                duration_secs: 30,
                is_public: true,
            })
            .unwrap();

        play_recording(&h.state, &recording.id).await.unwrap();
        assert_eq!(*h.playback.played.lock().unwrap(), vec!["blob:demo".to_string()]);
    }

    #[test]
    fn join_reports_duplicate_entry() {
        let mut h = harness();
        register(
            &mut h.state,
            Registration::new("nuevo", "nuevo@test.com", "Nuevo", "pw"),
        )
        .unwrap();
        let id = CompetitionId::new("1");

        let competition = join_competition(&mut h.state, &id).unwrap();
        assert_eq!(competition.participants.len(), 5);
        assert!(matches!(
            join_competition(&mut h.state, &id),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(h.notices.last().unwrap().title, "Could not join");
    }

    #[test]
    fn donate_requires_identity() {
        let mut h = harness();
        let to = Party::new(UserId::new("2"), "cantante");
        assert!(matches!(
            donate(&mut h.state, to, Amount::dollars(5), "gracias"),
            Err(AppError::Unauthorized)
        ));
        assert!(h.state.donations.entries().is_empty());
    }

    #[test]
    fn donations_accumulate() {
        let mut h = logged_in();
        let to = Party::new(UserId::new("2"), "cantante");
        donate(&mut h.state, to.clone(), Amount::dollars(5), "").unwrap();
        donate(&mut h.state, to, Amount::dollars(10), "").unwrap();
        assert_eq!(h.state.donations.stats().total_amount, Amount::dollars(15));
    }

    #[test]
    fn reaction_posts_emoji_and_tips_streamer() {
        let mut h = harness();
        login(&mut h.state, "cantante@test.com", "test123").unwrap();
        let stream = StreamId::new("1");

        let (comment, donation) = react_to_stream(&mut h.state, &stream, "🔥").unwrap();
        assert!(comment.is_reaction());
        assert_eq!(donation.kind, DonationKind::Reaction);
        assert_eq!(donation.to.user_id, UserId::new("artist-7"));
        assert_eq!(donation.to.username, "AcousticSam");
        assert_eq!(h.state.live.get(&stream).unwrap().comments.len(), 4);
    }
}
