//! Things the data layer asks of its surroundings: telling the user
//! something, moving to another screen, and touching media devices.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Destructive,
}

/// A toast-style message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Login,
    Profile,
    CreatePost,
    Community,
    Competitions,
    Live,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Profile => "/profile",
            Self::CreatePost => "/create-post",
            Self::Community => "/community",
            Self::Competitions => "/competitions",
            Self::Live => "/live",
        };
        f.write_str(path)
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Live capture session handed out by a `MediaCapture`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHandle {
    pub id: String,
    pub kind: MediaKind,
}

/// Camera/microphone access. `start` fails with
/// `AppError::PermissionDenied` when the user or platform refuses.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn start(&self, kind: MediaKind) -> AppResult<StreamHandle>;

    async fn stop(&self, handle: &StreamHandle) -> AppResult<()>;
}

#[async_trait]
pub trait MediaPlayback: Send + Sync {
    async fn play(&self, url: &str) -> AppResult<()>;
}

/// Writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => tracing::info!("{}: {}", notice.title, notice.description),
            NoticeLevel::Destructive => tracing::warn!("{}: {}", notice.title, notice.description),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!("Navigate to {}", route);
    }
}

/// Keeps every notice it receives
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notice);
    }
}

/// Keeps every route it is sent to
#[derive(Debug, Default)]
pub struct NavigationLog {
    routes: Mutex<Vec<Route>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(route);
    }
}

/// Capture for environments with no devices, e.g. a terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCapture;

#[async_trait]
impl MediaCapture for UnavailableCapture {
    async fn start(&self, kind: MediaKind) -> AppResult<StreamHandle> {
        Err(AppError::PermissionDenied(format!(
            "no {:?} capture device available",
            kind
        )))
    }

    async fn stop(&self, _handle: &StreamHandle) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePlayback;

#[async_trait]
impl MediaPlayback for UnavailablePlayback {
    async fn play(&self, url: &str) -> AppResult<()> {
        Err(AppError::PermissionDenied(format!("cannot play {}", url)))
    }
}
