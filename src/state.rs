use std::sync::Arc;

use crate::auth::SessionStore;
use crate::capabilities::{
    MediaCapture, MediaPlayback, Navigator, Notifier, TracingNavigator, TracingNotifier,
    UnavailableCapture, UnavailablePlayback,
};
use crate::config::Config;
use crate::error::AppResult;
use crate::ids::Minter;
use crate::registry::{CommunityStore, CompetitionStore, DonationLedger, LiveStore};
use crate::storage::LocalStorage;

#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub capture: Arc<dyn MediaCapture>,
    pub playback: Arc<dyn MediaPlayback>,
}

impl Collaborators {
    /// Log notices and navigation; refuse all media access
    pub fn headless() -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(TracingNavigator),
            capture: Arc::new(UnavailableCapture),
            playback: Arc::new(UnavailablePlayback),
        }
    }
}

/// Everything one running instance owns. Each instance is independent, so
/// tests build their own instead of sharing globals.
pub struct AppState {
    pub config: Config,
    pub session: SessionStore,
    pub community: CommunityStore,
    pub competitions: CompetitionStore,
    pub live: LiveStore,
    pub donations: DonationLedger,
    pub collaborators: Collaborators,
}

impl AppState {
    /// Seeded stores with ids drawn per `config.ids`
    pub fn seeded(
        config: Config,
        storage: Arc<dyn LocalStorage>,
        collaborators: Collaborators,
    ) -> AppResult<Self> {
        let minter = Minter::from_strategy(config.ids.strategy);
        Self::seeded_with(config, storage, collaborators, minter)
    }

    pub fn seeded_with(
        config: Config,
        storage: Arc<dyn LocalStorage>,
        collaborators: Collaborators,
        minter: Minter,
    ) -> AppResult<Self> {
        let session = SessionStore::seeded(storage, &config.auth, minter.clone())?;
        let donations = DonationLedger::new(&config.ledger, minter.clone());

        Ok(Self {
            session,
            community: CommunityStore::seeded(minter.clone()),
            competitions: CompetitionStore::seeded(minter.clone()),
            live: LiveStore::seeded(minter),
            donations,
            collaborators,
            config,
        })
    }

    /// Sum of every store's revision; changes whenever any store changes
    pub fn revision(&self) -> u64 {
        self.session.revision()
            + self.community.revision()
            + self.competitions.revision()
            + self.live.revision()
            + self.donations.revision()
    }
}
