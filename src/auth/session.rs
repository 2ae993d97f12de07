use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::credentials::CredentialSet;
use crate::clock::utc;
use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::ids::{Minter, PostId, UserId};
use crate::models::{Identity, NewPost, PostMedia, ProfilePost, Registration};
use crate::storage::LocalStorage;

/// Version written into every persisted session record.
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// On-disk shape of the logged-in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub version: u32,
    pub identity: Identity,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u32,
}

/// Decode a stored record. Records written before the envelope existed are
/// a bare identity and are read as version 0.
fn decode_record(raw: &str) -> Result<(u32, Identity), String> {
    match serde_json::from_str::<EnvelopeHeader>(raw) {
        Ok(header) if header.version == SESSION_FORMAT_VERSION => {
            serde_json::from_str::<PersistedSession>(raw)
                .map(|s| (s.version, s.identity))
                .map_err(|e| e.to_string())
        }
        Ok(header) => Err(format!("unsupported session version {}", header.version)),
        Err(_) => serde_json::from_str::<Identity>(raw)
            .map(|identity| (0, identity))
            .map_err(|e| e.to_string()),
    }
}

/// Who is logged in, who could log in, and their profile posts.
///
/// Only the current identity is persisted. Everything else lives for the
/// lifetime of the store.
pub struct SessionStore {
    current: Option<Identity>,
    identities: Vec<Identity>,
    credentials: CredentialSet,
    posts: Vec<ProfilePost>,
    storage: Arc<dyn LocalStorage>,
    storage_key: String,
    seed_cost: u32,
    minter: Minter,
    revision: u64,
}

impl SessionStore {
    /// Empty store, then restore whoever was persisted
    pub fn new(storage: Arc<dyn LocalStorage>, auth: &AuthConfig, minter: Minter) -> AppResult<Self> {
        let mut store = Self {
            current: None,
            identities: Vec::new(),
            credentials: CredentialSet::new(auth.effective_cost()),
            posts: Vec::new(),
            storage,
            storage_key: auth.storage_key.clone(),
            seed_cost: auth.effective_seed_cost(),
            minter,
            revision: 0,
        };
        store.restore()?;
        Ok(store)
    }

    /// Store holding the three demo musicians and their posts
    pub fn seeded(
        storage: Arc<dyn LocalStorage>,
        auth: &AuthConfig,
        minter: Minter,
    ) -> AppResult<Self> {
        let mut store = Self::new(storage, auth, minter)?;
        store.seed()?;
        Ok(store)
    }

    fn seed(&mut self) -> AppResult<()> {
        let seed_identities = [
            Identity {
                id: UserId::new("1"),
                username: "musico_test".into(),
                email: "musico@test.com".into(),
                name: "Músico de Prueba".into(),
                avatar: Some("https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=150&h=150&fit=crop&crop=face".into()),
                bio: Some("Artista musical apasionado por el rock y el folk.".into()),
                followers: 1250,
                following: 180,
            },
            Identity {
                id: UserId::new("2"),
                username: "cantante_pro".into(),
                email: "cantante@test.com".into(),
                name: "Cantante Profesional".into(),
                avatar: Some("https://images.unsplash.com/photo-1506794778202-cad84cf45f1d?w=150&h=150&fit=crop&crop=face".into()),
                bio: Some("Vocalista con 10 años de experiencia en el escenario.".into()),
                followers: 2890,
                following: 95,
            },
            Identity {
                id: UserId::new("3"),
                username: "dj_electronico".into(),
                email: "dj@test.com".into(),
                name: "DJ Electrónico".into(),
                avatar: Some("https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=150&h=150&fit=crop&crop=face".into()),
                bio: Some("Productor de música electrónica y DJ.".into()),
                followers: 5670,
                following: 230,
            },
        ];

        for identity in seed_identities {
            self.credentials
                .add_with_cost(&identity.email, "test123", self.seed_cost)?;
            // A restored identity may already carry one of the seed ids
            if !self.identities.iter().any(|i| i.id == identity.id) {
                self.identities.push(identity);
            }
        }

        self.posts.extend([
            ProfilePost {
                id: PostId::new("1"),
                user_id: UserId::new("1"),
                media: PostMedia::Image {
                    url: "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=800&h=600&fit=crop".into(),
                },
                title: "Nueva guitarra en el estudio".into(),
                description: Some("Acabamos de adquirir esta hermosa guitarra para nuestras grabaciones".into()),
                likes: 234,
                comments: 18,
                created_at: utc(2024, 1, 15, 10, 30),
                tags: vec!["guitarra".into(), "estudio".into(), "rock".into()],
            },
            ProfilePost {
                id: PostId::new("2"),
                user_id: UserId::new("2"),
                media: PostMedia::Video {
                    url: "https://example.com/video1.mp4".into(),
                },
                title: "Cover de \"Bohemian Rhapsody\"".into(),
                description: Some("Mi interpretación de este clásico de Queen".into()),
                likes: 1892,
                comments: 156,
                created_at: utc(2024, 1, 14, 18, 45),
                tags: vec!["cover".into(), "queen".into(), "vocal".into()],
            },
            ProfilePost {
                id: PostId::new("3"),
                user_id: UserId::new("3"),
                media: PostMedia::Link {
                    url: "https://soundcloud.com/ejemplo-track".into(),
                },
                title: "Mi nuevo track en SoundCloud".into(),
                description: Some("Acabo de subir mi último trabajo, ¡espero que les guste!".into()),
                likes: 567,
                comments: 43,
                created_at: utc(2024, 1, 13, 14, 20),
                tags: vec!["electronica".into(), "soundcloud".into(), "nuevo".into()],
            },
        ]);

        Ok(())
    }

    /// Load the persisted identity, if any. An unreadable record is dropped
    /// and the store starts logged out.
    fn restore(&mut self) -> AppResult<()> {
        let Some(raw) = self.storage.get(&self.storage_key)? else {
            return Ok(());
        };

        match decode_record(&raw) {
            Ok((version, identity)) => {
                tracing::info!("Restored session for {}", identity.email);
                if !self.identities.iter().any(|i| i.id == identity.id) {
                    self.identities.push(identity.clone());
                }
                self.current = Some(identity);
                if version != SESSION_FORMAT_VERSION {
                    tracing::info!("Upgrading session record from version {}", version);
                    self.persist()?;
                }
            }
            Err(reason) => {
                tracing::warn!("Discarding stored session: {}", reason);
                self.storage.remove(&self.storage_key)?;
            }
        }

        Ok(())
    }

    fn persist(&self) -> AppResult<()> {
        match &self.current {
            Some(identity) => {
                let record = PersistedSession {
                    version: SESSION_FORMAT_VERSION,
                    identity: identity.clone(),
                };
                self.storage
                    .set(&self.storage_key, &serde_json::to_string(&record)?)
            }
            None => self.storage.remove(&self.storage_key),
        }
    }

    /// Log in by exact email and secret match.
    pub fn login(&mut self, email: &str, secret: &str) -> AppResult<Identity> {
        if !self.credentials.verify(email, secret) {
            tracing::warn!("Login failed for {}", email);
            return Err(AppError::InvalidCredentials);
        }

        let identity = self
            .identities
            .iter()
            .find(|i| i.email == email)
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("Credential for {} has no identity", email);
                AppError::InvalidCredentials
            })?;

        self.current = Some(identity.clone());
        self.persist()?;
        self.revision += 1;
        tracing::info!("Logged in as {}", identity.email);
        Ok(identity)
    }

    /// Create an identity, remember its secret and log in as it.
    pub fn register(&mut self, registration: Registration) -> AppResult<Identity> {
        let email = registration.email.as_str();
        if self.identities.iter().any(|i| i.email == email)
            || self.credentials.contains_email(email)
        {
            tracing::warn!("Registration rejected, {} already exists", email);
            return Err(AppError::Conflict(format!("email {} already registered", email)));
        }

        self.credentials.add(email, &registration.secret)?;

        let identity = Identity {
            id: self.minter.mint(),
            username: registration.username,
            email: registration.email,
            name: registration.name,
            avatar: registration.avatar,
            bio: registration.bio,
            followers: 0,
            following: 0,
        };

        self.identities.push(identity.clone());
        self.current = Some(identity.clone());
        self.persist()?;
        self.revision += 1;
        tracing::info!("Registered {} as {}", identity.email, identity.id);
        Ok(identity)
    }

    pub fn logout(&mut self) -> AppResult<()> {
        if let Some(identity) = self.current.take() {
            tracing::info!("Logged out {}", identity.email);
        }
        self.storage.remove(&self.storage_key)?;
        self.revision += 1;
        Ok(())
    }

    /// Publish a post as the current identity; newest posts come first.
    pub fn create_post(&mut self, new_post: NewPost) -> AppResult<ProfilePost> {
        let owner = self.current.as_ref().ok_or(AppError::Unauthorized)?;

        let post = ProfilePost {
            id: self.minter.mint(),
            user_id: owner.id.clone(),
            media: new_post.media,
            title: new_post.title,
            description: new_post.description,
            likes: 0,
            comments: 0,
            created_at: self.minter.now(),
            tags: new_post.tags,
        };

        self.posts.insert(0, post.clone());
        self.revision += 1;
        tracing::info!("{} posted {} ({})", owner.username, post.id, post.media.kind());
        Ok(post)
    }

    /// Fresh copy of one owner's posts, newest first
    pub fn user_posts(&self, user_id: &UserId) -> Vec<ProfilePost> {
        self.posts
            .iter()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn identity(&self, id: &UserId) -> Option<&Identity> {
        self.identities.iter().find(|i| &i.id == id)
    }

    pub fn posts(&self) -> &[ProfilePost] {
        &self.posts
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    /// Bumped on every successful mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
