pub mod credentials;
pub mod session;

pub use credentials::{Credential, CredentialSet};
pub use session::{PersistedSession, SessionStore, SESSION_FORMAT_VERSION};
