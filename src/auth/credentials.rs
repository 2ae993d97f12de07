use std::fmt;

use crate::error::AppResult;

/// Email plus bcrypt hash of the secret. The plaintext is never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    email: String,
    secret_hash: String,
}

impl Credential {
    /// Hash `secret` at the given bcrypt cost
    pub fn new(email: impl Into<String>, secret: &str, cost: u32) -> AppResult<Self> {
        Ok(Self {
            email: email.into(),
            secret_hash: bcrypt::hash(secret, cost)?,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Exact email match and bcrypt verification of the secret
    pub fn matches(&self, email: &str, secret: &str) -> bool {
        self.email == email && bcrypt::verify(secret, &self.secret_hash).unwrap_or(false)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Known credential pairs, in registration order.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    entries: Vec<Credential>,
    cost: u32,
}

impl CredentialSet {
    pub fn new(cost: u32) -> Self {
        Self {
            entries: Vec::new(),
            cost,
        }
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.entries.iter().any(|c| c.email == email)
    }

    /// Hashes first so a hashing failure leaves the set unchanged.
    pub fn add(&mut self, email: &str, secret: &str) -> AppResult<()> {
        self.add_with_cost(email, secret, self.cost)
    }

    /// `add` at an explicit bcrypt cost instead of the set's own
    pub fn add_with_cost(&mut self, email: &str, secret: &str, cost: u32) -> AppResult<()> {
        let credential = Credential::new(email, secret, cost)?;
        self.entries.push(credential);
        Ok(())
    }

    /// Does any pair match? Unknown email and wrong secret are not told apart.
    pub fn verify(&self, email: &str, secret: &str) -> bool {
        self.entries.iter().any(|c| c.matches(email, secret))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
