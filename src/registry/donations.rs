// Append-only donation ledger with incrementally maintained aggregates.
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::Add;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::ids::{DonationId, Minter, UserId};

/// Money in whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn dollars(dollars: u64) -> Self {
        Self(dollars * 100)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

pub const LIKE_AMOUNT: Amount = Amount::from_cents(50);
pub const REACTION_AMOUNT: Amount = Amount::from_cents(25);

/// Preset donation buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationTier {
    Small,
    Medium,
    Large,
}

impl DonationTier {
    pub fn amount(self) -> Amount {
        match self {
            Self::Small => Amount::dollars(5),
            Self::Medium => Amount::dollars(10),
            Self::Large => Amount::dollars(25),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationKind {
    Donation,
    Like,
    Reaction,
}

/// One side of a donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub user_id: UserId,
    pub username: String,
}

impl Party {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub from: Party,
    pub to: Party,
    pub amount: Amount,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub kind: DonationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationStats {
    pub total_donations: usize,
    pub total_amount: Amount,
    pub top_donator: Option<String>,
    /// Newest first
    pub recent_donations: Vec<Donation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopDonator {
    pub user_id: UserId,
    pub username: String,
    pub total: Amount,
    pub count: usize,
}

pub struct DonationLedger {
    entries: Vec<Donation>,
    total_amount: Amount,
    recent: VecDeque<Donation>,
    recent_limit: usize,
    default_top_limit: usize,
    minter: Minter,
    revision: u64,
}

impl DonationLedger {
    pub fn new(config: &LedgerConfig, minter: Minter) -> Self {
        Self {
            entries: Vec::new(),
            total_amount: Amount::ZERO,
            recent: VecDeque::with_capacity(config.recent_limit),
            recent_limit: config.recent_limit,
            default_top_limit: config.top_donators_limit,
            minter,
            revision: 0,
        }
    }

    /// Record a donation. This is the only way entries enter the ledger, and
    /// it updates the aggregates in the same step.
    pub fn create_donation(
        &mut self,
        from: Party,
        to: Party,
        amount: Amount,
        message: impl Into<String>,
        kind: DonationKind,
    ) -> AppResult<Donation> {
        if amount.is_zero() {
            return Err(AppError::Validation("donation amount must be positive".into()));
        }

        let donation = Donation {
            id: self.minter.mint(),
            from,
            to,
            amount,
            message: message.into(),
            sent_at: self.minter.now(),
            kind,
        };

        self.entries.push(donation.clone());
        self.total_amount = self.total_amount + amount;
        self.recent.push_front(donation.clone());
        self.recent.truncate(self.recent_limit);
        self.revision += 1;

        tracing::info!(
            "{} sent {} to {} ({:?})",
            donation.from.username,
            donation.amount,
            donation.to.username,
            donation.kind
        );
        Ok(donation)
    }

    pub fn simulate_like(&mut self, from: Party, to: Party) -> AppResult<Donation> {
        self.create_donation(from, to, LIKE_AMOUNT, "Love your music! 👍", DonationKind::Like)
    }

    pub fn simulate_reaction(&mut self, from: Party, to: Party, emoji: &str) -> AppResult<Donation> {
        self.create_donation(
            from,
            to,
            REACTION_AMOUNT,
            format!("Reaction: {}", emoji),
            DonationKind::Reaction,
        )
    }

    pub fn donations_for_user(&self, user_id: &UserId) -> Vec<Donation> {
        self.entries
            .iter()
            .filter(|d| &d.to.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn total_for_user(&self, user_id: &UserId) -> Amount {
        self.entries
            .iter()
            .filter(|d| &d.to.user_id == user_id)
            .map(|d| d.amount)
            .sum()
    }

    /// Senders ranked by total given. Equal totals keep the order in which
    /// the senders first appear in the ledger.
    pub fn top_donators(&self, limit: usize) -> Vec<TopDonator> {
        let mut ranked: Vec<TopDonator> = Vec::new();
        let mut index: HashMap<&UserId, usize> = HashMap::new();

        for donation in &self.entries {
            let slot = *index.entry(&donation.from.user_id).or_insert_with(|| {
                ranked.push(TopDonator {
                    user_id: donation.from.user_id.clone(),
                    username: donation.from.username.clone(),
                    total: Amount::ZERO,
                    count: 0,
                });
                ranked.len() - 1
            });
            ranked[slot].total = ranked[slot].total + donation.amount;
            ranked[slot].count += 1;
        }

        ranked.sort_by(|a, b| b.total.cmp(&a.total));
        ranked.truncate(limit);
        ranked
    }

    /// `top_donators` with the configured default limit
    pub fn top_donators_default(&self) -> Vec<TopDonator> {
        self.top_donators(self.default_top_limit)
    }

    pub fn stats(&self) -> DonationStats {
        DonationStats {
            total_donations: self.entries.len(),
            total_amount: self.total_amount,
            top_donator: self.top_donators(1).into_iter().next().map(|t| t.username),
            recent_donations: self.recent.iter().cloned().collect(),
        }
    }

    /// Full ledger, oldest first
    pub fn entries(&self) -> &[Donation] {
        &self.entries
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
