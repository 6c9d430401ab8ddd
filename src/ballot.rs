//! Ballot store: vote counts, voter eligibility, persistence
//!
//! This module is the single source of truth for a poll:
//! 1. The tally of votes per configured option
//! 2. The record of voter identities that have already voted
//! 3. The current device's voter identity
//!
//! Every mutation goes through `&mut self`, so at most one caller changes
//! the ballot at a time. Storage is best-effort: when the backend fails,
//! the ballot keeps working in memory and reports the downgrade.

use crate::identity::VoterId;
use crate::storage::PersistedStore;
use crate::types::{PollOptions, Tally};
use crate::Result;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Storage key for the serialized tally
pub const VOTES_KEY: &str = "votes";

/// Storage key for the serialized voter record
pub const VOTERS_KEY: &str = "voters";

/// Storage key for this device's voter identity
pub const VOTER_ID_KEY: &str = "voterId";

/// Whether a state change reached the persisted store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Persistence {
    /// Written; survives a restart
    Durable,

    /// Kept in memory only for this session
    MemoryOnly { reason: String },
}

impl Persistence {
    fn memory_only(reason: impl std::fmt::Display) -> Self {
        Self::MemoryOnly {
            reason: reason.to_string(),
        }
    }

    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Durable,
            Err(e) => Self::MemoryOnly {
                reason: e.to_string(),
            },
        }
    }

    /// Whether the change reached storage
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable)
    }
}

/// Disposition of a vote attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CastOutcome {
    /// Counted and recorded
    Accepted {
        option: String,
        persistence: Persistence,
    },

    /// The identity already voted; nothing changed
    AlreadyVoted,

    /// The option is not part of this poll; nothing changed
    InvalidOption { option: String },

    /// Counting the vote would overflow the tally; nothing changed
    CountLimitReached { option: String },
}

impl CastOutcome {
    /// Whether the vote was counted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Owner of the tally and voter record for one poll
pub struct BallotStore<S: PersistedStore> {
    store: S,
    options: PollOptions,
    tally: Tally,
    voters: BTreeSet<VoterId>,
    voter_id: Option<VoterId>,
}

impl<S: PersistedStore> BallotStore<S> {
    /// Create an empty ballot over `store`; call [`restore`](Self::restore)
    /// to load previous state
    pub fn new(options: PollOptions, store: S) -> Self {
        Self {
            store,
            tally: Tally::empty(&options),
            options,
            voters: BTreeSet::new(),
            voter_id: None,
        }
    }

    /// Load the tally and voter record from storage
    ///
    /// Never fails. Each key is loaded independently; a key that is
    /// missing or malformed leaves its in-memory default in place and is
    /// logged. A store that cannot be read at all is reported as
    /// [`Persistence::MemoryOnly`], since this session's state will not
    /// survive a restart.
    pub fn restore(&mut self) -> Persistence {
        let mut persistence = Persistence::Durable;

        match self.store.get(VOTES_KEY) {
            Ok(Some(raw)) => match self.parse_tally(&raw) {
                Ok(tally) => self.tally = tally,
                Err(e) => {
                    tracing::warn!("Ignoring persisted votes, starting from zero: {}", e);
                    self.tally = Tally::empty(&self.options);
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Votes unreadable, starting from zero: {}", e);
                persistence = Persistence::memory_only(e);
            }
        }

        match self.store.get(VOTERS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<VoterId>>(&raw) {
                Ok(voters) => self.voters = voters.into_iter().collect(),
                Err(e) => {
                    tracing::warn!("Ignoring persisted voters, starting empty: {}", e);
                    self.voters.clear();
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Voters unreadable, starting empty: {}", e);
                if persistence.is_durable() {
                    persistence = Persistence::memory_only(e);
                }
            }
        }

        tracing::debug!(
            "Ballot restored: {} votes, {} voters",
            self.tally.total(),
            self.voters.len()
        );

        persistence
    }

    fn parse_tally(&self, raw: &str) -> Result<Tally> {
        let counts: HashMap<String, u64> = serde_json::from_str(raw)?;
        let (tally, unknown) = Tally::from_counts(&self.options, &counts)?;
        if !unknown.is_empty() {
            tracing::warn!("Dropping counts for unknown options: {:?}", unknown);
        }

        Ok(tally)
    }

    /// Write the voter record and tally to storage
    ///
    /// Voters are written before votes. If the second write fails, storage
    /// may hold a voter whose vote is missing but never a vote without its
    /// voter, so a restart cannot let the same identity vote twice.
    pub fn persist(&mut self) -> Result<()> {
        let voters = serde_json::to_string(&self.voters)?;
        let votes = serde_json::to_string(&self.tally.to_counts())?;

        self.store.set(VOTERS_KEY, &voters)?;
        self.store.set(VOTES_KEY, &votes)?;
        Ok(())
    }

    /// This device's identity, created and stored on first use
    ///
    /// If storing a new identity fails it is still kept for the rest of
    /// the session.
    pub fn current_voter_identity(&mut self) -> VoterId {
        if let Some(id) = &self.voter_id {
            return id.clone();
        }

        let id = match self.store.get(VOTER_ID_KEY) {
            Ok(Some(raw)) if !raw.is_empty() => VoterId::from(raw),
            Ok(_) => self.issue_voter_identity(),
            Err(e) => {
                tracing::warn!("Voter identity unreadable, issuing a new one: {}", e);
                self.issue_voter_identity()
            }
        };

        self.voter_id = Some(id.clone());
        id
    }

    fn issue_voter_identity(&mut self) -> VoterId {
        let id = VoterId::generate();
        match self.store.set(VOTER_ID_KEY, id.as_str()) {
            Ok(()) => tracing::debug!("Issued voter identity {}", id),
            Err(e) => tracing::warn!("Voter identity {} kept in memory only: {}", id, e),
        }
        id
    }

    /// Whether `identity` is in the voter record
    pub fn has_voted(&self, identity: &VoterId) -> bool {
        self.voters.contains(identity)
    }

    /// Voting-status flag for this device
    pub fn current_voter_has_voted(&mut self) -> bool {
        let id = self.current_voter_identity();
        self.has_voted(&id)
    }

    /// Record one vote for `option` on behalf of `identity`
    ///
    /// The option is validated before eligibility, so an unknown option is
    /// always reported as such regardless of who sent it.
    pub fn cast_vote(&mut self, option: &str, identity: &VoterId) -> CastOutcome {
        if !self.options.contains(option) {
            tracing::warn!("Rejected vote for unknown option '{}'", option);
            return CastOutcome::InvalidOption {
                option: option.to_string(),
            };
        }

        if self.has_voted(identity) {
            tracing::info!("Rejected repeat vote from {}", identity);
            return CastOutcome::AlreadyVoted;
        }

        if let Err(e) = self.tally.increment(option) {
            tracing::error!("Vote for '{}' not counted: {}", option, e);
            return CastOutcome::CountLimitReached {
                option: option.to_string(),
            };
        }
        self.voters.insert(identity.clone());

        let persistence = Persistence::from_result(self.persist());
        if let Persistence::MemoryOnly { reason } = &persistence {
            tracing::warn!("Vote kept in memory only: {}", reason);
        }

        tracing::info!(
            "Vote accepted: option={}, total={}",
            option,
            self.tally.total()
        );

        CastOutcome::Accepted {
            option: option.to_string(),
            persistence,
        }
    }

    /// Zero every count, forget all voters and this device's identity
    ///
    /// Performs no confirmation; gating is the caller's job.
    pub fn reset(&mut self) -> Persistence {
        self.tally.clear();
        self.voters.clear();
        self.voter_id = None;

        // Attempt both writes even if the first fails
        let removed = self.store.remove(VOTER_ID_KEY);
        let persisted = self.persist();
        let persistence = Persistence::from_result(removed.and(persisted));

        match &persistence {
            Persistence::Durable => tracing::info!("Ballot reset"),
            Persistence::MemoryOnly { reason } => {
                tracing::warn!("Ballot reset in memory only: {}", reason)
            }
        }

        persistence
    }

    /// Current counts
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Identities that have voted
    pub fn voters(&self) -> &BTreeSet<VoterId> {
        &self.voters
    }

    /// Configured option set
    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Number of accepted votes
    pub fn total_votes(&self) -> u64 {
        self.tally.total()
    }

    /// Underlying storage backend
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the storage backend
    pub fn into_store(self) -> S {
        self.store
    }
}
