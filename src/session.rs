//! Poll session: the entry point a presentation layer drives
//!
//! A session wires a [`BallotStore`] to a [`ResultsProjector`]. It casts
//! votes on behalf of the current device, pushes a fresh [`Projection`] to
//! every registered listener after each state change, and turns each
//! disposition into a [`Notice`] ready to show to the user.

use crate::ballot::{BallotStore, CastOutcome, Persistence};
use crate::config::PollConfig;
use crate::projector::{Projection, ResultsProjector};
use crate::storage::PersistedStore;
use crate::types::PollOptions;
use crate::Result;
use serde::Serialize;

/// Display-update callback
pub type ResultsListener = Box<dyn FnMut(&Projection)>;

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Success,
    Warning,
    Info,
    Error,
}

/// Message for the presentation layer to display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Result of a vote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReport {
    pub outcome: CastOutcome,
    pub notice: Notice,
}

/// Controller wiring a ballot, a projector and display listeners
pub struct PollSession<S: PersistedStore> {
    ballot: BallotStore<S>,
    projector: ResultsProjector,
    listeners: Vec<ResultsListener>,
}

impl PollSession<Box<dyn PersistedStore>> {
    /// Build a session from configuration, opening the configured store
    pub fn from_config(config: &PollConfig) -> Result<Self> {
        let store = config.storage.open()?;
        Ok(Self::new(
            config.options.clone(),
            store,
            ResultsProjector::new(config.rounding),
        ))
    }
}

impl<S: PersistedStore> PollSession<S> {
    /// Session over `store`; call [`start`](Self::start) before voting
    pub fn new(options: PollOptions, store: S, projector: ResultsProjector) -> Self {
        Self {
            ballot: BallotStore::new(options, store),
            projector,
            listeners: Vec::new(),
        }
    }

    /// Register a callback that receives every new projection
    pub fn subscribe(&mut self, listener: impl FnMut(&Projection) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Restore persisted state and publish the initial results
    ///
    /// Returns a warning when storage could not be read and an
    /// informational notice when this device has already voted.
    pub fn start(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();

        if let Persistence::MemoryOnly { .. } = self.ballot.restore() {
            notices.push(Notice::new(
                NoticeLevel::Warning,
                "Storage is unavailable, so results will not survive a reload",
            ));
        }
        self.publish();

        if self.ballot.current_voter_has_voted() {
            notices.push(Notice::new(
                NoticeLevel::Info,
                "You have already voted in this poll",
            ));
        }

        notices
    }

    /// Cast a vote for `option` as the current device
    pub fn vote(&mut self, option: &str) -> VoteReport {
        let identity = self.ballot.current_voter_identity();
        let outcome = self.ballot.cast_vote(option, &identity);

        let notice = match &outcome {
            CastOutcome::Accepted {
                option,
                persistence,
            } => {
                let label = self
                    .ballot
                    .options()
                    .get(option)
                    .map_or(option.as_str(), |o| o.label.as_str());
                match persistence {
                    Persistence::Durable => Notice::new(
                        NoticeLevel::Success,
                        format!("Thanks for voting for \"{label}\"!"),
                    ),
                    Persistence::MemoryOnly { .. } => Notice::new(
                        NoticeLevel::Warning,
                        format!(
                            "Thanks for voting for \"{label}\"! Storage is unavailable, so results will not survive a reload."
                        ),
                    ),
                }
            }
            CastOutcome::AlreadyVoted => {
                Notice::new(NoticeLevel::Warning, "You have already voted!")
            }
            CastOutcome::InvalidOption { option } => Notice::new(
                NoticeLevel::Error,
                format!("\"{option}\" is not an option in this poll"),
            ),
            CastOutcome::CountLimitReached { option } => Notice::new(
                NoticeLevel::Error,
                format!("\"{option}\" cannot take any more votes"),
            ),
        };

        if outcome.is_accepted() {
            self.publish();
        }

        VoteReport { outcome, notice }
    }

    /// Clear all votes and this device's identity, then republish
    pub fn reset(&mut self) -> Notice {
        let persistence = self.ballot.reset();
        self.publish();

        match persistence {
            Persistence::Durable => Notice::new(NoticeLevel::Success, "Voting has been reset!"),
            Persistence::MemoryOnly { .. } => Notice::new(
                NoticeLevel::Warning,
                "Voting has been reset for this session, but storage is unavailable",
            ),
        }
    }

    /// Whether vote controls should be enabled for this device
    pub fn voting_open(&mut self) -> bool {
        !self.ballot.current_voter_has_voted()
    }

    /// Current ranked results
    pub fn results(&self) -> Projection {
        self.projector.project(self.ballot.tally())
    }

    /// Underlying ballot store
    pub fn ballot(&self) -> &BallotStore<S> {
        &self.ballot
    }

    fn publish(&mut self) {
        let projection = self.results();
        for listener in &mut self.listeners {
            listener(&projection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session(store: MemoryStore) -> PollSession<MemoryStore> {
        PollSession::new(PollOptions::lunch(), store, ResultsProjector::default())
    }

    #[test]
    fn test_vote_flow_publishes_results() {
        let seen: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
        let mut session = session(MemoryStore::new());
        {
            let seen = seen.clone();
            session.subscribe(move |projection| seen.borrow_mut().push(projection.total));
        }

        assert!(session.start().is_empty());
        assert!(session.voting_open());

        let report = session.vote("burger");
        assert!(report.outcome.is_accepted());
        assert_eq!(report.notice.level, NoticeLevel::Success);
        assert!(report.notice.text.contains("Бургер"));
        assert!(!session.voting_open());

        let repeat = session.vote("pizza");
        assert_eq!(repeat.outcome, CastOutcome::AlreadyVoted);
        assert_eq!(repeat.notice.level, NoticeLevel::Warning);

        // Initial publish plus the one accepted vote
        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert_eq!(session.results().rows[0].option, "burger");
    }

    #[test]
    fn test_invalid_option_notice() {
        let mut session = session(MemoryStore::new());
        session.start();

        let report = session.vote("sushi");
        assert_eq!(report.notice.level, NoticeLevel::Error);
        assert!(session.voting_open());
        assert_eq!(session.results().total, 0);
    }

    #[test]
    fn test_start_reports_previous_vote() {
        let mut first = session(MemoryStore::new());
        first.start();
        first.vote("salad");
        let store = first.ballot.into_store();

        let mut second = session(store);
        let notices = second.start();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert!(!second.voting_open());
        assert_eq!(second.results().rows[0].option, "salad");
    }

    #[test]
    fn test_reset_reopens_voting() {
        let published = Rc::new(RefCell::new(0usize));
        let mut session = session(MemoryStore::new());
        {
            let published = published.clone();
            session.subscribe(move |_| *published.borrow_mut() += 1);
        }

        session.start();
        session.vote("pizza");
        let notice = session.reset();

        assert_eq!(notice.level, NoticeLevel::Success);
        assert!(session.voting_open());
        assert!(session.results().rows.iter().all(|row| row.count == 0 && row.percentage == 0));
        assert_eq!(*published.borrow(), 3);
    }

    #[test]
    fn test_unavailable_storage_warns() {
        let mut session = session(MemoryStore::with_quota(0));
        session.start();

        let report = session.vote("pizza");
        assert_eq!(report.notice.level, NoticeLevel::Warning);
        assert_eq!(session.results().total, 1);
        assert!(!session.voting_open());
    }

    #[test]
    fn test_start_warns_when_storage_unreadable() {
        use crate::persistence_error;

        struct Unreadable;

        impl PersistedStore for Unreadable {
            fn get(&self, key: &str) -> Result<Option<String>> {
                Err(persistence_error!("cannot read '{}'", key))
            }

            fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
                Ok(())
            }

            fn remove(&mut self, _key: &str) -> Result<()> {
                Ok(())
            }
        }

        let mut session =
            PollSession::new(PollOptions::lunch(), Unreadable, ResultsProjector::default());
        let notices = session.start();

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(session.voting_open());
    }
}
