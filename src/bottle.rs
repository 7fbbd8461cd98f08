//! Drift bottle circulation: throw, pick, close and throw back.
//!
//! A bottle is either unread (in circulation, pickable) or read (closed).
//! Picking closes the chosen bottle; throwing it back reopens it. Rows are
//! never deleted.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::models::{Bottle, Id, ANONYMOUS};
use crate::repo::{BottleRepo, RepoError};

pub const MAX_CONTENT_CHARS: usize = 500;
pub const DEFAULT_CANDIDATE_WINDOW: usize = 10;

pub const FALLBACK_MESSAGES: &[&str] = &[
    "The ocean is vast, the bottles have all drifted far away...",
    "The waves are rough today, nothing washed ashore...",
    "Keep looking, a surprise is bound to turn up!",
    "No bottles in these waters for now...",
    "Maybe come back and look again in a little while?",
    "On calm days like this the bottles like to hide...",
    "The seagulls say a bottle is waiting for you further out...",
    "The tide carried every bottle away, try again tomorrow!",
];

#[derive(thiserror::Error, Debug)]
pub enum BottleError {
    #[error("bottle content must not be empty")]
    EmptyContent,
    #[error("bottle content must not exceed {MAX_CONTENT_CHARS} characters")]
    ContentTooLong,
    #[error("there is no bottle to throw back")]
    NothingToThrowBack,
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl BottleError {
    pub fn is_validation(&self) -> bool {
        !matches!(self, BottleError::Storage(_))
    }
}

/// What an operation does when its storage round-trip fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnStorageFailure {
    /// Return the error to the caller.
    Propagate,
    /// Report a soft success (fallback message for pick, success for close).
    Degrade,
}

impl std::str::FromStr for OnStorageFailure {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(OnStorageFailure::Propagate),
            "degrade" => Ok(OnStorageFailure::Degrade),
            other => Err(format!("unknown storage failure policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BottlePolicy {
    /// Number of most recent unread bottles pick chooses from.
    pub candidate_window: usize,
    pub pick: OnStorageFailure,
    pub close: OnStorageFailure,
}

impl Default for BottlePolicy {
    // pick and close mask storage failures unless configured otherwise
    fn default() -> Self {
        Self {
            candidate_window: DEFAULT_CANDIDATE_WINDOW,
            pick: OnStorageFailure::Degrade,
            close: OnStorageFailure::Degrade,
        }
    }
}

/// Throw-back input. A bottle id wins over content when a caller sends both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrowBack {
    Reopen(Id),
    Create(String),
}

impl ThrowBack {
    pub fn resolve(bottle_id: Option<Id>, content: Option<String>) -> Result<Self, BottleError> {
        if let Some(id) = bottle_id {
            return Ok(ThrowBack::Reopen(id));
        }
        match content {
            Some(c) if !c.trim().is_empty() => Ok(ThrowBack::Create(c)),
            _ => Err(BottleError::NothingToThrowBack),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PickOutcome {
    Found(Bottle),
    /// `degraded` is set when the fallback stands in for a storage failure.
    Fallback { message: &'static str, degraded: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// Storage failed and the close policy masked it.
    Masked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrowBackOutcome {
    Reopened(Id),
    Created(Id),
}

/// Trims and validates bottle content, returning the text to store.
pub fn validate_content(content: &str) -> Result<&str, BottleError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(BottleError::EmptyContent);
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(BottleError::ContentTooLong);
    }
    Ok(trimmed)
}

pub fn fallback_message() -> &'static str {
    FALLBACK_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_MESSAGES[0])
}

#[derive(Clone)]
pub struct BottleService {
    repo: Arc<dyn BottleRepo>,
    policy: BottlePolicy,
}

impl BottleService {
    pub fn new(repo: Arc<dyn BottleRepo>, policy: BottlePolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn throw(&self, content: &str, author: Option<&str>) -> Result<Id, BottleError> {
        let content = validate_content(content)?;
        let author = author.map(str::trim).filter(|a| !a.is_empty()).unwrap_or(ANONYMOUS);
        let id = self.repo.insert_bottle(content, author).await?;
        info!(bottle_id = id, "bottle thrown");
        Ok(id)
    }

    /// Picks a random bottle out of the most recent unread ones and closes it.
    ///
    /// Selection and closing are two separate statements, so concurrent picks
    /// may both receive the same bottle.
    pub async fn pick(&self) -> Result<PickOutcome, BottleError> {
        match self.try_pick().await {
            Ok(Some(bottle)) => {
                info!(bottle_id = bottle.id, "bottle picked");
                Ok(PickOutcome::Found(bottle))
            }
            Ok(None) => Ok(PickOutcome::Fallback { message: fallback_message(), degraded: false }),
            Err(e) => match self.policy.pick {
                OnStorageFailure::Propagate => Err(e.into()),
                OnStorageFailure::Degrade => {
                    warn!(error = %e, "pick failed, serving a fallback message");
                    Ok(PickOutcome::Fallback { message: fallback_message(), degraded: true })
                }
            },
        }
    }

    async fn try_pick(&self) -> Result<Option<Bottle>, RepoError> {
        let candidates = self.repo.select_unread_recent(self.policy.candidate_window).await?;
        let Some(chosen) = candidates.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };
        self.repo.mark_read(chosen.id).await?;
        Ok(Some(chosen))
    }

    /// Closes a bottle. Closing an unknown or already closed bottle succeeds.
    pub async fn close(&self, id: Id) -> Result<CloseOutcome, BottleError> {
        match self.repo.mark_read(id).await {
            Ok(()) => {
                info!(bottle_id = id, "bottle closed");
                Ok(CloseOutcome::Closed)
            }
            Err(e) => match self.policy.close {
                OnStorageFailure::Propagate => Err(e.into()),
                OnStorageFailure::Degrade => {
                    warn!(bottle_id = id, error = %e, "close failed, reporting success");
                    Ok(CloseOutcome::Masked)
                }
            },
        }
    }

    pub async fn throw_back(&self, input: ThrowBack, author: Option<&str>) -> Result<ThrowBackOutcome, BottleError> {
        match input {
            ThrowBack::Reopen(id) => {
                self.repo.mark_unread(id).await?;
                info!(bottle_id = id, "bottle back in circulation");
                Ok(ThrowBackOutcome::Reopened(id))
            }
            ThrowBack::Create(content) => self.throw(&content, author).await.map(ThrowBackOutcome::Created),
        }
    }
}
