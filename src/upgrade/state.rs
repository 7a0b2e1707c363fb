//! States of an update run and the transitions allowed between them.
//!
//! ```text
//! Idle -> CheckingVersion -> FetchingRelease -> ComparingVersions
//!      -> UpToDate
//!      -> AssetNotFound
//!      -> AwaitingDecision -> Declined
//!                          -> Downloading -> Installing -> Completed
//! ```
//!
//! Every non-terminal state can also move to `Failed`.

use std::fmt;

use crate::core::UpdateError;

/// Where an update run currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    CheckingVersion,
    FetchingRelease,
    ComparingVersions,
    UpToDate,
    AssetNotFound,
    AwaitingDecision,
    Declined,
    Downloading,
    Installing,
    Completed,
    Failed(UpdateError),
}

/// [`UpdateState`] without the payload, for transition checks and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Idle,
    CheckingVersion,
    FetchingRelease,
    ComparingVersions,
    UpToDate,
    AssetNotFound,
    AwaitingDecision,
    Declined,
    Downloading,
    Installing,
    Completed,
    Failed,
}

/// Every legal transition except `* -> Failed`.
const TRANSITIONS: &[(StateKind, StateKind)] = &[
    (StateKind::Idle, StateKind::CheckingVersion),
    (StateKind::CheckingVersion, StateKind::FetchingRelease),
    (StateKind::FetchingRelease, StateKind::ComparingVersions),
    (StateKind::ComparingVersions, StateKind::UpToDate),
    (StateKind::ComparingVersions, StateKind::AssetNotFound),
    (StateKind::ComparingVersions, StateKind::AwaitingDecision),
    (StateKind::AwaitingDecision, StateKind::Declined),
    (StateKind::AwaitingDecision, StateKind::Downloading),
    (StateKind::Downloading, StateKind::Installing),
    (StateKind::Installing, StateKind::Completed),
];

impl StateKind {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::UpToDate | Self::AssetNotFound | Self::Declined | Self::Completed | Self::Failed
        )
    }

    /// Whether a run may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: StateKind) -> bool {
        if next == Self::Failed {
            return !self.is_terminal();
        }
        TRANSITIONS.contains(&(self, next))
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CheckingVersion => "checking version",
            Self::FetchingRelease => "fetching release",
            Self::ComparingVersions => "comparing versions",
            Self::UpToDate => "up to date",
            Self::AssetNotFound => "asset not found",
            Self::AwaitingDecision => "awaiting decision",
            Self::Declined => "declined",
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl UpdateState {
    #[must_use]
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::CheckingVersion => StateKind::CheckingVersion,
            Self::FetchingRelease => StateKind::FetchingRelease,
            Self::ComparingVersions => StateKind::ComparingVersions,
            Self::UpToDate => StateKind::UpToDate,
            Self::AssetNotFound => StateKind::AssetNotFound,
            Self::AwaitingDecision => StateKind::AwaitingDecision,
            Self::Declined => StateKind::Declined,
            Self::Downloading => StateKind::Downloading,
            Self::Installing => StateKind::Installing,
            Self::Completed => StateKind::Completed,
            Self::Failed(_) => StateKind::Failed,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// The error of a `Failed` state.
    #[must_use]
    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "failed: {e}"),
            other => other.kind().fmt(f),
        }
    }
}
