//! Accepting or declining an available update.
//!
//! The orchestrator never prompts by itself. When a newer release is found it
//! hands an [`UpdateOffer`] to a [`DecisionProvider`] and continues only on
//! [`Decision::Accept`].

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::future::Future;

use crate::version::Version;

/// Everything the user needs to decide on an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOffer {
    pub current: Version,
    pub latest: Version,
    pub release_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Release notes as published.
    pub changelog: Option<String>,
    pub asset_name: String,
    /// Asset size in bytes as reported by the feed.
    pub asset_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

/// Resolves the `AwaitingDecision` state.
pub trait DecisionProvider: Send {
    fn decide(&mut self, offer: &UpdateOffer) -> impl Future<Output = Decision> + Send;
}

/// Accepts every offer (`check --yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

impl DecisionProvider for AutoAccept {
    async fn decide(&mut self, _offer: &UpdateOffer) -> Decision {
        Decision::Accept
    }
}

/// Replays a fixed list of decisions and remembers the offers it saw.
/// Declines once the list runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecision {
    decisions: VecDeque<Decision>,
    offers: Vec<UpdateOffer>,
}

impl ScriptedDecision {
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            offers: Vec::new(),
        }
    }

    #[must_use]
    pub fn offers(&self) -> &[UpdateOffer] {
        &self.offers
    }
}

impl DecisionProvider for ScriptedDecision {
    async fn decide(&mut self, offer: &UpdateOffer) -> Decision {
        self.offers.push(offer.clone());
        self.decisions.pop_front().unwrap_or(Decision::Decline)
    }
}
