//! Decision aggregate and its explicit lifecycle state machine.
//!
//! The lifecycle is `Created -> Rolled -> Resolved`. Representing it as a
//! tagged enum makes an "implemented" mark without a preceding roll
//! unrepresentable, instead of encoding the state in nullable columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Number of alternatives generated for every decision.
pub const ALTERNATIVE_COUNT: usize = 4;

/// Who may see a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Followers,
    Private,
}

/// Aggregated helpful/unhelpful vote counters, recomputed on every vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStats {
    pub helpful: u32,
    pub unhelpful: u32,
    pub total: u32,
}

impl VoteStats {
    /// Share of helpful votes in 0..=100; 0 when nobody voted.
    pub fn helpful_percentage(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (f64::from(self.helpful) * 100.0 / f64::from(self.total)).round() as u32
        }
    }
}

/// Lifecycle state of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DecisionState {
    /// Alternatives generated, dice not yet rolled.
    Created,
    /// Dice rolled; may be re-rolled when policy allows.
    Rolled {
        dice_result: u8,
        selected_option: String,
        rolled_at: DateTime<Utc>,
    },
    /// Owner reported whether they followed through.
    Resolved {
        dice_result: u8,
        selected_option: String,
        implemented: bool,
        rolled_at: DateTime<Utc>,
        resolved_at: DateTime<Utc>,
    },
}

/// Errors from lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("dice result must be between 1 and {max}", max = ALTERNATIVE_COUNT)]
    DiceOutOfRange,
    #[error("decision has already been resolved")]
    AlreadyResolved,
    #[error("decision has not been rolled yet")]
    NotRolled,
}

/// A user's indecision prompt, its generated alternatives, and the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub alternatives: [String; ALTERNATIVE_COUNT],
    pub privacy: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: DecisionState,
    pub vote_stats: VoteStats,
}

impl Decision {
    /// A freshly created decision owned by `user_id`.
    pub fn new(
        user_id: impl Into<String>,
        text: impl Into<String>,
        alternatives: [String; ALTERNATIVE_COUNT],
        privacy: PrivacyLevel,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            text: text.into(),
            alternatives,
            privacy,
            created_at: Utc::now(),
            state: DecisionState::Created,
            vote_stats: VoteStats::default(),
        }
    }

    /// Dice result, when rolled.
    pub fn dice_result(&self) -> Option<u8> {
        match &self.state {
            DecisionState::Created => None,
            DecisionState::Rolled { dice_result, .. }
            | DecisionState::Resolved { dice_result, .. } => Some(*dice_result),
        }
    }

    /// Alternative picked by the dice, when rolled.
    pub fn selected_option(&self) -> Option<&str> {
        match &self.state {
            DecisionState::Created => None,
            DecisionState::Rolled {
                selected_option, ..
            }
            | DecisionState::Resolved {
                selected_option, ..
            } => Some(selected_option),
        }
    }

    /// Outcome mark, when resolved.
    pub fn implemented(&self) -> Option<bool> {
        match &self.state {
            DecisionState::Resolved { implemented, .. } => Some(*implemented),
            _ => None,
        }
    }

    /// Apply a dice roll of `dice_result` (1-based).
    ///
    /// Valid from `Created` and from `Rolled` (a re-roll overwrites the
    /// previous result; the caller gates re-rolls by policy). A resolved
    /// decision can no longer be rolled.
    pub fn apply_roll(&mut self, dice_result: u8, now: DateTime<Utc>) -> Result<(), TransitionError> {
        let index = usize::from(dice_result);
        if index == 0 || index > ALTERNATIVE_COUNT {
            return Err(TransitionError::DiceOutOfRange);
        }
        match &self.state {
            DecisionState::Resolved { .. } => Err(TransitionError::AlreadyResolved),
            DecisionState::Created | DecisionState::Rolled { .. } => {
                self.state = DecisionState::Rolled {
                    dice_result,
                    selected_option: self.alternatives[index - 1].clone(),
                    rolled_at: now,
                };
                Ok(())
            }
        }
    }

    /// Record whether the owner followed through.
    ///
    /// Valid from `Rolled` and from `Resolved` (a second mark overwrites the
    /// first; stat accounting of repeated marks is the caller's concern).
    pub fn resolve(&mut self, implemented: bool, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match &self.state {
            DecisionState::Created => Err(TransitionError::NotRolled),
            DecisionState::Rolled {
                dice_result,
                selected_option,
                rolled_at,
            } => {
                self.state = DecisionState::Resolved {
                    dice_result: *dice_result,
                    selected_option: selected_option.clone(),
                    implemented,
                    rolled_at: *rolled_at,
                    resolved_at: now,
                };
                Ok(())
            }
            DecisionState::Resolved {
                dice_result,
                selected_option,
                rolled_at,
                ..
            } => {
                self.state = DecisionState::Resolved {
                    dice_result: *dice_result,
                    selected_option: selected_option.clone(),
                    implemented,
                    rolled_at: *rolled_at,
                    resolved_at: now,
                };
                Ok(())
            }
        }
    }
}
