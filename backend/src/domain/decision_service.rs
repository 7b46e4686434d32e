//! Decision lifecycle orchestration: create, roll, implement, list.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::decision::{ALTERNATIVE_COUNT, Decision, DecisionState, PrivacyLevel};
use super::error::{ApiResult, Error};
use super::ports::{AlternativeSource, DecisionStore, UserStore};
use super::quota::QuotaOutcome;
use super::user::{User, UserSummary};

/// Substituted whenever the generator fails or times out. A decision is
/// never refused because the generator misbehaved.
pub const FALLBACK_ALTERNATIVES: [&str; ALTERNATIVE_COUNT] = [
    "Try your first instinct",
    "Look for another way",
    "Wait and think it over",
    "Gather your courage and decide",
];

/// Behaviour toggles left open by the product.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    /// When true (the default), rolling an already-rolled
    /// decision overwrites the previous result.
    pub allow_reroll: bool,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self { allow_reroll: true }
    }
}

/// Public-feed entry: a rolled decision joined with its owner's summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicDecision {
    pub id: String,
    pub user: UserSummary,
    pub text: String,
    pub selected_option: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implemented: Option<bool>,
    pub created_at: DateTime<Utc>,
}

pub struct DecisionService {
    decisions: Arc<dyn DecisionStore>,
    users: Arc<dyn UserStore>,
    generator: Arc<dyn AlternativeSource>,
    policy: DecisionPolicy,
}

impl DecisionService {
    pub fn new(
        decisions: Arc<dyn DecisionStore>,
        users: Arc<dyn UserStore>,
        generator: Arc<dyn AlternativeSource>,
        policy: DecisionPolicy,
    ) -> Self {
        Self {
            decisions,
            users,
            generator,
            policy,
        }
    }

    /// Create a decision: consume quota, generate alternatives, persist.
    ///
    /// Quota is consumed before the generator call so concurrent requests
    /// cannot multiply expensive upstream calls past the allowance.
    pub async fn create(
        &self,
        owner: &User,
        text: &str,
        privacy: PrivacyLevel,
    ) -> ApiResult<Decision> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::invalid_request("Decision text must not be empty"));
        }

        let today = Local::now().date_naive();
        match self.users.try_consume_quota(&owner.id, today).await? {
            Some(QuotaOutcome::Allowed) => {}
            Some(QuotaOutcome::Exhausted) => {
                return Err(Error::forbidden("Daily decision limit reached"));
            }
            None => return Err(Error::not_found("User not found")),
        }

        let alternatives = match self.generator.generate(text).await {
            Ok(alternatives) => alternatives,
            Err(err) => {
                warn!(error = %err, "alternative generator failed; using fallback list");
                FALLBACK_ALTERNATIVES.map(str::to_string)
            }
        };

        let decision = Decision::new(&owner.id, text, alternatives, privacy);
        self.decisions.insert_decision(decision.clone()).await?;
        Ok(decision)
    }

    /// Roll the dice on one of the caller's decisions.
    ///
    /// Foreign and unknown decisions are indistinguishable: both are
    /// `NotFound`.
    pub async fn roll(&self, owner_id: &str, decision_id: &str) -> ApiResult<(u8, String)> {
        let mut decision = self.owned_decision(owner_id, decision_id).await?;
        if matches!(decision.state, DecisionState::Rolled { .. }) && !self.policy.allow_reroll {
            return Err(Error::invalid_request("Decision has already been rolled"));
        }

        let dice_result = rand::thread_rng().gen_range(1..=ALTERNATIVE_COUNT as u8);
        decision
            .apply_roll(dice_result, Utc::now())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let selected = decision
            .selected_option()
            .map(str::to_string)
            .unwrap_or_default();
        self.decisions.update_decision(decision).await?;
        Ok((dice_result, selected))
    }

    /// Mark whether the owner followed through.
    ///
    /// Every call bumps the owner's `total_decisions`; the accounting is
    /// not idempotent by contract.
    pub async fn implement(
        &self,
        owner_id: &str,
        decision_id: &str,
        implemented: bool,
    ) -> ApiResult<bool> {
        let mut decision = self.owned_decision(owner_id, decision_id).await?;
        decision
            .resolve(implemented, Utc::now())
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        self.decisions.update_decision(decision).await?;
        self.users
            .record_decision_outcome(owner_id, implemented)
            .await?;
        Ok(implemented)
    }

    /// The caller's decisions, most recent first.
    pub async fn history(&self, owner_id: &str) -> ApiResult<Vec<Decision>> {
        Ok(self.decisions.decisions_for_user(owner_id).await?)
    }

    /// Public decisions with a roll present, joined with owner summaries.
    pub async fn public_feed(&self, skip: usize, limit: usize) -> ApiResult<Vec<PublicDecision>> {
        let decisions = self.decisions.public_rolled(skip, limit).await?;
        let mut feed = Vec::with_capacity(decisions.len());
        for decision in decisions {
            let Some(owner) = self.users.user_by_id(&decision.user_id).await? else {
                continue;
            };
            let Some(selected) = decision.selected_option().map(str::to_string) else {
                continue;
            };
            feed.push(PublicDecision {
                id: decision.id.clone(),
                user: owner.summary(),
                text: decision.text.clone(),
                selected_option: selected,
                implemented: decision.implemented(),
                created_at: decision.created_at,
            });
        }
        Ok(feed)
    }

    async fn owned_decision(&self, owner_id: &str, decision_id: &str) -> ApiResult<Decision> {
        match self.decisions.decision_by_id(decision_id).await? {
            Some(decision) if decision.user_id == owner_id => Ok(decision),
            _ => Err(Error::not_found("Decision not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::FixtureAlternativeSource;
    use crate::domain::ports::test_support::FailingSource;
    use crate::domain::user::Subscription;
    use crate::outbound::memory::MemoryStore;

    async fn seeded_user(store: &Arc<MemoryStore>, username: &str) -> User {
        let user = User::new(
            username,
            format!("{username}@example.com"),
            "hash",
            username.to_uppercase(),
            "https://example.com/a.png",
            Subscription::free(3),
        );
        store.insert_user(user.clone()).await.expect("seed user");
        user
    }

    fn service(store: &Arc<MemoryStore>, generator: Arc<dyn AlternativeSource>) -> DecisionService {
        DecisionService::new(
            store.clone(),
            store.clone(),
            generator,
            DecisionPolicy::default(),
        )
    }

    #[tokio::test]
    async fn create_persists_four_alternatives() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));

        let decision = service
            .create(&user, "what should I cook?", PrivacyLevel::Public)
            .await
            .expect("create");
        assert_eq!(decision.alternatives.len(), ALTERNATIVE_COUNT);
        assert_eq!(decision.state, DecisionState::Created);
    }

    #[tokio::test]
    async fn generator_failure_substitutes_the_fallback_list() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FailingSource));

        let decision = service
            .create(&user, "what should I cook?", PrivacyLevel::Private)
            .await
            .expect("create despite generator failure");
        assert_eq!(
            decision.alternatives,
            FALLBACK_ALTERNATIVES.map(str::to_string)
        );
    }

    #[tokio::test]
    async fn quota_exhaustion_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));

        for _ in 0..3 {
            service
                .create(&user, "lunch?", PrivacyLevel::Public)
                .await
                .expect("within quota");
        }
        let err = service
            .create(&user, "lunch?", PrivacyLevel::Public)
            .await
            .expect_err("fourth create");
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn roll_returns_a_valid_dice_and_matching_option() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));
        let decision = service
            .create(&user, "lunch?", PrivacyLevel::Public)
            .await
            .expect("create");

        let (dice, selected) = service.roll(&user.id, &decision.id).await.expect("roll");
        assert!((1..=4).contains(&dice));
        assert_eq!(selected, decision.alternatives[usize::from(dice) - 1]);
    }

    #[tokio::test]
    async fn roll_by_another_user_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let mallory = seeded_user(&store, "mallory").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));
        let decision = service
            .create(&alice, "lunch?", PrivacyLevel::Public)
            .await
            .expect("create");

        let err = service
            .roll(&mallory.id, &decision.id)
            .await
            .expect_err("foreign roll");
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn reroll_policy_gate_rejects_second_roll() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = DecisionService::new(
            store.clone(),
            store.clone(),
            Arc::new(FixtureAlternativeSource),
            DecisionPolicy {
                allow_reroll: false,
            },
        );
        let decision = service
            .create(&user, "lunch?", PrivacyLevel::Public)
            .await
            .expect("create");

        service.roll(&user.id, &decision.id).await.expect("roll");
        let err = service
            .roll(&user.id, &decision.id)
            .await
            .expect_err("re-roll under strict policy");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn implement_twice_counts_twice_and_keeps_last_mark() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));
        let decision = service
            .create(&user, "lunch?", PrivacyLevel::Public)
            .await
            .expect("create");
        service.roll(&user.id, &decision.id).await.expect("roll");

        service
            .implement(&user.id, &decision.id, true)
            .await
            .expect("first mark");
        service
            .implement(&user.id, &decision.id, false)
            .await
            .expect("second mark");

        let stored = store
            .decision_by_id(&decision.id)
            .await
            .expect("fetch")
            .expect("exists");
        assert_eq!(stored.implemented(), Some(false));

        let owner = store
            .user_by_id(&user.id)
            .await
            .expect("fetch user")
            .expect("exists");
        assert_eq!(owner.stats.total_decisions, 2);
        assert_eq!(owner.stats.implemented_decisions, 1);
        assert_eq!(owner.stats.success_rate, 50);
    }

    #[tokio::test]
    async fn implement_before_roll_is_invalid() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));
        let decision = service
            .create(&user, "lunch?", PrivacyLevel::Public)
            .await
            .expect("create");

        let err = service
            .implement(&user.id, &decision.id, true)
            .await
            .expect_err("implement without roll");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn public_feed_only_lists_rolled_public_decisions() {
        let store = Arc::new(MemoryStore::new());
        let user = seeded_user(&store, "alice").await;
        let service = service(&store, Arc::new(FixtureAlternativeSource));

        let public_rolled = service
            .create(&user, "public and rolled", PrivacyLevel::Public)
            .await
            .expect("create");
        service
            .roll(&user.id, &public_rolled.id)
            .await
            .expect("roll");
        service
            .create(&user, "public unrolled", PrivacyLevel::Public)
            .await
            .expect("create");
        let private = service
            .create(&user, "private", PrivacyLevel::Private)
            .await
            .expect("create");
        service.roll(&user.id, &private.id).await.expect("roll");

        let feed = service.public_feed(0, 20).await.expect("feed");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, public_rolled.id);
        assert_eq!(feed[0].user.username, "alice");
    }
}
