use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{with_deadline, CanonicalPair, MatchError};
use crate::models::{MatchAction, Profile, ProfileMatch};
use crate::services::events::EventProfile;
use crate::services::{
    EventPublisher, InterestSent, MatchTx, MutualMatchCreated, MutualMatchStore, MutualUpsert, ProfileMatchStore,
    ProfileStore, StoreError, Stores, TransactionCoordinator,
};

/// Tunables for the match action engine
#[derive(Debug, Clone, Copy)]
pub struct ActionOptions {
    /// Re-read the reverse edge after a plain like so that two concurrent
    /// opposite likes still end in a mutual match
    pub recheck_reverse_like: bool,
    pub operation_timeout: Option<Duration>,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            recheck_reverse_like: true,
            operation_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Notification to send once the state change is durable
enum Notification {
    InterestSent(InterestSent),
    MutualMatchCreated(MutualMatchCreated),
}

/// Records like/pass actions and keeps mutual matches in step with the
/// directional edges.
///
/// A mutual match is active only while both edges are liked. Paired writes
/// (mutual row plus actor edge) always go through one transaction.
pub struct MatchActionEngine<T> {
    profiles: Arc<dyn ProfileStore>,
    profile_matches: Arc<dyn ProfileMatchStore>,
    mutual_matches: Arc<dyn MutualMatchStore>,
    transactions: Arc<T>,
    events: Arc<dyn EventPublisher>,
    options: ActionOptions,
}

impl<T> Clone for MatchActionEngine<T> {
    fn clone(&self) -> Self {
        Self {
            profiles: Arc::clone(&self.profiles),
            profile_matches: Arc::clone(&self.profile_matches),
            mutual_matches: Arc::clone(&self.mutual_matches),
            transactions: Arc::clone(&self.transactions),
            events: Arc::clone(&self.events),
            options: self.options,
        }
    }
}

impl<T: TransactionCoordinator> MatchActionEngine<T> {
    pub fn new(stores: &Stores<T>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            profiles: Arc::clone(&stores.profiles),
            profile_matches: Arc::clone(&stores.profile_matches),
            mutual_matches: Arc::clone(&stores.mutual_matches),
            transactions: Arc::clone(&stores.transactions),
            events,
            options: ActionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ActionOptions) -> Self {
        self.options = options;
        self
    }

    /// Record that the actor likes or passes on the target profile.
    ///
    /// Returns `Ok(true)` once the action is durable. Event publication
    /// happens afterwards and never fails the call.
    pub async fn record_match_action(
        &self,
        actor_user_id: Uuid,
        target_profile_id: i64,
        action: MatchAction,
    ) -> Result<bool, MatchError> {
        let notification = with_deadline(
            self.options.operation_timeout,
            self.apply_action(actor_user_id, target_profile_id, action),
        )
        .await?;

        if let Some(notification) = notification {
            self.publish(notification).await;
        }

        Ok(true)
    }

    async fn apply_action(
        &self,
        actor_user_id: Uuid,
        target_profile_id: i64,
        action: MatchAction,
    ) -> Result<Option<Notification>, MatchError> {
        let actor = self
            .profiles
            .get_by_user_id(actor_user_id)
            .await?
            .ok_or_else(|| MatchError::ProfileNotFound(format!("no profile for user {}", actor_user_id)))?;

        let target = self
            .profiles
            .get_by_id(target_profile_id)
            .await?
            .ok_or_else(|| MatchError::ProfileNotFound(format!("profile {}", target_profile_id)))?;

        if actor.id == target.id {
            return Err(MatchError::InvalidMatchAction(
                "cannot like or pass on your own profile".to_string(),
            ));
        }

        let pair = CanonicalPair::new(actor.user_id, target.user_id);

        if self.mutual_matches.find_active(pair).await?.is_some() {
            return match action {
                MatchAction::Like => {
                    debug!("Profiles {} and {} already matched", actor.id, target.id);
                    Ok(None)
                }
                MatchAction::Pass => {
                    self.deactivate_mutual(&actor, &target, pair).await?;
                    Ok(None)
                }
            };
        }

        let reverse_liked = self.reverse_edge_liked(&actor, &target).await?;

        if reverse_liked && action.is_like() {
            let upsert = self.activate_mutual(&actor, &target, pair).await?;
            return Ok(mutual_notification(&actor, &target, &upsert));
        }

        let edge = upsert_profile_match(
            self.profile_matches.as_ref(),
            None,
            actor.id,
            target.id,
            action.is_like(),
        )
        .await?;

        debug!(
            "Recorded {} from profile {} on profile {} (edge {})",
            action, actor.id, target.id, edge.id
        );

        if !action.is_like() {
            return Ok(None);
        }

        // The other side may have liked us between the first read and our write
        if self.options.recheck_reverse_like && self.reverse_edge_liked(&actor, &target).await? {
            info!(
                "Reverse like from profile {} landed concurrently; completing match",
                target.id
            );
            let upsert = self.activate_mutual(&actor, &target, pair).await?;
            return Ok(mutual_notification(&actor, &target, &upsert));
        }

        Ok(Some(Notification::InterestSent(InterestSent {
            sender: EventProfile::from(&actor),
            recipient: EventProfile::from(&target),
        })))
    }

    async fn reverse_edge_liked(&self, actor: &Profile, target: &Profile) -> Result<bool, StoreError> {
        let reverse = self.profile_matches.find_active(target.id, actor.id).await?;
        Ok(reverse.is_some_and(|edge| edge.is_liked))
    }

    /// Create or reactivate the mutual match and mark the actor edge liked
    async fn activate_mutual(
        &self,
        actor: &Profile,
        target: &Profile,
        pair: CanonicalPair,
    ) -> Result<MutualUpsert, StoreError> {
        let edges = Arc::clone(&self.profile_matches);
        let (actor_id, target_id) = (actor.id, target.id);

        let upsert = self
            .transactions
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let upsert = tx.upsert_mutual_match(pair).await?;
                    upsert_profile_match(edges.as_ref(), Some(tx), actor_id, target_id, true).await?;
                    Ok(upsert)
                })
            })
            .await?;

        if upsert.activated {
            info!("Mutual match {} active between profiles {} and {}", pair, actor_id, target_id);
        } else {
            debug!("Mutual match {} was already active", pair);
        }
        Ok(upsert)
    }

    /// Deactivate the mutual match and flip the actor edge to passed.
    /// The counterpart's edge is left as it is.
    async fn deactivate_mutual(&self, actor: &Profile, target: &Profile, pair: CanonicalPair) -> Result<(), StoreError> {
        let edges = Arc::clone(&self.profile_matches);
        let (actor_id, target_id) = (actor.id, target.id);

        self.transactions
            .with_transaction(move |tx| {
                Box::pin(async move {
                    tx.deactivate_mutual_match(pair).await?;
                    upsert_profile_match(edges.as_ref(), Some(tx), actor_id, target_id, false).await?;
                    Ok(())
                })
            })
            .await?;

        info!("Mutual match {} deactivated by profile {}", pair, actor_id);
        Ok(())
    }

    async fn publish(&self, notification: Notification) {
        let publish = async {
            match &notification {
                Notification::InterestSent(event) => self.events.publish_interest_sent(event).await,
                Notification::MutualMatchCreated(event) => self.events.publish_mutual_match_created(event).await,
            }
        };

        let outcome = match self.options.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, publish).await.ok(),
            None => Some(publish.await),
        };

        match outcome {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!("Failed to publish match event: {}", e),
            None => warn!("Timed out publishing match event"),
        }
    }
}

/// Only the action that flipped the pair to active announces it
fn mutual_notification(actor: &Profile, target: &Profile, upsert: &MutualUpsert) -> Option<Notification> {
    upsert.activated.then(|| {
        Notification::MutualMatchCreated(MutualMatchCreated {
            initiator: EventProfile::from(actor),
            counterpart: EventProfile::from(target),
            matched_at: upsert.mutual.matched_at,
        })
    })
}

/// Set the actor's edge towards the target, creating it if needed.
///
/// With `Some(tx)` every read and write goes through the open transaction and
/// `store` is not touched.
pub async fn upsert_profile_match(
    store: &dyn ProfileMatchStore,
    tx: Option<&mut dyn MatchTx>,
    actor_profile_id: i64,
    target_profile_id: i64,
    is_liked: bool,
) -> Result<ProfileMatch, StoreError> {
    match tx {
        Some(tx) => match tx.find_active_profile_match(actor_profile_id, target_profile_id).await? {
            Some(mut edge) => {
                tx.update_profile_match(edge.id, is_liked).await?;
                edge.is_liked = is_liked;
                Ok(edge)
            }
            None => tx.create_profile_match(actor_profile_id, target_profile_id, is_liked).await,
        },
        None => match store.find_active(actor_profile_id, target_profile_id).await? {
            Some(mut edge) => {
                store.update_liked(edge.id, is_liked).await?;
                edge.is_liked = is_liked;
                Ok(edge)
            }
            None => store.create(actor_profile_id, target_profile_id, is_liked).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryStore, LogEventPublisher};
    use chrono::{NaiveDate, Utc};

    use crate::models::{EducationLevel, MaritalStatus, ProfessionType};

    fn profile(user: u128, is_bride: bool) -> Profile {
        let now = Utc::now();
        Profile {
            id: 0,
            user_id: Uuid::from_u128(user),
            name: format!("Member {}", user),
            is_bride,
            date_of_birth: NaiveDate::from_ymd_opt(1995, 6, 1).unwrap(),
            height_cm: 165,
            community: "c1".to_string(),
            marital_status: MaritalStatus::NeverMarried,
            profession: "engineer".to_string(),
            profession_type: ProfessionType::Private,
            education_level: EducationLevel::Bachelors,
            district: "d1".to_string(),
            photo_key: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, MatchActionEngine<InMemoryStore>, Profile, Profile) {
        let store = Arc::new(InMemoryStore::new());
        let a = store.put_profile(profile(1, false)).await;
        let b = store.put_profile(profile(2, true)).await;
        let engine = MatchActionEngine::new(&Stores::from_backend(store.clone()), Arc::new(LogEventPublisher));
        (store, engine, a, b)
    }

    #[tokio::test]
    async fn test_upsert_without_transaction() {
        let store = InMemoryStore::new();

        let created = upsert_profile_match(&store, None, 1, 2, true).await.unwrap();
        let updated = upsert_profile_match(&store, None, 1, 2, false).await.unwrap();

        assert_eq!(created.id, updated.id);
        assert!(!updated.is_liked);
        assert_eq!(store.profile_matches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mutual_then_pass() {
        let (store, engine, a, b) = setup().await;

        engine.record_match_action(a.user_id, b.id, MatchAction::Like).await.unwrap();
        engine.record_match_action(b.user_id, a.id, MatchAction::Like).await.unwrap();
        assert!(store.mutual_matches().await[0].is_active);

        engine.record_match_action(a.user_id, b.id, MatchAction::Pass).await.unwrap();

        let mutuals = store.mutual_matches().await;
        assert_eq!(mutuals.len(), 1);
        assert!(!mutuals[0].is_active);

        let reverse = ProfileMatchStore::find_active(store.as_ref(), b.id, a.id).await.unwrap().unwrap();
        assert!(reverse.is_liked);
    }

    #[tokio::test]
    async fn test_self_action_rejected() {
        let (_store, engine, a, _b) = setup().await;

        let result = engine.record_match_action(a.user_id, a.id, MatchAction::Like).await;
        assert!(matches!(result, Err(MatchError::InvalidMatchAction(_))));
    }

    #[tokio::test]
    async fn test_unknown_profiles() {
        let (_store, engine, a, _b) = setup().await;

        let missing_actor = engine.record_match_action(Uuid::from_u128(99), a.id, MatchAction::Like).await;
        assert!(matches!(missing_actor, Err(MatchError::ProfileNotFound(_))));

        let missing_target = engine.record_match_action(a.user_id, 999, MatchAction::Like).await;
        assert!(matches!(missing_target, Err(MatchError::ProfileNotFound(_))));
    }
}
