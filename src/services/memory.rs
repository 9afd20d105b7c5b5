use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    MatchTx, MutualMatchStore, MutualUpsert, PreferenceStore, ProfileMatchStore, ProfileStore, StoreError, TransactionCoordinator,
};
use crate::core::filters::matches_candidate_query;
use crate::core::CanonicalPair;
use crate::models::{
    CandidatePage, CandidateQuery, MutualMatch, NewPartnerPreference, PartnerPreference, PartnerPreferencePatch,
    Profile, ProfileMatch,
};

#[derive(Debug, Clone, Default)]
struct State {
    profiles: BTreeMap<i64, Profile>,
    /// Keyed by owning profile id
    preferences: BTreeMap<i64, PartnerPreference>,
    profile_matches: Vec<ProfileMatch>,
    mutual_matches: Vec<MutualMatch>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn live_profile(&self, profile_id: i64) -> Option<&Profile> {
        self.profiles.get(&profile_id).filter(|p| !p.is_deleted)
    }

    fn find_active_edge(&self, actor_profile_id: i64, target_profile_id: i64) -> Option<ProfileMatch> {
        self.profile_matches
            .iter()
            .find(|m| !m.is_deleted && m.actor_profile_id == actor_profile_id && m.target_profile_id == target_profile_id)
            .cloned()
    }

    fn insert_edge(
        &mut self,
        actor_profile_id: i64,
        target_profile_id: i64,
        is_liked: bool,
    ) -> Result<ProfileMatch, StoreError> {
        if self.find_active_edge(actor_profile_id, target_profile_id).is_some() {
            return Err(StoreError::Conflict(format!(
                "active edge {} -> {} already exists",
                actor_profile_id, target_profile_id
            )));
        }

        let now = Utc::now();
        let edge = ProfileMatch {
            id: self.next_id(),
            actor_profile_id,
            target_profile_id,
            is_liked,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.profile_matches.push(edge.clone());
        Ok(edge)
    }

    fn update_edge(&mut self, id: i64, is_liked: bool) -> Result<(), StoreError> {
        let edge = self
            .profile_matches
            .iter_mut()
            .find(|m| m.id == id && !m.is_deleted)
            .ok_or_else(|| StoreError::NotFound(format!("profile match {}", id)))?;

        edge.is_liked = is_liked;
        edge.updated_at = Utc::now();
        Ok(())
    }

    fn find_mutual(&self, pair: CanonicalPair) -> Option<&MutualMatch> {
        self.mutual_matches
            .iter()
            .find(|m| m.user_id_low == pair.low() && m.user_id_high == pair.high())
    }

    fn upsert_mutual(&mut self, pair: CanonicalPair) -> MutualUpsert {
        let now = Utc::now();
        if let Some(existing) = self
            .mutual_matches
            .iter_mut()
            .find(|m| m.user_id_low == pair.low() && m.user_id_high == pair.high())
        {
            let activated = !existing.is_active;
            if activated {
                existing.is_active = true;
                existing.matched_at = now;
            }
            return MutualUpsert {
                mutual: existing.clone(),
                activated,
            };
        }

        let created = MutualMatch {
            id: self.next_id(),
            user_id_low: pair.low(),
            user_id_high: pair.high(),
            is_active: true,
            matched_at: now,
        };
        self.mutual_matches.push(created.clone());
        MutualUpsert {
            mutual: created,
            activated: true,
        }
    }

    fn deactivate_mutual(&mut self, pair: CanonicalPair) {
        for m in self
            .mutual_matches
            .iter_mut()
            .filter(|m| m.user_id_low == pair.low() && m.user_id_high == pair.high())
        {
            m.is_active = false;
        }
    }
}

/// In-memory implementation of every match-making store.
///
/// Transactions hold the state lock for the whole unit of work and apply a
/// staged copy on commit, so they are serialized against each other and
/// against plain writes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile, assigning an id when `profile.id == 0`
    pub async fn put_profile(&self, mut profile: Profile) -> Profile {
        let mut state = self.state.lock().await;
        if profile.id == 0 {
            profile.id = state.next_id();
        } else if profile.id > state.next_id {
            state.next_id = profile.id;
        }
        state.profiles.insert(profile.id, profile.clone());
        profile
    }

    pub async fn soft_delete_profile(&self, profile_id: i64) -> bool {
        let mut state = self.state.lock().await;
        match state.profiles.get_mut(&profile_id) {
            Some(profile) => {
                profile.is_deleted = true;
                profile.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Make every subsequent transaction roll back after its work succeeds
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every edge row, active or not
    pub async fn profile_matches(&self) -> Vec<ProfileMatch> {
        self.state.lock().await.profile_matches.clone()
    }

    /// Snapshot of every mutual match row, active or not
    pub async fn mutual_matches(&self) -> Vec<MutualMatch> {
        self.state.lock().await.mutual_matches.clone()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .values()
            .find(|p| p.user_id == user_id && !p.is_deleted)
            .cloned())
    }

    async fn get_by_id(&self, profile_id: i64) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.lock().await.live_profile(profile_id).cloned())
    }

    async fn exists(&self, profile_id: i64) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.live_profile(profile_id).is_some())
    }

    async fn search_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, StoreError> {
        let state = self.state.lock().await;

        // BTreeMap iteration is already ordered by profile id
        let matching: Vec<&Profile> = state
            .profiles
            .values()
            .filter(|p| matches_candidate_query(p, query))
            .collect();

        let total_count = matching.len() as i64;
        let profiles = matching
            .into_iter()
            .skip(usize::try_from(query.offset.max(0)).unwrap_or(usize::MAX))
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok(CandidatePage { profiles, total_count })
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn get_by_profile_id(&self, profile_id: i64) -> Result<Option<PartnerPreference>, StoreError> {
        Ok(self.state.lock().await.preferences.get(&profile_id).cloned())
    }

    async fn create(&self, profile_id: i64, new: &NewPartnerPreference) -> Result<PartnerPreference, StoreError> {
        let mut state = self.state.lock().await;
        if state.preferences.contains_key(&profile_id) {
            return Err(StoreError::Conflict(format!(
                "partner preferences already exist for profile {}",
                profile_id
            )));
        }

        let now = Utc::now();
        let pref = PartnerPreference {
            id: state.next_id(),
            profile_id,
            min_age: new.min_age,
            max_age: new.max_age,
            min_height_cm: new.min_height_cm,
            max_height_cm: new.max_height_cm,
            communities: new.communities.clone(),
            marital_statuses: new.marital_statuses.clone(),
            professions: new.professions.clone(),
            profession_types: new.profession_types.clone(),
            education_levels: new.education_levels.clone(),
            districts: new.districts.clone(),
            created_at: now,
            updated_at: now,
        };
        pref.check_ranges().map_err(StoreError::Rejected)?;
        state.preferences.insert(profile_id, pref.clone());
        Ok(pref)
    }

    async fn update(&self, profile_id: i64, patch: &PartnerPreferencePatch) -> Result<PartnerPreference, StoreError> {
        let mut state = self.state.lock().await;
        let pref = state
            .preferences
            .get_mut(&profile_id)
            .ok_or_else(|| StoreError::NotFound(format!("partner preferences for profile {}", profile_id)))?;

        let mut patched = pref.clone();
        patch.apply_to(&mut patched);
        patched.check_ranges().map_err(StoreError::Rejected)?;

        patched.updated_at = Utc::now();
        *pref = patched.clone();
        Ok(patched)
    }
}

#[async_trait]
impl ProfileMatchStore for InMemoryStore {
    async fn find_active(&self, actor_profile_id: i64, target_profile_id: i64)
        -> Result<Option<ProfileMatch>, StoreError> {
        Ok(self.state.lock().await.find_active_edge(actor_profile_id, target_profile_id))
    }

    async fn create(&self, actor_profile_id: i64, target_profile_id: i64, is_liked: bool)
        -> Result<ProfileMatch, StoreError> {
        self.state.lock().await.insert_edge(actor_profile_id, target_profile_id, is_liked)
    }

    async fn update_liked(&self, id: i64, is_liked: bool) -> Result<(), StoreError> {
        self.state.lock().await.update_edge(id, is_liked)
    }

    async fn list_targets(&self, actor_profile_id: i64, is_liked: Option<bool>) -> Result<Vec<i64>, StoreError> {
        let state = self.state.lock().await;
        let mut edges: Vec<&ProfileMatch> = state
            .profile_matches
            .iter()
            .filter(|m| !m.is_deleted && m.actor_profile_id == actor_profile_id)
            .filter(|m| is_liked.map_or(true, |liked| m.is_liked == liked))
            .collect();

        edges.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        Ok(edges.into_iter().map(|m| m.target_profile_id).collect())
    }
}

#[async_trait]
impl MutualMatchStore for InMemoryStore {
    async fn find_active(&self, pair: CanonicalPair) -> Result<Option<MutualMatch>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.find_mutual(pair).filter(|m| m.is_active).cloned())
    }

    async fn list_counterparts(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let state = self.state.lock().await;
        let mut active: Vec<&MutualMatch> = state
            .mutual_matches
            .iter()
            .filter(|m| m.is_active)
            .filter(|m| m.counterpart_of(user_id).is_some())
            .collect();

        active.sort_by(|a, b| b.matched_at.cmp(&a.matched_at).then_with(|| b.id.cmp(&a.id)));
        Ok(active.into_iter().filter_map(|m| m.counterpart_of(user_id)).collect())
    }
}

/// Staged view of the state inside `with_transaction`
struct MemoryTx<'a> {
    state: &'a mut State,
}

#[async_trait]
impl MatchTx for MemoryTx<'_> {
    async fn find_active_profile_match(&mut self, actor_profile_id: i64, target_profile_id: i64)
        -> Result<Option<ProfileMatch>, StoreError> {
        Ok(self.state.find_active_edge(actor_profile_id, target_profile_id))
    }

    async fn create_profile_match(&mut self, actor_profile_id: i64, target_profile_id: i64, is_liked: bool)
        -> Result<ProfileMatch, StoreError> {
        self.state.insert_edge(actor_profile_id, target_profile_id, is_liked)
    }

    async fn update_profile_match(&mut self, id: i64, is_liked: bool) -> Result<(), StoreError> {
        self.state.update_edge(id, is_liked)
    }

    async fn upsert_mutual_match(&mut self, pair: CanonicalPair) -> Result<MutualUpsert, StoreError> {
        Ok(self.state.upsert_mutual(pair))
    }

    async fn deactivate_mutual_match(&mut self, pair: CanonicalPair) -> Result<(), StoreError> {
        self.state.deactivate_mutual(pair);
        Ok(())
    }
}

#[async_trait]
impl TransactionCoordinator for InMemoryStore {
    async fn with_transaction<R, F>(&self, work: F) -> Result<R, StoreError>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut dyn MatchTx) -> BoxFuture<'t, Result<R, StoreError>> + Send,
    {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();

        let value = {
            let mut unit = MemoryTx { state: &mut staged };
            let handle: &mut dyn MatchTx = &mut unit;
            work(handle).await?
        };

        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Conflict("commit rejected".to_string()));
        }

        *state = staged;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transaction_commits_staged_writes() {
        let store = InMemoryStore::new();
        let pair = CanonicalPair::new(Uuid::new_v4(), Uuid::new_v4());

        store
            .with_transaction(move |tx| {
                Box::pin(async move {
                    tx.upsert_mutual_match(pair).await?;
                    tx.create_profile_match(1, 2, true).await?;
                    Ok(())
                })
            })
            .await
            .unwrap();

        assert!(MutualMatchStore::find_active(&store, pair).await.unwrap().is_some());
        assert!(ProfileMatchStore::find_active(&store, 1, 2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_transaction_discards_on_error() {
        let store = InMemoryStore::new();
        let pair = CanonicalPair::new(Uuid::new_v4(), Uuid::new_v4());

        let result = store
            .with_transaction(move |tx| {
                Box::pin(async move {
                    tx.upsert_mutual_match(pair).await?;
                    tx.create_profile_match(1, 2, true).await?;
                    // Second insert for the same ordered pair violates uniqueness
                    tx.create_profile_match(1, 2, false).await?;
                    Ok(())
                })
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.mutual_matches().await.is_empty());
        assert!(store.profile_matches().await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_reactivates_single_row() {
        let store = InMemoryStore::new();
        let pair = CanonicalPair::new(Uuid::new_v4(), Uuid::new_v4());

        for active in [true, false, true] {
            store
                .with_transaction(move |tx| {
                    Box::pin(async move {
                        if active {
                            tx.upsert_mutual_match(pair).await?;
                        } else {
                            tx.deactivate_mutual_match(pair).await?;
                        }
                        Ok(())
                    })
                })
                .await
                .unwrap();
        }

        let rows = store.mutual_matches().await;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_active);
    }

    #[tokio::test]
    async fn test_upsert_reports_activation_once() {
        let store = InMemoryStore::new();
        let pair = CanonicalPair::new(Uuid::new_v4(), Uuid::new_v4());

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let upsert = store
                .with_transaction(move |tx| Box::pin(async move { tx.upsert_mutual_match(pair).await }))
                .await
                .unwrap();
            outcomes.push((upsert.activated, upsert.mutual.matched_at));
        }

        assert!(outcomes[0].0);
        assert!(!outcomes[1].0);
        // An already active pair keeps its original match time
        assert_eq!(outcomes[0].1, outcomes[1].1);
    }

    #[tokio::test]
    async fn test_update_rechecks_ranges_against_current_row() {
        let store = InMemoryStore::new();
        let new = NewPartnerPreference {
            min_age: 20,
            max_age: 50,
            min_height_cm: 150,
            max_height_cm: 190,
            communities: Default::default(),
            marital_statuses: Default::default(),
            professions: Default::default(),
            profession_types: Default::default(),
            education_levels: Default::default(),
            districts: Default::default(),
        };
        PreferenceStore::create(&store, 1, &new).await.unwrap();

        let raise_min = PartnerPreferencePatch {
            min_age: Some(40),
            ..PartnerPreferencePatch::default()
        };
        let lower_max = PartnerPreferencePatch {
            max_age: Some(30),
            ..PartnerPreferencePatch::default()
        };

        // Each patch is valid against 20..50, together they invert the range
        PreferenceStore::update(&store, 1, &raise_min).await.unwrap();
        let result = PreferenceStore::update(&store, 1, &lower_max).await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));

        let stored = store.get_by_profile_id(1).await.unwrap().unwrap();
        assert_eq!((stored.min_age, stored.max_age), (40, 50));
    }
}
