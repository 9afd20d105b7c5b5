//! Store and collaborator interfaces consumed by the match-making core,
//! plus their concrete backends.

pub mod events;
pub mod memory;
pub mod photos;
pub mod postgres;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::core::CanonicalPair;
use crate::models::{
    CandidatePage, CandidateQuery, MutualMatch, NewPartnerPreference, PartnerPreference, PartnerPreferencePatch,
    Profile, ProfileMatch,
};

pub use events::{EventPublisher, InterestSent, LogEventPublisher, MutualMatchCreated, PublishError, RedisEventPublisher};
pub use memory::InMemoryStore;
pub use photos::{AppwritePhotoResolver, CachedPhotoResolver, PhotoError, PhotoResolver, StaticPhotoResolver};
pub use postgres::PostgresStore;

/// Errors raised by store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Read access to member profiles. Soft-deleted profiles are never returned.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    async fn get_by_id(&self, profile_id: i64) -> Result<Option<Profile>, StoreError>;

    async fn exists(&self, profile_id: i64) -> Result<bool, StoreError>;

    /// Filtered candidate search ordered by profile id, with the total count
    /// of rows matching the filters before pagination.
    async fn search_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, StoreError>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_by_profile_id(&self, profile_id: i64) -> Result<Option<PartnerPreference>, StoreError>;

    /// Fails with `StoreError::Conflict` if the profile already has preferences
    async fn create(&self, profile_id: i64, new: &NewPartnerPreference) -> Result<PartnerPreference, StoreError>;

    /// Fails with `StoreError::NotFound` if the profile has no preferences and
    /// with `StoreError::Rejected` if the patched ranges are inconsistent
    async fn update(&self, profile_id: i64, patch: &PartnerPreferencePatch) -> Result<PartnerPreference, StoreError>;
}

/// Directional like/pass edges, outside of any transaction
#[async_trait]
pub trait ProfileMatchStore: Send + Sync {
    async fn find_active(&self, actor_profile_id: i64, target_profile_id: i64)
        -> Result<Option<ProfileMatch>, StoreError>;

    async fn create(&self, actor_profile_id: i64, target_profile_id: i64, is_liked: bool)
        -> Result<ProfileMatch, StoreError>;

    async fn update_liked(&self, id: i64, is_liked: bool) -> Result<(), StoreError>;

    /// Targets of the actor's active edges; `None` returns liked and passed
    async fn list_targets(&self, actor_profile_id: i64, is_liked: Option<bool>) -> Result<Vec<i64>, StoreError>;
}

#[async_trait]
pub trait MutualMatchStore: Send + Sync {
    async fn find_active(&self, pair: CanonicalPair) -> Result<Option<MutualMatch>, StoreError>;

    /// The other user of every active mutual match involving `user_id`
    async fn list_counterparts(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
}

/// Writes that take part in an open transaction
#[async_trait]
pub trait MatchTx: Send {
    async fn find_active_profile_match(&mut self, actor_profile_id: i64, target_profile_id: i64)
        -> Result<Option<ProfileMatch>, StoreError>;

    async fn create_profile_match(&mut self, actor_profile_id: i64, target_profile_id: i64, is_liked: bool)
        -> Result<ProfileMatch, StoreError>;

    async fn update_profile_match(&mut self, id: i64, is_liked: bool) -> Result<(), StoreError>;

    /// Create the pair's row or reactivate it
    async fn upsert_mutual_match(&mut self, pair: CanonicalPair) -> Result<MutualUpsert, StoreError>;

    async fn deactivate_mutual_match(&mut self, pair: CanonicalPair) -> Result<(), StoreError>;
}

/// Result of `MatchTx::upsert_mutual_match`
#[derive(Debug, Clone)]
pub struct MutualUpsert {
    pub mutual: MutualMatch,
    /// False when the pair was already active before this call
    pub activated: bool,
}

/// Runs a unit of work atomically: commit on `Ok`, roll back otherwise
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    async fn with_transaction<R, F>(&self, work: F) -> Result<R, StoreError>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut dyn MatchTx) -> BoxFuture<'t, Result<R, StoreError>> + Send;
}

/// Every store the core engines read from, plus the transaction coordinator
pub struct Stores<T> {
    pub profiles: Arc<dyn ProfileStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub profile_matches: Arc<dyn ProfileMatchStore>,
    pub mutual_matches: Arc<dyn MutualMatchStore>,
    pub transactions: Arc<T>,
}

impl<T> Clone for Stores<T> {
    fn clone(&self) -> Self {
        Self {
            profiles: Arc::clone(&self.profiles),
            preferences: Arc::clone(&self.preferences),
            profile_matches: Arc::clone(&self.profile_matches),
            mutual_matches: Arc::clone(&self.mutual_matches),
            transactions: Arc::clone(&self.transactions),
        }
    }
}

impl<B> Stores<B>
where
    B: ProfileStore + PreferenceStore + ProfileMatchStore + MutualMatchStore + TransactionCoordinator + 'static,
{
    /// Use one backend for every store
    pub fn from_backend(backend: Arc<B>) -> Self {
        Self {
            profiles: backend.clone(),
            preferences: backend.clone(),
            profile_matches: backend.clone(),
            mutual_matches: backend.clone(),
            transactions: backend,
        }
    }
}
