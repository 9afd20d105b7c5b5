use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Profile;

/// Redis channels for match notifications
pub mod channels {
    pub const INTEREST_SENT: &str = "lume.match.interest_sent";
    pub const MUTUAL_MATCH_CREATED: &str = "lume.match.mutual_created";
}

const EVENT_SOURCE: &str = "lume-match";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Identity and display data of one side of an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventProfile {
    pub profile_id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub photo_key: Option<String>,
}

impl From<&Profile> for EventProfile {
    fn from(profile: &Profile) -> Self {
        Self {
            profile_id: profile.id,
            user_id: profile.user_id,
            name: profile.name.clone(),
            photo_key: profile.photo_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterestSent {
    pub sender: EventProfile,
    pub recipient: EventProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MutualMatchCreated {
    /// The profile whose like completed the match
    pub initiator: EventProfile,
    pub counterpart: EventProfile,
    pub matched_at: DateTime<Utc>,
}

/// Envelope published on every channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<T> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: EVENT_SOURCE.to_string(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Fire-and-forget notifications for downstream consumers
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_interest_sent(&self, event: &InterestSent) -> Result<(), PublishError>;

    async fn publish_mutual_match_created(&self, event: &MutualMatchCreated) -> Result<(), PublishError>;
}

/// Publishes JSON envelopes with Redis `PUBLISH`
pub struct RedisEventPublisher {
    // ConnectionManager reconnects on its own; the mutex only serializes use
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
}

impl RedisEventPublisher {
    pub async fn new(redis_url: &str) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
        })
    }

    async fn publish<T: Serialize + Sync>(&self, channel: &str, event: &Event<T>) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;

        let mut conn = self.redis.lock().await;
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        tracing::debug!("Published {} on {} ({} receivers)", event.event_type, channel, receivers);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish_interest_sent(&self, event: &InterestSent) -> Result<(), PublishError> {
        let envelope = Event::new("interest_sent", event).with_user(event.sender.user_id);
        self.publish(channels::INTEREST_SENT, &envelope).await
    }

    async fn publish_mutual_match_created(&self, event: &MutualMatchCreated) -> Result<(), PublishError> {
        let envelope = Event::new("mutual_match_created", event).with_user(event.initiator.user_id);
        self.publish(channels::MUTUAL_MATCH_CREATED, &envelope).await
    }
}

/// Logs events instead of publishing them; used when Redis is not configured
#[derive(Debug, Default, Clone)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish_interest_sent(&self, event: &InterestSent) -> Result<(), PublishError> {
        tracing::info!(
            sender = event.sender.profile_id,
            recipient = event.recipient.profile_id,
            "interest sent"
        );
        Ok(())
    }

    async fn publish_mutual_match_created(&self, event: &MutualMatchCreated) -> Result<(), PublishError> {
        tracing::info!(
            initiator = event.initiator.profile_id,
            counterpart = event.counterpart.profile_id,
            "mutual match created"
        );
        Ok(())
    }
}
