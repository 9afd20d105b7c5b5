//! Lume Match - match-making core for the Lume introduction platform
//!
//! Records directional like/pass actions between member profiles, keeps
//! mutual matches consistent with them, and builds the filtered, paginated
//! recommendation and history lists.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{MatchActionEngine, MatchError, PreferenceService, RecommendationEngine};
pub use crate::models::{MatchAction, Profile, ProfilePage};
pub use crate::services::{InMemoryStore, PostgresStore, Stores};
