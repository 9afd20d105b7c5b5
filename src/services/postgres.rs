use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::time::Duration;
use uuid::Uuid;

use super::{
    MatchTx, MutualMatchStore, MutualUpsert, PreferenceStore, ProfileMatchStore, ProfileStore, StoreError,
    TransactionCoordinator,
};
use crate::core::filters::birth_date_window;
use crate::core::CanonicalPair;
use crate::models::{
    CandidatePage, CandidateQuery, FilterValue, MutualMatch, NewPartnerPreference, PartnerPreference,
    PartnerPreferencePatch, PreferenceFilter, Profile, ProfileMatch,
};

const PROFILE_COLUMNS: &str = r#"
    id, user_id, name, is_bride, date_of_birth, height_cm, community, marital_status,
    profession, profession_type, education_level, district, photo_key, is_deleted,
    created_at, updated_at
"#;

const PREFERENCE_COLUMNS: &str = r#"
    id, profile_id, min_age, max_age, min_height_cm, max_height_cm, communities,
    marital_statuses, professions, profession_types, education_levels, districts,
    created_at, updated_at
"#;

const PROFILE_MATCH_COLUMNS: &str =
    "id, actor_profile_id, target_profile_id, is_liked, is_deleted, created_at, updated_at";

const MUTUAL_MATCH_COLUMNS: &str = "id, user_id_low, user_id_high, is_active, matched_at";

/// PostgreSQL-backed implementation of every match-making store.
///
/// Directional edges live in `profile_matches` (one active row per ordered
/// pair, enforced by a partial unique index) and mutual matches in
/// `mutual_matches` (one row per canonical pair, reactivated in place).
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(settings: &crate::config::DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "Connecting to PostgreSQL"
        );

        Self::new(
            &settings.url,
            settings.max_connections,
            settings.min_connections,
            Duration::from_secs(settings.acquire_timeout_secs),
            Duration::from_secs(settings.idle_timeout_secs),
        )
        .await
    }

    /// Wrap an existing pool; migrations are the caller's concern
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn parse_code<T: FilterValue>(row: &PgRow, column: &str) -> Result<T, StoreError> {
    let code: String = row.try_get(column)?;
    T::from_code(&code).ok_or_else(|| StoreError::InvalidData(format!("{} has unknown value '{}'", column, code)))
}

fn parse_filter<T: FilterValue>(row: &PgRow, column: &str) -> Result<PreferenceFilter<T>, StoreError> {
    let codes: Vec<String> = row.try_get(column)?;
    PreferenceFilter::from_codes(&codes).map_err(|e| StoreError::InvalidData(format!("{}: {}", column, e)))
}

fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
    Ok(Profile {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        is_bride: row.try_get("is_bride")?,
        date_of_birth: row.try_get("date_of_birth")?,
        height_cm: row.try_get("height_cm")?,
        community: row.try_get("community")?,
        marital_status: parse_code(row, "marital_status")?,
        profession: row.try_get("profession")?,
        profession_type: parse_code(row, "profession_type")?,
        education_level: parse_code(row, "education_level")?,
        district: row.try_get("district")?,
        photo_key: row.try_get("photo_key")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn preference_from_row(row: &PgRow) -> Result<PartnerPreference, StoreError> {
    Ok(PartnerPreference {
        id: row.try_get("id")?,
        profile_id: row.try_get("profile_id")?,
        min_age: row.try_get("min_age")?,
        max_age: row.try_get("max_age")?,
        min_height_cm: row.try_get("min_height_cm")?,
        max_height_cm: row.try_get("max_height_cm")?,
        communities: parse_filter(row, "communities")?,
        marital_statuses: parse_filter(row, "marital_statuses")?,
        professions: parse_filter(row, "professions")?,
        profession_types: parse_filter(row, "profession_types")?,
        education_levels: parse_filter(row, "education_levels")?,
        districts: parse_filter(row, "districts")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn profile_match_from_row(row: &PgRow) -> Result<ProfileMatch, StoreError> {
    Ok(ProfileMatch {
        id: row.try_get("id")?,
        actor_profile_id: row.try_get("actor_profile_id")?,
        target_profile_id: row.try_get("target_profile_id")?,
        is_liked: row.try_get("is_liked")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn mutual_match_from_row(row: &PgRow) -> Result<MutualMatch, StoreError> {
    Ok(MutualMatch {
        id: row.try_get("id")?,
        user_id_low: row.try_get("user_id_low")?,
        user_id_high: row.try_get("user_id_high")?,
        is_active: row.try_get("is_active")?,
        matched_at: row.try_get("matched_at")?,
    })
}

/// Map unique violations to `Conflict` so callers can tell races apart
fn conflict_or_database(err: sqlx::Error, what: &str) -> StoreError {
    let unique_violation = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());

    if unique_violation {
        StoreError::Conflict(what.to_string())
    } else {
        StoreError::Database(err)
    }
}

/// Map check-constraint violations to `Rejected`
fn rejected_or_database(err: sqlx::Error, what: &str) -> StoreError {
    let check_violation = err
        .as_database_error()
        .is_some_and(|db| db.is_check_violation());

    if check_violation {
        StoreError::Rejected(what.to_string())
    } else {
        StoreError::Database(err)
    }
}

// Edge and mutual-match statements shared by the pool and transaction paths.

async fn find_active_edge<'e, E: PgExecutor<'e>>(
    executor: E,
    actor_profile_id: i64,
    target_profile_id: i64,
) -> Result<Option<ProfileMatch>, StoreError> {
    let query = format!(
        "SELECT {} FROM profile_matches \
         WHERE actor_profile_id = $1 AND target_profile_id = $2 AND NOT is_deleted",
        PROFILE_MATCH_COLUMNS
    );

    let row = sqlx::query(&query)
        .bind(actor_profile_id)
        .bind(target_profile_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(profile_match_from_row).transpose()
}

async fn insert_edge<'e, E: PgExecutor<'e>>(
    executor: E,
    actor_profile_id: i64,
    target_profile_id: i64,
    is_liked: bool,
) -> Result<ProfileMatch, StoreError> {
    let query = format!(
        "INSERT INTO profile_matches (actor_profile_id, target_profile_id, is_liked, created_at, updated_at) \
         VALUES ($1, $2, $3, NOW(), NOW()) \
         RETURNING {}",
        PROFILE_MATCH_COLUMNS
    );

    let row = sqlx::query(&query)
        .bind(actor_profile_id)
        .bind(target_profile_id)
        .bind(is_liked)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            conflict_or_database(
                e,
                &format!("active edge {} -> {} already exists", actor_profile_id, target_profile_id),
            )
        })?;

    profile_match_from_row(&row)
}

async fn update_edge<'e, E: PgExecutor<'e>>(executor: E, id: i64, is_liked: bool) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE profile_matches
        SET is_liked = $2, updated_at = NOW()
        WHERE id = $1 AND NOT is_deleted
        "#,
    )
    .bind(id)
    .bind(is_liked)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("profile match {}", id)));
    }

    Ok(())
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let query = format!(
            "SELECT {} FROM profiles WHERE user_id = $1 AND NOT is_deleted",
            PROFILE_COLUMNS
        );

        let row = sqlx::query(&query).bind(user_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn get_by_id(&self, profile_id: i64) -> Result<Option<Profile>, StoreError> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1 AND NOT is_deleted", PROFILE_COLUMNS);

        let row = sqlx::query(&query).bind(profile_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn exists(&self, profile_id: i64) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM profiles WHERE id = $1 AND NOT is_deleted)",
        )
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn search_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage, StoreError> {
        let Some(window) = birth_date_window(query.min_age, query.max_age, query.today) else {
            return Ok(CandidatePage { profiles: Vec::new(), total_count: 0 });
        };

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        push_candidate_filters(&mut count_query, query, window);
        let total_count: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page_query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM profiles", PROFILE_COLUMNS));
        push_candidate_filters(&mut page_query, query, window);
        page_query
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = page_query.build().fetch_all(&self.pool).await?;
        let profiles = rows.iter().map(profile_from_row).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Candidate search returned {} of {} profiles (limit {}, offset {})",
            profiles.len(),
            total_count,
            query.limit,
            query.offset
        );

        Ok(CandidatePage { profiles, total_count })
    }
}

fn push_candidate_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &CandidateQuery,
    (earliest_dob, latest_dob): (NaiveDate, NaiveDate),
) {
    builder.push(" WHERE NOT is_deleted AND is_bride = ").push_bind(query.is_bride);

    if !query.exclude_profile_ids.is_empty() {
        builder
            .push(" AND id <> ALL(")
            .push_bind(query.exclude_profile_ids.clone())
            .push(")");
    }

    builder
        .push(" AND date_of_birth BETWEEN ")
        .push_bind(earliest_dob)
        .push(" AND ")
        .push_bind(latest_dob);

    builder
        .push(" AND height_cm BETWEEN ")
        .push_bind(query.min_height_cm)
        .push(" AND ")
        .push_bind(query.max_height_cm);

    push_set_filter(builder, "community", &query.communities);
    push_set_filter(builder, "marital_status", &query.marital_statuses);
    push_set_filter(builder, "profession", &query.professions);
    push_set_filter(builder, "profession_type", &query.profession_types);
    push_set_filter(builder, "education_level", &query.education_levels);
    push_set_filter(builder, "district", &query.districts);
}

fn push_set_filter<T: FilterValue>(
    builder: &mut QueryBuilder<'_, Postgres>,
    column: &'static str,
    filter: &PreferenceFilter<T>,
) {
    if filter.is_any() {
        return;
    }

    builder
        .push(format!(" AND {} = ANY(", column))
        .push_bind(filter.to_codes())
        .push(")");
}

#[async_trait]
impl PreferenceStore for PostgresStore {
    async fn get_by_profile_id(&self, profile_id: i64) -> Result<Option<PartnerPreference>, StoreError> {
        let query = format!(
            "SELECT {} FROM partner_preferences WHERE profile_id = $1",
            PREFERENCE_COLUMNS
        );

        let row = sqlx::query(&query).bind(profile_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(preference_from_row).transpose()
    }

    async fn create(&self, profile_id: i64, new: &NewPartnerPreference) -> Result<PartnerPreference, StoreError> {
        let query = format!(
            r#"
            INSERT INTO partner_preferences
                (profile_id, min_age, max_age, min_height_cm, max_height_cm, communities,
                 marital_statuses, professions, profession_types, education_levels, districts,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            ON CONFLICT (profile_id) DO NOTHING
            RETURNING {}
            "#,
            PREFERENCE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(profile_id)
            .bind(new.min_age)
            .bind(new.max_age)
            .bind(new.min_height_cm)
            .bind(new.max_height_cm)
            .bind(new.communities.to_codes())
            .bind(new.marital_statuses.to_codes())
            .bind(new.professions.to_codes())
            .bind(new.profession_types.to_codes())
            .bind(new.education_levels.to_codes())
            .bind(new.districts.to_codes())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| rejected_or_database(e, "partner preference ranges are inconsistent"))?;

        match row {
            Some(row) => preference_from_row(&row),
            None => Err(StoreError::Conflict(format!(
                "partner preferences already exist for profile {}",
                profile_id
            ))),
        }
    }

    async fn update(&self, profile_id: i64, patch: &PartnerPreferencePatch) -> Result<PartnerPreference, StoreError> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM partner_preferences WHERE profile_id = $1 FOR UPDATE",
            PREFERENCE_COLUMNS
        );
        let row = sqlx::query(&select)
            .bind(profile_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("partner preferences for profile {}", profile_id)))?;

        let mut pref = preference_from_row(&row)?;
        patch.apply_to(&mut pref);
        pref.check_ranges().map_err(StoreError::Rejected)?;

        let update = format!(
            r#"
            UPDATE partner_preferences
            SET min_age = $2, max_age = $3, min_height_cm = $4, max_height_cm = $5,
                communities = $6, marital_statuses = $7, professions = $8,
                profession_types = $9, education_levels = $10, districts = $11,
                updated_at = NOW()
            WHERE profile_id = $1
            RETURNING {}
            "#,
            PREFERENCE_COLUMNS
        );
        let row = sqlx::query(&update)
            .bind(profile_id)
            .bind(pref.min_age)
            .bind(pref.max_age)
            .bind(pref.min_height_cm)
            .bind(pref.max_height_cm)
            .bind(pref.communities.to_codes())
            .bind(pref.marital_statuses.to_codes())
            .bind(pref.professions.to_codes())
            .bind(pref.profession_types.to_codes())
            .bind(pref.education_levels.to_codes())
            .bind(pref.districts.to_codes())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| rejected_or_database(e, "partner preference ranges are inconsistent"))?;

        let updated = preference_from_row(&row)?;
        tx.commit().await?;

        Ok(updated)
    }
}

#[async_trait]
impl ProfileMatchStore for PostgresStore {
    async fn find_active(&self, actor_profile_id: i64, target_profile_id: i64)
        -> Result<Option<ProfileMatch>, StoreError> {
        find_active_edge(&self.pool, actor_profile_id, target_profile_id).await
    }

    async fn create(&self, actor_profile_id: i64, target_profile_id: i64, is_liked: bool)
        -> Result<ProfileMatch, StoreError> {
        insert_edge(&self.pool, actor_profile_id, target_profile_id, is_liked).await
    }

    async fn update_liked(&self, id: i64, is_liked: bool) -> Result<(), StoreError> {
        update_edge(&self.pool, id, is_liked).await
    }

    async fn list_targets(&self, actor_profile_id: i64, is_liked: Option<bool>) -> Result<Vec<i64>, StoreError> {
        let targets = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT target_profile_id
            FROM profile_matches
            WHERE actor_profile_id = $1
              AND NOT is_deleted
              AND ($2::BOOLEAN IS NULL OR is_liked = $2)
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(actor_profile_id)
        .bind(is_liked)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Profile {} has {} active edges (liked filter: {:?})", actor_profile_id, targets.len(), is_liked);

        Ok(targets)
    }
}

#[async_trait]
impl MutualMatchStore for PostgresStore {
    async fn find_active(&self, pair: CanonicalPair) -> Result<Option<MutualMatch>, StoreError> {
        let query = format!(
            "SELECT {} FROM mutual_matches WHERE user_id_low = $1 AND user_id_high = $2 AND is_active",
            MUTUAL_MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(mutual_match_from_row).transpose()
    }

    async fn list_counterparts(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let counterparts = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT CASE WHEN user_id_low = $1 THEN user_id_high ELSE user_id_low END
            FROM mutual_matches
            WHERE (user_id_low = $1 OR user_id_high = $1) AND is_active
            ORDER BY matched_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counterparts)
    }
}

/// An open Postgres transaction seen through the `MatchTx` interface
pub struct PgMatchTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MatchTx for PgMatchTx {
    async fn find_active_profile_match(&mut self, actor_profile_id: i64, target_profile_id: i64)
        -> Result<Option<ProfileMatch>, StoreError> {
        find_active_edge(&mut *self.tx, actor_profile_id, target_profile_id).await
    }

    async fn create_profile_match(&mut self, actor_profile_id: i64, target_profile_id: i64, is_liked: bool)
        -> Result<ProfileMatch, StoreError> {
        insert_edge(&mut *self.tx, actor_profile_id, target_profile_id, is_liked).await
    }

    async fn update_profile_match(&mut self, id: i64, is_liked: bool) -> Result<(), StoreError> {
        update_edge(&mut *self.tx, id, is_liked).await
    }

    async fn upsert_mutual_match(&mut self, pair: CanonicalPair) -> Result<MutualUpsert, StoreError> {
        // Returns no row when the pair is already active
        let upsert = format!(
            r#"
            INSERT INTO mutual_matches (user_id_low, user_id_high, is_active, matched_at, updated_at)
            VALUES ($1, $2, TRUE, NOW(), NOW())
            ON CONFLICT (user_id_low, user_id_high)
            DO UPDATE SET is_active = TRUE, matched_at = NOW(), updated_at = NOW()
            WHERE NOT mutual_matches.is_active
            RETURNING {}
            "#,
            MUTUAL_MATCH_COLUMNS
        );

        let activated = sqlx::query(&upsert)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_optional(&mut *self.tx)
            .await?;

        if let Some(row) = activated {
            return Ok(MutualUpsert {
                mutual: mutual_match_from_row(&row)?,
                activated: true,
            });
        }

        let select = format!(
            "SELECT {} FROM mutual_matches WHERE user_id_low = $1 AND user_id_high = $2",
            MUTUAL_MATCH_COLUMNS
        );
        let row = sqlx::query(&select)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(MutualUpsert {
            mutual: mutual_match_from_row(&row)?,
            activated: false,
        })
    }

    async fn deactivate_mutual_match(&mut self, pair: CanonicalPair) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE mutual_matches
            SET is_active = FALSE, updated_at = NOW()
            WHERE user_id_low = $1 AND user_id_high = $2 AND is_active
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TransactionCoordinator for PostgresStore {
    async fn with_transaction<R, F>(&self, work: F) -> Result<R, StoreError>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut dyn MatchTx) -> BoxFuture<'t, Result<R, StoreError>> + Send,
    {
        let mut unit = PgMatchTx { tx: self.pool.begin().await? };

        let result = {
            let handle: &mut dyn MatchTx = &mut unit;
            work(handle).await
        };

        match result {
            Ok(value) => {
                unit.tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = unit.tx.rollback().await {
                    tracing::warn!("Rollback failed after error '{}': {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EducationLevel, MaritalStatus};

    fn test_query() -> CandidateQuery {
        CandidateQuery {
            is_bride: true,
            exclude_profile_ids: vec![1, 2],
            min_age: 25,
            max_age: 30,
            min_height_cm: 150,
            max_height_cm: 175,
            communities: PreferenceFilter::Any,
            marital_statuses: PreferenceFilter::only([MaritalStatus::NeverMarried]),
            professions: PreferenceFilter::Any,
            profession_types: PreferenceFilter::Any,
            education_levels: PreferenceFilter::only([EducationLevel::Masters, EducationLevel::Doctorate]),
            districts: PreferenceFilter::Any,
            today: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            limit: 20,
            offset: 0,
        }
    }

    #[test]
    fn test_candidate_filters_skip_any_dimensions() {
        let query = test_query();
        let window = birth_date_window(query.min_age, query.max_age, query.today).unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        push_candidate_filters(&mut builder, &query, window);
        let sql = builder.sql();

        assert!(sql.contains("is_bride = $1"));
        assert!(sql.contains("id <> ALL($2)"));
        assert!(sql.contains("marital_status = ANY("));
        assert!(sql.contains("education_level = ANY("));
        assert!(!sql.contains("community = ANY("));
        assert!(!sql.contains("district = ANY("));
    }

    #[test]
    fn test_candidate_filters_without_exclusions() {
        let mut query = test_query();
        query.exclude_profile_ids.clear();
        let window = birth_date_window(query.min_age, query.max_age, query.today).unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        push_candidate_filters(&mut builder, &query, window);

        assert!(!builder.sql().contains("<> ALL"));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_transaction_rolls_back_on_error() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PostgresStore::new(&url, 2, 1, Duration::from_secs(5), Duration::from_secs(60))
            .await
            .expect("Failed to connect");

        let pair = CanonicalPair::new(Uuid::new_v4(), Uuid::new_v4());
        let result = store
            .with_transaction(move |tx| {
                Box::pin(async move {
                    tx.upsert_mutual_match(pair).await?;
                    Err::<(), StoreError>(StoreError::Conflict("forced".to_string()))
                })
            })
            .await;

        assert!(result.is_err());
        assert!(MutualMatchStore::find_active(&store, pair).await.unwrap().is_none());
    }
}
