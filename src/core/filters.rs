use chrono::{Datelike, Months, NaiveDate};

use crate::models::{CandidateQuery, PartnerPreference, Profile};

/// Whole years between `date_of_birth` and `today`
#[inline]
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Inclusive date-of-birth window for an inclusive age range on `today`.
///
/// Someone is at least `min_age` if born on or before `today - min_age years`,
/// and at most `max_age` if born after `today - (max_age + 1) years`.
/// Returns `None` when the range is empty or unrepresentable.
pub fn birth_date_window(min_age: i32, max_age: i32, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    if min_age > max_age || max_age < 0 {
        return None;
    }

    let latest = years_before(today, min_age.max(0))?;
    let earliest = years_before(today, max_age + 1)?.succ_opt()?;
    Some((earliest, latest))
}

fn years_before(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let months = u32::try_from(years).ok()?.checked_mul(12)?;
    date.checked_sub_months(Months::new(months))
}

/// Build the candidate query for an actor from their partner preferences
pub fn candidate_query(
    actor: &Profile,
    preference: &PartnerPreference,
    exclude_profile_ids: Vec<i64>,
    today: NaiveDate,
    limit: i64,
    offset: i64,
) -> CandidateQuery {
    CandidateQuery {
        is_bride: !actor.is_bride,
        exclude_profile_ids,
        min_age: preference.min_age,
        max_age: preference.max_age,
        min_height_cm: preference.min_height_cm,
        max_height_cm: preference.max_height_cm,
        communities: preference.communities.clone(),
        marital_statuses: preference.marital_statuses.clone(),
        professions: preference.professions.clone(),
        profession_types: preference.profession_types.clone(),
        education_levels: preference.education_levels.clone(),
        districts: preference.districts.clone(),
        today,
        limit,
        offset,
    }
}

/// Check whether a profile satisfies every constraint of a candidate query.
///
/// Used by the in-memory store; the Postgres store expresses the same
/// predicate in SQL.
#[inline]
pub fn matches_candidate_query(profile: &Profile, query: &CandidateQuery) -> bool {
    if profile.is_deleted || profile.is_bride != query.is_bride {
        return false;
    }

    if query.exclude_profile_ids.contains(&profile.id) {
        return false;
    }

    let age = age_on(profile.date_of_birth, query.today);
    if age < query.min_age || age > query.max_age {
        return false;
    }

    if profile.height_cm < query.min_height_cm || profile.height_cm > query.max_height_cm {
        return false;
    }

    query.communities.allows(&profile.community)
        && query.marital_statuses.allows(&profile.marital_status)
        && query.professions.allows(&profile.profession)
        && query.profession_types.allows(&profile.profession_type)
        && query.education_levels.allows(&profile.education_level)
        && query.districts.allows(&profile.district)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EducationLevel, MaritalStatus, PreferenceFilter, ProfessionType};
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_profile(id: i64, is_bride: bool, dob: NaiveDate, height_cm: i32) -> Profile {
        Profile {
            id,
            user_id: Uuid::from_u128(id as u128),
            name: format!("Member {}", id),
            is_bride,
            date_of_birth: dob,
            height_cm,
            community: "nair".to_string(),
            marital_status: MaritalStatus::NeverMarried,
            profession: "engineer".to_string(),
            profession_type: ProfessionType::Private,
            education_level: EducationLevel::Bachelors,
            district: "kottayam".to_string(),
            photo_key: None,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_test_query(today: NaiveDate) -> CandidateQuery {
        CandidateQuery {
            is_bride: true,
            exclude_profile_ids: vec![],
            min_age: 25,
            max_age: 30,
            min_height_cm: 150,
            max_height_cm: 175,
            communities: PreferenceFilter::Any,
            marital_statuses: PreferenceFilter::Any,
            professions: PreferenceFilter::Any,
            profession_types: PreferenceFilter::Any,
            education_levels: PreferenceFilter::Any,
            districts: PreferenceFilter::Any,
            today,
            limit: 20,
            offset: 0,
        }
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        assert_eq!(age_on(date(1995, 6, 15), date(2025, 6, 14)), 29);
        assert_eq!(age_on(date(1995, 6, 15), date(2025, 6, 15)), 30);
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 2, 28)), 24);
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 3, 1)), 25);
    }

    #[test]
    fn test_birth_date_window_matches_age_on() {
        let today = date(2025, 6, 15);
        let (earliest, latest) = birth_date_window(25, 30, today).unwrap();

        assert_eq!(age_on(latest, today), 25);
        assert_eq!(age_on(latest.succ_opt().unwrap(), today), 24);
        assert_eq!(age_on(earliest, today), 30);
        assert_eq!(age_on(earliest.pred_opt().unwrap(), today), 31);
    }

    #[test]
    fn test_birth_date_window_rejects_inverted_range() {
        assert!(birth_date_window(30, 25, date(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_query_match() {
        let today = date(2025, 6, 15);
        let profile = create_test_profile(1, true, date(1997, 1, 1), 160);

        assert!(matches_candidate_query(&profile, &create_test_query(today)));
    }

    #[test]
    fn test_query_rejects_same_side() {
        let today = date(2025, 6, 15);
        let profile = create_test_profile(1, false, date(1997, 1, 1), 160);

        assert!(!matches_candidate_query(&profile, &create_test_query(today)));
    }

    #[test]
    fn test_query_rejects_excluded_and_deleted() {
        let today = date(2025, 6, 15);
        let mut query = create_test_query(today);
        query.exclude_profile_ids = vec![1];

        let profile = create_test_profile(1, true, date(1997, 1, 1), 160);
        assert!(!matches_candidate_query(&profile, &query));

        let mut deleted = create_test_profile(2, true, date(1997, 1, 1), 160);
        deleted.is_deleted = true;
        assert!(!matches_candidate_query(&deleted, &query));
    }

    #[test]
    fn test_query_height_bounds_inclusive() {
        let today = date(2025, 6, 15);
        let query = create_test_query(today);

        assert!(matches_candidate_query(&create_test_profile(1, true, date(1997, 1, 1), 150), &query));
        assert!(matches_candidate_query(&create_test_profile(2, true, date(1997, 1, 1), 175), &query));
        assert!(!matches_candidate_query(&create_test_profile(3, true, date(1997, 1, 1), 176), &query));
    }

    #[test]
    fn test_query_set_filters() {
        let today = date(2025, 6, 15);
        let mut query = create_test_query(today);
        query.communities = PreferenceFilter::only(["ezhava".to_string()]);

        let profile = create_test_profile(1, true, date(1997, 1, 1), 160);
        assert!(!matches_candidate_query(&profile, &query));

        query.communities = PreferenceFilter::only(["ezhava".to_string(), "nair".to_string()]);
        query.education_levels = PreferenceFilter::only([EducationLevel::Masters]);
        assert!(!matches_candidate_query(&profile, &query));

        query.education_levels = PreferenceFilter::Any;
        assert!(matches_candidate_query(&profile, &query));
    }
}
