// Unit tests for Lume Match

use chrono::{NaiveDate, Utc};
use lume_match::core::{age_on, birth_date_window, candidate_query, clamp_page, matches_candidate_query, CanonicalPair};
use lume_match::models::{
    EducationLevel, MaritalStatus, MutualMatch, Pagination, PartnerPreference, PreferenceFilter, ProfessionType,
    Profile, ProfileCard,
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn create_test_profile(id: i64, is_bride: bool, dob: NaiveDate) -> Profile {
    Profile {
        id,
        user_id: Uuid::from_u128(id as u128),
        name: format!("Member {}", id),
        is_bride,
        date_of_birth: dob,
        height_cm: 170,
        community: "tamil".to_string(),
        marital_status: MaritalStatus::Divorced,
        profession: "doctor".to_string(),
        profession_type: ProfessionType::Government,
        education_level: EducationLevel::Masters,
        district: "jaffna".to_string(),
        photo_key: None,
        is_deleted: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_test_preference(profile_id: i64) -> PartnerPreference {
    PartnerPreference {
        id: 1,
        profile_id,
        min_age: 25,
        max_age: 35,
        min_height_cm: 150,
        max_height_cm: 190,
        communities: PreferenceFilter::Any,
        marital_statuses: PreferenceFilter::Any,
        professions: PreferenceFilter::Any,
        profession_types: PreferenceFilter::Any,
        education_levels: PreferenceFilter::Any,
        districts: PreferenceFilter::Any,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_canonical_pair_is_order_independent() {
    let a = Uuid::from_u128(0xff);
    let b = Uuid::from_u128(0x01);

    assert_eq!(CanonicalPair::new(a, b), CanonicalPair::new(b, a));
    assert_eq!(CanonicalPair::new(a, b).low(), b);
    assert!(CanonicalPair::new(a, b).contains(a));
}

#[test]
fn test_canonical_pair_uses_byte_order() {
    // Differ only in the first byte
    let high = Uuid::parse_str("f0000000-0000-4000-8000-000000000000").unwrap();
    let low = Uuid::parse_str("0fffffff-ffff-4fff-bfff-ffffffffffff").unwrap();

    let pair = CanonicalPair::new(high, low);
    assert_eq!(pair.low(), low);
    assert_eq!(pair.high(), high);
}

#[test]
fn test_mutual_counterpart() {
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    let mutual = MutualMatch {
        id: 1,
        user_id_low: a,
        user_id_high: b,
        is_active: true,
        matched_at: Utc::now(),
    };

    assert_eq!(mutual.counterpart_of(a), Some(b));
    assert_eq!(mutual.counterpart_of(b), Some(a));
    assert_eq!(mutual.counterpart_of(Uuid::from_u128(3)), None);
}

#[test]
fn test_age_on_birthday_boundary() {
    let dob = date(1995, 3, 15);
    assert_eq!(age_on(dob, date(2025, 3, 14)), 29);
    assert_eq!(age_on(dob, date(2025, 3, 15)), 30);
}

#[test]
fn test_birth_date_window_inclusive() {
    let today = date(2025, 6, 1);
    let (earliest, latest) = birth_date_window(25, 30, today).unwrap();

    assert_eq!(age_on(latest, today), 25);
    assert_eq!(age_on(earliest, today), 30);
    assert_eq!(age_on(earliest.pred_opt().unwrap(), today), 31);
    assert!(birth_date_window(30, 25, today).is_none());
}

#[test]
fn test_candidate_query_targets_opposite_side() {
    let today = date(2025, 6, 1);
    let groom = create_test_profile(1, false, date(1993, 1, 1));
    let query = candidate_query(&groom, &create_test_preference(groom.id), vec![1], today, 10, 0);

    assert!(query.is_bride);
    assert!(matches_candidate_query(&create_test_profile(2, true, date(1996, 1, 1)), &query));
    assert!(!matches_candidate_query(&create_test_profile(3, false, date(1996, 1, 1)), &query));
}

#[test]
fn test_candidate_query_filters() {
    let today = date(2025, 6, 1);
    let groom = create_test_profile(1, false, date(1993, 1, 1));
    let mut preference = create_test_preference(groom.id);
    preference.education_levels = PreferenceFilter::only([EducationLevel::Doctorate]);

    let query = candidate_query(&groom, &preference, vec![], today, 10, 0);
    assert!(!matches_candidate_query(&create_test_profile(2, true, date(1996, 1, 1)), &query));

    preference.education_levels = PreferenceFilter::only([EducationLevel::Masters, EducationLevel::Doctorate]);
    let query = candidate_query(&groom, &preference, vec![2], today, 10, 0);
    // Excluded by id even though every filter passes
    assert!(!matches_candidate_query(&create_test_profile(2, true, date(1996, 1, 1)), &query));
    assert!(matches_candidate_query(&create_test_profile(4, true, date(1996, 1, 1)), &query));
}

#[test]
fn test_preference_filter_any_sentinel() {
    let any = PreferenceFilter::<String>::from_codes(&["any"]).unwrap();
    assert!(any.is_any());
    assert_eq!(any.to_codes(), vec!["any".to_string()]);

    let empty = PreferenceFilter::<String>::from_codes::<&str>(&[]).unwrap();
    assert!(!empty.is_any());
    assert!(!empty.allows(&"anything".to_string()));

    assert!(PreferenceFilter::<String>::from_codes(&["any", "tamil"]).is_err());
    assert!(PreferenceFilter::<MaritalStatus>::from_codes(&["engaged"]).is_err());
}

#[test]
fn test_preference_filter_json() {
    let filter: PreferenceFilter<ProfessionType> = serde_json::from_str(r#"["government","self_employed"]"#).unwrap();
    assert!(filter.allows(&ProfessionType::SelfEmployed));
    assert!(!filter.allows(&ProfessionType::Business));

    let json = serde_json::to_string(&PreferenceFilter::<ProfessionType>::Any).unwrap();
    assert_eq!(json, r#"["any"]"#);
}

#[test]
fn test_clamp_page() {
    assert_eq!(clamp_page(0, 0, 20, 100), (20, 0));
    assert_eq!(clamp_page(150, 5, 20, 100), (100, 5));
    assert_eq!(clamp_page(10, -10, 20, 100), (10, 0));
}

#[test]
fn test_pagination_has_more() {
    let p = Pagination::new(20, 0, 45);
    assert!(p.has_more);
    assert!(!Pagination::new(20, 40, 45).has_more);
    assert!(!Pagination::new(20, 25, 45).has_more);
}

#[test]
fn test_profile_card_computes_age() {
    let profile = create_test_profile(7, true, date(2000, 12, 31));
    let card = ProfileCard::from_profile(&profile, date(2025, 12, 30), Some("https://cdn.test/7".to_string()));

    assert_eq!(card.age, 24);
    assert_eq!(card.id, 7);
    assert_eq!(card.photo_url.as_deref(), Some("https://cdn.test/7"));
}
