// Criterion benchmarks for Lume Match

use chrono::{NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_match::core::{candidate_query, matches_candidate_query, CanonicalPair, PreferenceService, RecommendationEngine};
use lume_match::models::{
    EducationLevel, MaritalStatus, NewPartnerPreference, PartnerPreference, PreferenceFilter, ProfessionType, Profile,
};
use lume_match::services::{InMemoryStore, StaticPhotoResolver, Stores};
use std::sync::Arc;
use uuid::Uuid;

const DISTRICTS: [&str; 4] = ["colombo", "kandy", "galle", "jaffna"];

fn create_candidate(id: i64) -> Profile {
    let now = Utc::now();
    Profile {
        id,
        user_id: Uuid::from_u128(id as u128),
        name: format!("Member {}", id),
        is_bride: id % 2 == 0,
        date_of_birth: NaiveDate::from_ymd_opt(1985 + (id % 15) as i32, 1 + (id % 12) as u32, 1).unwrap(),
        height_cm: 150 + (id % 40) as i32,
        community: "sinhala".to_string(),
        marital_status: MaritalStatus::NeverMarried,
        profession: "engineer".to_string(),
        profession_type: ProfessionType::Private,
        education_level: if id % 3 == 0 { EducationLevel::Masters } else { EducationLevel::Bachelors },
        district: DISTRICTS[(id % 4) as usize].to_string(),
        photo_key: None,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    }
}

fn create_preference() -> PartnerPreference {
    PartnerPreference {
        id: 1,
        profile_id: 1,
        min_age: 25,
        max_age: 35,
        min_height_cm: 155,
        max_height_cm: 180,
        communities: PreferenceFilter::Any,
        marital_statuses: PreferenceFilter::Any,
        professions: PreferenceFilter::Any,
        profession_types: PreferenceFilter::Any,
        education_levels: PreferenceFilter::only([EducationLevel::Bachelors, EducationLevel::Masters]),
        districts: PreferenceFilter::only(["colombo".to_string(), "kandy".to_string()]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bench_canonical_pair(c: &mut Criterion) {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    c.bench_function("canonical_pair", |bench| {
        bench.iter(|| CanonicalPair::new(black_box(a), black_box(b)));
    });
}

fn bench_candidate_filter(c: &mut Criterion) {
    let actor = create_candidate(1);
    let today = Utc::now().date_naive();
    let exclude: Vec<i64> = (0..50).map(|i| i * 7).collect();
    let query = candidate_query(&actor, &create_preference(), exclude, today, 20, 0);

    let mut group = c.benchmark_group("candidate_filter");

    for candidate_count in [100, 1000, 10000].iter() {
        let candidates: Vec<Profile> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("matches_candidate_query", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    candidates
                        .iter()
                        .filter(|p| matches_candidate_query(black_box(p), black_box(&query)))
                        .count()
                });
            },
        );
    }

    group.finish();
}

fn bench_recommendations(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let stores = Stores::from_backend(store.clone());
    let recommendations = RecommendationEngine::new(&stores, Arc::new(StaticPhotoResolver::new("https://cdn.test")));

    let actor = rt.block_on(async {
        for id in 2..2000 {
            store.put_profile(create_candidate(id)).await;
        }
        let actor = store.put_profile(create_candidate(1)).await;

        let pref = create_preference();
        let new = NewPartnerPreference {
            min_age: pref.min_age,
            max_age: pref.max_age,
            min_height_cm: pref.min_height_cm,
            max_height_cm: pref.max_height_cm,
            communities: pref.communities,
            marital_statuses: pref.marital_statuses,
            professions: pref.professions,
            profession_types: pref.profession_types,
            education_levels: pref.education_levels,
            districts: pref.districts,
        };
        PreferenceService::new(&stores)
            .create_preferences(actor.user_id, &new)
            .await
            .unwrap();
        actor
    });

    c.bench_function("recommend_user_profiles_in_memory_2000", |b| {
        b.iter(|| {
            rt.block_on(recommendations.recommend_user_profiles(black_box(actor.user_id), 20, 0)).unwrap()
        });
    });
}

criterion_group!(benches, bench_canonical_pair, bench_candidate_filter, bench_recommendations);

criterion_main!(benches);
