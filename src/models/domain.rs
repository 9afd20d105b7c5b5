use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Sentinel stored in place of a filter set meaning "do not filter"
pub const ANY: &str = "any";

/// Member profile as seen by the match-making core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
    /// Side discriminator; recommendations only ever cross sides
    pub is_bride: bool,
    pub date_of_birth: NaiveDate,
    pub height_cm: i32,
    pub community: String,
    pub marital_status: MaritalStatus,
    pub profession: String,
    pub profession_type: ProfessionType,
    pub education_level: EducationLevel,
    pub district: String,
    #[serde(default)]
    pub photo_key: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Age in whole years on `today`
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        crate::core::filters::age_on(self.date_of_birth, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    NeverMarried,
    Divorced,
    Widowed,
    AwaitingDivorce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionType {
    Government,
    Private,
    Business,
    SelfEmployed,
    NotWorking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    Diploma,
    Bachelors,
    Masters,
    Doctorate,
}

/// Values that can appear in a partner preference filter and round-trip
/// through their storage code.
pub trait FilterValue: Clone + Ord + Sized {
    fn code(&self) -> &str;
    fn from_code(code: &str) -> Option<Self>;
}

impl FilterValue for String {
    fn code(&self) -> &str {
        self
    }

    fn from_code(code: &str) -> Option<Self> {
        Some(code.to_string())
    }
}

impl FilterValue for MaritalStatus {
    fn code(&self) -> &str {
        match self {
            MaritalStatus::NeverMarried => "never_married",
            MaritalStatus::Divorced => "divorced",
            MaritalStatus::Widowed => "widowed",
            MaritalStatus::AwaitingDivorce => "awaiting_divorce",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "never_married" => Some(MaritalStatus::NeverMarried),
            "divorced" => Some(MaritalStatus::Divorced),
            "widowed" => Some(MaritalStatus::Widowed),
            "awaiting_divorce" => Some(MaritalStatus::AwaitingDivorce),
            _ => None,
        }
    }
}

impl FilterValue for ProfessionType {
    fn code(&self) -> &str {
        match self {
            ProfessionType::Government => "government",
            ProfessionType::Private => "private",
            ProfessionType::Business => "business",
            ProfessionType::SelfEmployed => "self_employed",
            ProfessionType::NotWorking => "not_working",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "government" => Some(ProfessionType::Government),
            "private" => Some(ProfessionType::Private),
            "business" => Some(ProfessionType::Business),
            "self_employed" => Some(ProfessionType::SelfEmployed),
            "not_working" => Some(ProfessionType::NotWorking),
            _ => None,
        }
    }
}

impl FilterValue for EducationLevel {
    fn code(&self) -> &str {
        match self {
            EducationLevel::HighSchool => "high_school",
            EducationLevel::Diploma => "diploma",
            EducationLevel::Bachelors => "bachelors",
            EducationLevel::Masters => "masters",
            EducationLevel::Doctorate => "doctorate",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "high_school" => Some(EducationLevel::HighSchool),
            "diploma" => Some(EducationLevel::Diploma),
            "bachelors" => Some(EducationLevel::Bachelors),
            "masters" => Some(EducationLevel::Masters),
            "doctorate" => Some(EducationLevel::Doctorate),
            _ => None,
        }
    }
}

/// One multi-valued preference dimension.
///
/// `Any` disables the dimension. `Only` with an empty set matches nothing,
/// which is why "any" is its own variant rather than an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceFilter<T: FilterValue> {
    Any,
    Only(BTreeSet<T>),
}

impl<T: FilterValue> PreferenceFilter<T> {
    pub fn only<I: IntoIterator<Item = T>>(values: I) -> Self {
        PreferenceFilter::Only(values.into_iter().collect())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, PreferenceFilter::Any)
    }

    pub fn allows(&self, value: &T) -> bool {
        match self {
            PreferenceFilter::Any => true,
            PreferenceFilter::Only(set) => set.contains(value),
        }
    }

    /// Storage codes; `Any` is the single sentinel `"any"`
    pub fn to_codes(&self) -> Vec<String> {
        match self {
            PreferenceFilter::Any => vec![ANY.to_string()],
            PreferenceFilter::Only(set) => set.iter().map(|v| v.code().to_string()).collect(),
        }
    }

    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Result<Self, String> {
        if codes.iter().any(|c| c.as_ref() == ANY) {
            if codes.len() > 1 {
                return Err(format!("'{}' cannot be combined with other values", ANY));
            }
            return Ok(PreferenceFilter::Any);
        }

        codes
            .iter()
            .map(|c| T::from_code(c.as_ref()).ok_or_else(|| format!("unknown value '{}'", c.as_ref())))
            .collect::<Result<BTreeSet<T>, String>>()
            .map(PreferenceFilter::Only)
    }
}

impl<T: FilterValue> Default for PreferenceFilter<T> {
    fn default() -> Self {
        PreferenceFilter::Any
    }
}

impl<T: FilterValue> Serialize for PreferenceFilter<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_codes().serialize(serializer)
    }
}

impl<'de, T: FilterValue> Deserialize<'de> for PreferenceFilter<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let codes = Vec::<String>::deserialize(deserializer)?;
        PreferenceFilter::from_codes(&codes).map_err(serde::de::Error::custom)
    }
}

/// Partner preferences owned by exactly one profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPreference {
    pub id: i64,
    pub profile_id: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub min_height_cm: i32,
    pub max_height_cm: i32,
    pub communities: PreferenceFilter<String>,
    pub marital_statuses: PreferenceFilter<MaritalStatus>,
    pub professions: PreferenceFilter<String>,
    pub profession_types: PreferenceFilter<ProfessionType>,
    pub education_levels: PreferenceFilter<EducationLevel>,
    pub districts: PreferenceFilter<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field values for a preference that has not been stored yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPartnerPreference {
    pub min_age: i32,
    pub max_age: i32,
    pub min_height_cm: i32,
    pub max_height_cm: i32,
    #[serde(default)]
    pub communities: PreferenceFilter<String>,
    #[serde(default)]
    pub marital_statuses: PreferenceFilter<MaritalStatus>,
    #[serde(default)]
    pub professions: PreferenceFilter<String>,
    #[serde(default)]
    pub profession_types: PreferenceFilter<ProfessionType>,
    #[serde(default)]
    pub education_levels: PreferenceFilter<EducationLevel>,
    #[serde(default)]
    pub districts: PreferenceFilter<String>,
}

/// Range rules every stored preference satisfies: non-negative age,
/// positive height and `min <= max` for both ranges.
pub fn check_preference_ranges(
    min_age: i32,
    max_age: i32,
    min_height_cm: i32,
    max_height_cm: i32,
) -> Result<(), String> {
    if min_age < 0 {
        return Err(format!("minAge must not be negative (got {})", min_age));
    }
    if min_age > max_age {
        return Err(format!("minAge {} is greater than maxAge {}", min_age, max_age));
    }
    if min_height_cm <= 0 || min_height_cm > max_height_cm {
        return Err(format!("height range {}..={} cm is invalid", min_height_cm, max_height_cm));
    }
    Ok(())
}

impl PartnerPreference {
    pub fn check_ranges(&self) -> Result<(), String> {
        check_preference_ranges(self.min_age, self.max_age, self.min_height_cm, self.max_height_cm)
    }
}

/// Partial update; `None` leaves the stored value unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPreferencePatch {
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub min_height_cm: Option<i32>,
    pub max_height_cm: Option<i32>,
    pub communities: Option<PreferenceFilter<String>>,
    pub marital_statuses: Option<PreferenceFilter<MaritalStatus>>,
    pub professions: Option<PreferenceFilter<String>>,
    pub profession_types: Option<PreferenceFilter<ProfessionType>>,
    pub education_levels: Option<PreferenceFilter<EducationLevel>>,
    pub districts: Option<PreferenceFilter<String>>,
}

impl PartnerPreferencePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, pref: &mut PartnerPreference) {
        if let Some(v) = self.min_age {
            pref.min_age = v;
        }
        if let Some(v) = self.max_age {
            pref.max_age = v;
        }
        if let Some(v) = self.min_height_cm {
            pref.min_height_cm = v;
        }
        if let Some(v) = self.max_height_cm {
            pref.max_height_cm = v;
        }
        if let Some(v) = &self.communities {
            pref.communities = v.clone();
        }
        if let Some(v) = &self.marital_statuses {
            pref.marital_statuses = v.clone();
        }
        if let Some(v) = &self.professions {
            pref.professions = v.clone();
        }
        if let Some(v) = &self.profession_types {
            pref.profession_types = v.clone();
        }
        if let Some(v) = &self.education_levels {
            pref.education_levels = v.clone();
        }
        if let Some(v) = &self.districts {
            pref.districts = v.clone();
        }
    }
}

/// Directional edge: the actor's latest decision about the target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMatch {
    pub id: i64,
    pub actor_profile_id: i64,
    pub target_profile_id: i64,
    pub is_liked: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Undirected edge keyed by the canonical user pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MutualMatch {
    pub id: i64,
    pub user_id_low: Uuid,
    pub user_id_high: Uuid,
    pub is_active: bool,
    pub matched_at: DateTime<Utc>,
}

impl MutualMatch {
    /// The other side of the match as seen from `user_id`
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_id_low == user_id {
            Some(self.user_id_high)
        } else if self.user_id_high == user_id {
            Some(self.user_id_low)
        } else {
            None
        }
    }
}

/// Action a member takes on a recommended profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchAction {
    Like,
    Pass,
}

impl MatchAction {
    pub fn is_like(self) -> bool {
        self == MatchAction::Like
    }
}

impl FromStr for MatchAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(MatchAction::Like),
            "pass" => Ok(MatchAction::Pass),
            other => Err(format!("action must be one of: like, pass (got '{}')", other)),
        }
    }
}

impl fmt::Display for MatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchAction::Like => write!(f, "like"),
            MatchAction::Pass => write!(f, "pass"),
        }
    }
}

/// Which slice of a member's match history to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    Liked,
    Passed,
    Mutual,
}

impl FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "liked" => Ok(HistoryFilter::Liked),
            "passed" => Ok(HistoryFilter::Passed),
            "mutual" => Ok(HistoryFilter::Mutual),
            other => Err(format!("action must be one of: liked, passed, mutual (got '{}')", other)),
        }
    }
}

impl fmt::Display for HistoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryFilter::Liked => write!(f, "liked"),
            HistoryFilter::Passed => write!(f, "passed"),
            HistoryFilter::Mutual => write!(f, "mutual"),
        }
    }
}

/// Candidate search issued by the recommendation engine
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    /// Side to search; the complement of the actor's side
    pub is_bride: bool,
    pub exclude_profile_ids: Vec<i64>,
    pub min_age: i32,
    pub max_age: i32,
    pub min_height_cm: i32,
    pub max_height_cm: i32,
    pub communities: PreferenceFilter<String>,
    pub marital_statuses: PreferenceFilter<MaritalStatus>,
    pub professions: PreferenceFilter<String>,
    pub profession_types: PreferenceFilter<ProfessionType>,
    pub education_levels: PreferenceFilter<EducationLevel>,
    pub districts: PreferenceFilter<String>,
    /// Reference date for age computation
    pub today: NaiveDate,
    pub limit: i64,
    pub offset: i64,
}

/// One page of candidates plus the total number of matching rows
#[derive(Debug, Clone)]
pub struct CandidatePage {
    pub profiles: Vec<Profile>,
    pub total_count: i64,
}
