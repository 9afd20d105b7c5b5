// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    check_preference_ranges, CandidatePage, CandidateQuery, EducationLevel, FilterValue, HistoryFilter, MaritalStatus, MatchAction,
    MutualMatch, NewPartnerPreference, PartnerPreference, PartnerPreferencePatch, PreferenceFilter,
    Profile, ProfileMatch, ProfessionType,
};
pub use requests::{
    CreatePreferencesRequest, HistoryQuery, PreferenceQuery, RecommendQuery, RecordActionRequest, UpdatePreferencesRequest,
};
pub use responses::{ErrorResponse, HealthResponse, Pagination, ProfileCard, ProfilePage, RecordActionResponse};
