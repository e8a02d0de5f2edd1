/// Account profile and role listing endpoints
///
/// Every route here requires a session.
///
/// # Endpoints
///
/// - `GET /user/profile` - account plus profile, creating the profile on first access
/// - `PUT /user/profile` - partial profile update
/// - `GET /user/students`, `/user/parents`, `/user/instructors` - role listings
/// - `GET /user/summary` - account and profile counts, cached for five minutes

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDate, Utc};
use rollcall_shared::{
    auth::{middleware::AuthContext, session::UserSessionData},
    cache::{helper::API_RESPONSE_TTL, CacheHelper},
    models::{
        account::AccountSummary,
        profile::{
            Profile, ProfileChanges, ProfileCounts, ProfileListing, ProfileRole,
            ProfileValidationError, RoleDetails,
        },
    },
};
use serde::{Deserialize, Serialize};

/// Cache endpoint name of the summary response
pub const SUMMARY_ENDPOINT: &str = "user/summary";

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: AccountSummary,
    pub full_name: String,
    pub profile: Profile,
    pub age: Option<u32>,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Latest sign-in recorded in the cache, if still present
    pub last_signin: Option<UserSessionData>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub total_accounts: i64,
    pub total_profiles: i64,
    pub profiles: ProfileCounts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub data: SummaryData,
    /// True when served from the cache
    pub cached: bool,
    pub cached_at: Option<DateTime<Utc>>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Drops the cached summary so the next request recomputes it
pub(crate) async fn invalidate_summary(state: &AppState) {
    let key = CacheHelper::api_cache_key(SUMMARY_ENDPOINT);
    if let Err(e) = state.cache.delete(&key).await {
        tracing::warn!(error = %e, "Failed to invalidate cached summary");
    }
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ProfileResponse>> {
    let account = state
        .storage
        .find_account_by_id(auth.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;
    let profile = state.storage.get_or_create_profile(account.id).await?;

    // The profile is still useful without the cached sign-in record
    let last_signin = match state
        .cache
        .get_user_session_data::<UserSessionData>(account.id)
        .await
    {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, account_id = %account.id, "Session data lookup failed");
            None
        }
    };

    Ok(Json(ProfileResponse {
        user: account.summary(),
        full_name: account.full_name(),
        age: profile.age_on(today()),
        profile,
        last_login_at: account.last_login_at,
        last_signin,
    }))
}

/// Partially updates the caller's profile
///
/// ```text
/// PUT /user/profile
/// { "phone_number": "+15550100", "details": { "role": "student", "student_id": "S-1" } }
/// ```
///
/// A student's `parent_id` must name an existing parent profile.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No profile fields provided".to_string()));
    }

    let today = today();
    let mut profile = state.storage.get_or_create_profile(auth.account_id).await?;
    changes.apply(&mut profile, today);
    profile.validate(today)?;

    if let RoleDetails::Student(student) = &profile.details {
        if let Some(parent_id) = student.parent_id {
            let parent = if parent_id == profile.id {
                None
            } else {
                state.storage.find_profile_by_id(parent_id).await?
            };
            if !matches!(parent, Some(p) if p.role() == ProfileRole::Parent) {
                return Err(ProfileValidationError::InvalidParent.into());
            }
        }
    }

    let profile = state.storage.save_profile(&profile).await?;
    invalidate_summary(&state).await;

    tracing::info!(account_id = %auth.account_id, role = %profile.role(), "Profile updated");

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        profile,
    }))
}

async fn listing(state: &AppState, role: ProfileRole) -> ApiResult<Vec<ProfileListing>> {
    Ok(state.storage.list_profiles(role).await?)
}

#[derive(Debug, Serialize)]
pub struct StudentsResponse {
    pub students: Vec<ProfileListing>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ParentsResponse {
    pub parents: Vec<ProfileListing>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct InstructorsResponse {
    pub instructors: Vec<ProfileListing>,
    pub count: usize,
}

pub async fn list_students(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<StudentsResponse>> {
    let students = listing(&state, ProfileRole::Student).await?;
    Ok(Json(StudentsResponse {
        count: students.len(),
        students,
    }))
}

/// Parents come with the number of students linked to them
pub async fn list_parents(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<ParentsResponse>> {
    let parents = listing(&state, ProfileRole::Parent).await?;
    Ok(Json(ParentsResponse {
        count: parents.len(),
        parents,
    }))
}

pub async fn list_instructors(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<InstructorsResponse>> {
    let instructors = listing(&state, ProfileRole::Instructor).await?;
    Ok(Json(InstructorsResponse {
        count: instructors.len(),
        instructors,
    }))
}

/// Account and profile statistics
///
/// Served from the API response cache when present, otherwise computed and
/// cached for [`API_RESPONSE_TTL`].
pub async fn summary(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<SummaryResponse>> {
    if let Some(hit) = state
        .cache
        .get_cached_api_response::<SummaryData>(SUMMARY_ENDPOINT)
        .await?
    {
        return Ok(Json(SummaryResponse {
            data: hit.data,
            cached: true,
            cached_at: Some(hit.cached_at),
        }));
    }

    let profiles = state.storage.count_profiles_by_role().await?;
    let data = SummaryData {
        total_accounts: state.storage.count_accounts().await?,
        total_profiles: profiles.total(),
        profiles,
    };

    state
        .cache
        .cache_api_response(SUMMARY_ENDPOINT, &data, Some(API_RESPONSE_TTL))
        .await?;

    Ok(Json(SummaryResponse {
        data,
        cached: false,
        cached_at: None,
    }))
}
