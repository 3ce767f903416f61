// Participant onboarding: role assignment at registration, plus the
// post-experiment survey.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::AppState;
use crate::constants::auction::REQUIRED_PARTICIPANTS;
use crate::database::repository::{AuctionStore, NewParticipant};
use crate::error::{ApiError, Result};
use crate::models::Role;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub participant_id: String,
    pub role: Role,
    pub initial_money: f64,
    pub endowment: f64,
    pub message: String,
}

/// Register a participant and assign the next free experiment role.
///
/// Roles are handed out in a fixed order and each exists exactly once, so
/// the session is full after four registrations.
#[utoipa::path(
    post,
    path = "/api/auction/register",
    tag = "auction",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Participant registered", body = RegisterResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Session is full")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    request.validate()?;

    let assigned: Vec<Role> = state
        .store
        .list_participants()
        .await?
        .iter()
        .map(|p| p.role)
        .collect();
    if assigned.len() >= REQUIRED_PARTICIPANTS {
        return Err(ApiError::Conflict(
            "All participant slots are taken".to_string(),
        ));
    }

    let role = Role::ALL
        .into_iter()
        .find(|r| !assigned.contains(r))
        .ok_or_else(|| ApiError::Conflict("All participant slots are taken".to_string()))?;
    let profile = role.profile();

    let new = NewParticipant {
        participant_id: profile.participant_id.to_string(),
        first_name: request.first_name,
        last_name: request.last_name,
        role,
        initial_money: profile.initial_money,
        endowment: profile.endowment,
        mv_first: profile.mv_first,
        mv_second: profile.mv_second,
    };

    // Concurrent registrations race to the same role; the UNIQUE constraint
    // on it is the arbiter.
    let participant = match state.store.insert_participant(&new).await {
        Ok(p) => p,
        Err(ApiError::Database(e)) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "Registration conflict, please retry".to_string(),
            ));
        }
        Err(e) => return Err(e),
    };

    info!(
        participant_id = %participant.participant_id,
        role = ?participant.role,
        "Participant registered"
    );

    Ok(Json(RegisterResponse {
        participant_id: participant.participant_id,
        role: participant.role,
        initial_money: participant.initial_money,
        endowment: participant.endowment,
        message: "Registration successful".to_string(),
    }))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SurveyRequest {
    #[validate(length(min = 1, message = "participant_id is required"))]
    pub participant_id: String,
    pub answer1: Option<String>,
    pub answer2: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SurveyResponse {
    pub message: String,
}

/// Store the post-experiment survey answers
#[utoipa::path(
    post,
    path = "/api/auction/survey",
    tag = "auction",
    request_body = SurveyRequest,
    responses(
        (status = 200, description = "Survey recorded", body = SurveyResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn submit_survey(
    State(state): State<AppState>,
    Json(request): Json<SurveyRequest>,
) -> Result<Json<SurveyResponse>> {
    request.validate()?;

    if state
        .store
        .find_participant(&request.participant_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Participant"));
    }

    state
        .store
        .insert_survey_response(
            &request.participant_id,
            request.answer1.as_deref(),
            request.answer2.as_deref(),
        )
        .await?;

    Ok(Json(SurveyResponse {
        message: "Survey response recorded".to_string(),
    }))
}
