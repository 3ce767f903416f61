// HTTP surface of the auction itself: order submission, round results,
// participant info and token balances.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::AppState;
use crate::database::repository::AuctionStore;
use crate::error::{ApiError, Result};
use crate::models::{NewOrder, OrderSide, Role};
use crate::services::SubmissionOutcome;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderPayload {
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i64,
    pub side: OrderSide,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitOrdersRequest {
    #[validate(length(min = 1, message = "participant_id is required"))]
    pub participant_id: String,
    #[validate(length(min = 1, message = "At least one order is required"), nested)]
    pub orders: Vec<OrderPayload>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundInfo {
    pub round_number: i64,
    pub uniform_price: f64,
    pub total_quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantResult {
    pub executed_quantity: i64,
    pub profit: f64,
}

/// Submission outcome as seen by the client. Tagged so the frontend can
/// branch on `status` alone.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitOrdersResponse {
    Duplicate {
        round_number: u32,
        message: String,
    },
    Waiting {
        round_number: u32,
        message: String,
    },
    Cleared {
        #[serde(rename = "round_info")]
        round: RoundInfo,
        participant_result: ParticipantResult,
        #[serde(rename = "final")]
        is_final: bool,
        message: String,
    },
    Rejected {
        reason: String,
    },
}

/// Submit one participant's order set for the active round
#[utoipa::path(
    post,
    path = "/api/auction/orders",
    tag = "auction",
    request_body = SubmitOrdersRequest,
    responses(
        (status = 200, description = "Submission processed", body = SubmitOrdersResponse),
        (status = 400, description = "Invalid order set"),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn submit_orders(
    State(state): State<AppState>,
    Json(request): Json<SubmitOrdersRequest>,
) -> Result<Json<SubmitOrdersResponse>> {
    request.validate()?;

    let orders: Vec<NewOrder> = request
        .orders
        .iter()
        .map(|o| NewOrder {
            price: o.price,
            quantity: o.quantity,
            side: o.side,
        })
        .collect();

    let outcome = state
        .coordinator
        .submit_orders(&request.participant_id, &orders)
        .await?;

    let response = match outcome {
        SubmissionOutcome::Duplicate { round_number } => SubmitOrdersResponse::Duplicate {
            round_number,
            message: format!("Orders for round {} were already submitted", round_number),
        },
        SubmissionOutcome::Waiting { round_number } => SubmitOrdersResponse::Waiting {
            round_number,
            message: "Orders recorded, waiting for the other participants".to_string(),
        },
        SubmissionOutcome::Cleared {
            round,
            participant_result,
            is_final,
        } => SubmitOrdersResponse::Cleared {
            message: if is_final {
                "Final round cleared, the auction is complete".to_string()
            } else {
                format!("Round {} cleared", round.round_number)
            },
            round: RoundInfo {
                round_number: round.round_number,
                uniform_price: round.uniform_price,
                total_quantity: round.total_quantity,
            },
            participant_result: ParticipantResult {
                executed_quantity: participant_result.executed_quantity,
                profit: participant_result.profit,
            },
            is_final,
        },
        SubmissionOutcome::AuctionComplete { total_rounds } => SubmitOrdersResponse::Rejected {
            reason: format!(
                "All {} rounds have cleared; no further submissions are accepted",
                total_rounds
            ),
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct RoundResultQuery {
    pub participant_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResultResponse {
    pub round_number: i64,
    pub uniform_price: f64,
    pub total_quantity: i64,
    pub executed_quantity: i64,
    pub profit: f64,
}

/// Fetch the persisted result of a cleared round for one participant.
/// Reads the settlement records written at clearing time; results are
/// never recomputed from orders.
#[utoipa::path(
    get,
    path = "/api/auction/rounds/{round_number}/result",
    tag = "auction",
    params(
        ("round_number" = i64, Path, description = "1-based round number"),
        ("participant_id" = String, Query, description = "Participant to report for")
    ),
    responses(
        (status = 200, description = "Round result", body = RoundResultResponse),
        (status = 404, description = "Round not cleared or unknown participant")
    )
)]
pub async fn get_round_result(
    State(state): State<AppState>,
    Path(round_number): Path<i64>,
    Query(query): Query<RoundResultQuery>,
) -> Result<Json<RoundResultResponse>> {
    let round = state
        .store
        .find_round_result(round_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Round result"))?;

    let participant_result = state
        .store
        .find_participant_round_result(&query.participant_id, round_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Participant result"))?;

    Ok(Json(RoundResultResponse {
        round_number: round.round_number,
        uniform_price: round.uniform_price,
        total_quantity: round.total_quantity,
        executed_quantity: participant_result.executed_quantity,
        profit: participant_result.profit,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantInfoResponse {
    pub participant_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub initial_money: f64,
    pub endowment: f64,
    pub mv_first: f64,
    pub mv_second: f64,
    pub profit_rule: String,
    pub auction_rule: String,
}

/// Experiment parameters and instructions for one participant
#[utoipa::path(
    get,
    path = "/api/auction/participants/{participant_id}",
    tag = "auction",
    params(("participant_id" = String, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant info", body = ParticipantInfoResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn get_participant_info(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<Json<ParticipantInfoResponse>> {
    let participant = state
        .store
        .find_participant(&participant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Participant"))?;

    let profit_rule = if participant.role.is_buyer() {
        format!(
            "Your first purchased unit is worth {} and each further unit {}. \
             Profit per unit is its value minus the uniform price.",
            participant.mv_first, participant.mv_second
        )
    } else {
        format!(
            "Your first sold unit costs you {} and each further unit {}. \
             Profit per unit is the uniform price minus its cost.",
            participant.mv_second, participant.mv_first
        )
    };
    let auction_rule = "Orders collect until all four participants have submitted, \
                        then the round clears in one batch. Every matched unit trades \
                        at the same uniform price."
        .to_string();

    Ok(Json(ParticipantInfoResponse {
        participant_id: participant.participant_id,
        first_name: participant.first_name,
        last_name: participant.last_name,
        role: participant.role,
        initial_money: participant.initial_money,
        endowment: participant.endowment,
        mv_first: participant.mv_first,
        mv_second: participant.mv_second,
        profit_rule,
        auction_rule,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenBalanceResponse {
    pub participant_id: String,
    pub total_tokens: f64,
}

/// Accumulated token balance across all cleared rounds
#[utoipa::path(
    get,
    path = "/api/auction/participants/{participant_id}/tokens",
    tag = "auction",
    params(("participant_id" = String, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Token balance", body = TokenBalanceResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn get_token_balance(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<Json<TokenBalanceResponse>> {
    let participant = state
        .store
        .find_participant(&participant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Participant"))?;

    Ok(Json(TokenBalanceResponse {
        participant_id: participant.participant_id,
        total_tokens: participant.tokens,
    }))
}
