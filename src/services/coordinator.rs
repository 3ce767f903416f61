// Round lifecycle for the call-auction experiment. One coordinator guards
// the whole submit-clear-settle-advance path behind a single async mutex,
// so a round can never clear twice and round n+1 can never open before
// round n is durably settled.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::constants::auction::REQUIRED_PARTICIPANTS;
use crate::database::repository::{AuctionStore, RoundSettlement};
use crate::error::{ApiError, Result};
use crate::models::{NewOrder, OrderSide, ParticipantRoundResult, RoundResult};
use crate::services::clearing::{self, OrderSnapshot};
use crate::services::settlement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Round `n` is open for order submission, 1-based
    AcceptingOrders(u32),
    /// Every round has cleared; the auction is over
    Completed,
}

/// What a submission did, decided under the coordinator lock
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Participant already has orders in this round; nothing was recorded
    Duplicate { round_number: u32 },
    /// Orders recorded, waiting for the remaining participants
    Waiting { round_number: u32 },
    /// This submission completed the round and it cleared
    Cleared {
        round: RoundResult,
        participant_result: ParticipantRoundResult,
        is_final: bool,
    },
    /// The auction already finished; the submission was refused
    AuctionComplete { total_rounds: u32 },
}

pub struct RoundCoordinator {
    store: Arc<dyn AuctionStore>,
    total_rounds: u32,
    state: Mutex<RoundState>,
}

impl RoundCoordinator {
    /// Rebuild coordinator state from persisted round results. Cleared
    /// rounds are durable, so the active round is always one past them.
    pub async fn recover(store: Arc<dyn AuctionStore>, total_rounds: u32) -> Result<Self> {
        let cleared = store.cleared_round_count().await? as u32;
        let state = if cleared >= total_rounds {
            RoundState::Completed
        } else {
            RoundState::AcceptingOrders(cleared + 1)
        };
        info!(cleared_rounds = cleared, total_rounds, ?state, "Round coordinator recovered");

        Ok(Self {
            store,
            total_rounds,
            state: Mutex::new(state),
        })
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub async fn current_state(&self) -> RoundState {
        *self.state.lock().await
    }

    /// Record a participant's order set for the active round and, when this
    /// submission is the last one missing, clear and settle the round.
    ///
    /// Resubmitting after a duplicate is harmless. If a previous clearing
    /// attempt failed at the persistence step, the round is still open and
    /// a duplicate submission re-attempts clearing, so the experiment can
    /// recover from a transient database fault by retrying.
    pub async fn submit_orders(
        &self,
        participant_id: &str,
        orders: &[NewOrder],
    ) -> Result<SubmissionOutcome> {
        validate_orders(orders)?;

        let mut state = self.state.lock().await;
        let round = match *state {
            RoundState::Completed => {
                return Ok(SubmissionOutcome::AuctionComplete {
                    total_rounds: self.total_rounds,
                })
            }
            RoundState::AcceptingOrders(n) => n,
        };

        if self.store.find_participant(participant_id).await?.is_none() {
            return Err(ApiError::not_found("Participant"));
        }

        let duplicate = self.store.has_submitted(participant_id, round as i64).await?;
        if duplicate {
            warn!(participant_id, round, "Duplicate order submission ignored");
        } else {
            self.store
                .insert_orders(participant_id, round as i64, orders)
                .await?;
            info!(participant_id, round, orders = orders.len(), "Orders recorded");
        }

        let submitters = self.store.round_submitters(round as i64).await?;
        if submitters.len() < REQUIRED_PARTICIPANTS {
            return Ok(if duplicate {
                SubmissionOutcome::Duplicate { round_number: round }
            } else {
                SubmissionOutcome::Waiting { round_number: round }
            });
        }

        // All order sets are in. Still holding the lock: clearing, settling
        // and the state advance are one critical section.
        let (round_result, participant_results) = self.clear_and_settle(round).await?;

        *state = if round >= self.total_rounds {
            RoundState::Completed
        } else {
            RoundState::AcceptingOrders(round + 1)
        };

        let participant_result = participant_results
            .iter()
            .find(|r| r.participant_id == participant_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::Internal("Settlement produced no row for submitter".to_string())
            })?;

        Ok(SubmissionOutcome::Cleared {
            round: round_result,
            participant_result,
            is_final: round >= self.total_rounds,
        })
    }

    async fn clear_and_settle(
        &self,
        round: u32,
    ) -> Result<(RoundResult, Vec<ParticipantRoundResult>)> {
        let orders = self.store.round_orders(round as i64).await?;

        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for order in &orders {
            let snapshot = OrderSnapshot::new(&order.participant_id, order.price, order.quantity);
            match order.side {
                OrderSide::Bid => bids.push(snapshot),
                OrderSide::Ask => asks.push(snapshot),
            }
        }

        let outcome = clearing::clear_market(&bids, &asks);
        info!(
            round,
            uniform_price = outcome.uniform_price,
            total_quantity = outcome.total_quantity,
            trades = outcome.trades.len(),
            "Round cleared"
        );

        let participants = self.store.list_participants().await?;
        let settlements =
            settlement::settle_round(&outcome.trades, outcome.uniform_price, &participants);

        let round_result = RoundResult {
            round_number: round as i64,
            uniform_price: outcome.uniform_price,
            total_quantity: outcome.total_quantity,
        };
        let participant_results: Vec<ParticipantRoundResult> = settlements
            .into_iter()
            .map(|s| ParticipantRoundResult {
                round_number: round as i64,
                participant_id: s.participant_id,
                executed_quantity: s.executed_quantity,
                profit: s.profit,
            })
            .collect();

        self.store
            .commit_settlement(&RoundSettlement {
                round: round_result.clone(),
                participant_results: participant_results.clone(),
            })
            .await?;

        Ok((round_result, participant_results))
    }
}

fn validate_orders(orders: &[NewOrder]) -> Result<()> {
    if orders.is_empty() {
        return Err(ApiError::Validation(
            "At least one order is required".to_string(),
        ));
    }
    for order in orders {
        if order.quantity < 1 {
            return Err(ApiError::validation_field(
                "quantity",
                "Quantity must be at least 1",
            ));
        }
        if !order.price.is_finite() || order.price < 0.0 {
            return Err(ApiError::validation_field(
                "price",
                "Price must be a non-negative number",
            ));
        }
    }
    Ok(())
}
